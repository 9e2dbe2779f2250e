use crate::error::MqttError;
use crate::protocol::v5::reason_codes::ReasonCode;

/// How the surrounding client should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// Report and keep the connection. The stream is still in sync.
    Recoverable,
    /// The byte stream can no longer be trusted; close the connection.
    Fatal,
    /// A local usage error; nothing was sent or received.
    Rejected,
}

impl MqttError {
    #[must_use]
    pub fn classify(&self) -> ErrorSeverity {
        match self {
            Self::PacketIdNotFound(_) => ErrorSeverity::Recoverable,
            Self::PacketIdInUse(_) | Self::ReceiveMaximumExceeded | Self::Configuration(_) => {
                ErrorSeverity::Rejected
            }
            Self::MalformedPacket(_)
            | Self::InvalidPropertyId(_)
            | Self::DuplicatePropertyId(_)
            | Self::InvalidReasonCode(_)
            | Self::UnsupportedProtocolVersion
            | Self::InvalidPacketType(_)
            | Self::InvalidQoS(_)
            | Self::PacketTooLarge { .. }
            | Self::StringTooLong(_)
            | Self::ProtocolError(_) => ErrorSeverity::Fatal,
        }
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.classify() == ErrorSeverity::Fatal
    }

    /// Reason code that reports this error to the peer, in a DISCONNECT for
    /// fatal errors or in the matching acknowledgment otherwise.
    #[must_use]
    pub fn disconnect_reason(&self) -> ReasonCode {
        match self {
            Self::MalformedPacket(_)
            | Self::InvalidPropertyId(_)
            | Self::DuplicatePropertyId(_)
            | Self::InvalidReasonCode(_)
            | Self::InvalidPacketType(_)
            | Self::InvalidQoS(_)
            | Self::StringTooLong(_) => ReasonCode::MalformedPacket,
            Self::UnsupportedProtocolVersion => ReasonCode::UnsupportedProtocolVersion,
            Self::PacketTooLarge { .. } => ReasonCode::PacketTooLarge,
            Self::ReceiveMaximumExceeded => ReasonCode::ReceiveMaximumExceeded,
            Self::PacketIdInUse(_) => ReasonCode::PacketIdentifierInUse,
            Self::PacketIdNotFound(_) => ReasonCode::PacketIdentifierNotFound,
            Self::ProtocolError(_) => ReasonCode::ProtocolError,
            Self::Configuration(_) => ReasonCode::ImplementationSpecificError,
        }
    }
}
