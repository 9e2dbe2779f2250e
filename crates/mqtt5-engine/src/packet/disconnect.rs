use crate::error::{MqttError, Result};
use crate::packet::{FixedHeader, MqttPacket, PacketType};
use crate::protocol::v5::properties::{Properties, PropertyScope};
use crate::protocol::v5::reason_codes::{ReasonCode, NORMAL_DISCONNECTION};
use bytes::{Buf, BufMut};

pub fn is_valid_disconnect_reason_code(code: ReasonCode) -> bool {
    matches!(
        code,
        ReasonCode::Success
            | ReasonCode::DisconnectWithWillMessage
            | ReasonCode::UnspecifiedError
            | ReasonCode::MalformedPacket
            | ReasonCode::ProtocolError
            | ReasonCode::ImplementationSpecificError
            | ReasonCode::NotAuthorized
            | ReasonCode::ServerBusy
            | ReasonCode::ServerShuttingDown
            | ReasonCode::KeepAliveTimeout
            | ReasonCode::SessionTakenOver
            | ReasonCode::TopicFilterInvalid
            | ReasonCode::TopicNameInvalid
            | ReasonCode::ReceiveMaximumExceeded
            | ReasonCode::TopicAliasInvalid
            | ReasonCode::PacketTooLarge
            | ReasonCode::MessageRateTooHigh
            | ReasonCode::QuotaExceeded
            | ReasonCode::AdministrativeAction
            | ReasonCode::PayloadFormatInvalid
            | ReasonCode::RetainNotSupported
            | ReasonCode::QoSNotSupported
            | ReasonCode::UseAnotherServer
            | ReasonCode::ServerMoved
            | ReasonCode::SharedSubscriptionsNotSupported
            | ReasonCode::ConnectionRateExceeded
            | ReasonCode::MaximumConnectTime
            | ReasonCode::SubscriptionIdentifiersNotSupported
            | ReasonCode::WildcardSubscriptionsNotSupported
    )
}

/// MQTT DISCONNECT packet. An empty body stands for a normal disconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectPacket {
    pub reason_code: ReasonCode,
    pub properties: Properties,
}

impl Default for DisconnectPacket {
    fn default() -> Self {
        Self::normal()
    }
}

impl DisconnectPacket {
    #[must_use]
    pub fn normal() -> Self {
        Self {
            reason_code: NORMAL_DISCONNECTION,
            properties: Properties::default(),
        }
    }

    /// # Errors
    /// Returns `InvalidReasonCode` if DISCONNECT cannot carry `reason_code`.
    pub fn new(reason_code: ReasonCode) -> Result<Self> {
        check_reason_code(reason_code)?;
        Ok(Self {
            reason_code,
            properties: Properties::default(),
        })
    }

    #[must_use]
    pub fn with_reason_string(mut self, reason: String) -> Self {
        self.properties.set_reason_string(reason);
        self
    }

    #[must_use]
    pub fn with_session_expiry_interval(mut self, seconds: u32) -> Self {
        self.properties.set_session_expiry_interval(seconds);
        self
    }
}

fn check_reason_code(reason_code: ReasonCode) -> Result<()> {
    if is_valid_disconnect_reason_code(reason_code) {
        Ok(())
    } else {
        Err(MqttError::InvalidReasonCode(u8::from(reason_code)))
    }
}

impl MqttPacket for DisconnectPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Disconnect
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        check_reason_code(self.reason_code)?;

        if self.properties.is_empty() {
            if self.reason_code != NORMAL_DISCONNECTION {
                buf.put_u8(u8::from(self.reason_code));
            }
            return Ok(());
        }

        buf.put_u8(u8::from(self.reason_code));
        self.properties.encode_for(buf, PropertyScope::Disconnect)
    }

    fn decode_body<B: Buf>(buf: &mut B, _fixed_header: &FixedHeader) -> Result<Self> {
        if !buf.has_remaining() {
            return Ok(Self::normal());
        }

        let reason_code = ReasonCode::try_from(buf.get_u8())?;
        check_reason_code(reason_code)?;

        let properties = if buf.has_remaining() {
            Properties::decode_for(buf, PropertyScope::Disconnect)?
        } else {
            Properties::default()
        };

        Ok(Self {
            reason_code,
            properties,
        })
    }
}
