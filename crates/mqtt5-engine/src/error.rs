use thiserror::Error;

pub type Result<T> = std::result::Result<T, MqttError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MqttError {
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    #[error("Invalid property identifier: {0}")]
    InvalidPropertyId(u8),

    #[error("Duplicate property identifier: {0}")]
    DuplicatePropertyId(u8),

    #[error("Invalid reason code: 0x{0:02X}")]
    InvalidReasonCode(u8),

    #[error("Unsupported protocol version")]
    UnsupportedProtocolVersion,

    #[error("Invalid packet type: {0}")]
    InvalidPacketType(u8),

    #[error("Invalid QoS: {0}")]
    InvalidQoS(u8),

    #[error("Packet too large: size {size} exceeds maximum {max}")]
    PacketTooLarge { size: usize, max: usize },

    #[error("String too long: {0} bytes exceeds maximum of 65535")]
    StringTooLong(usize),

    #[error("Packet identifier not found: {0}")]
    PacketIdNotFound(u16),

    #[error("Packet identifier already in use: {0}")]
    PacketIdInUse(u16),

    #[error("Receive maximum exceeded")]
    ReceiveMaximumExceeded,

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}
