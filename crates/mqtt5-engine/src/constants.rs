//! Wire-level constants shared by the codecs.

use crate::packet::PacketType;

/// First byte of the fixed header (packet type << 4 | mandated flags).
pub mod fixed_header {
    use super::PacketType;

    pub const CONNECT: u8 = (PacketType::Connect as u8) << 4;
    pub const CONNACK: u8 = (PacketType::ConnAck as u8) << 4;
    /// Flags vary per message.
    pub const PUBLISH_BASE: u8 = (PacketType::Publish as u8) << 4;
    pub const PUBACK: u8 = (PacketType::PubAck as u8) << 4;
    pub const PUBREC: u8 = (PacketType::PubRec as u8) << 4;
    pub const PUBREL: u8 = ((PacketType::PubRel as u8) << 4) | 0x02;
    pub const PUBCOMP: u8 = (PacketType::PubComp as u8) << 4;
    pub const SUBSCRIBE: u8 = ((PacketType::Subscribe as u8) << 4) | 0x02;
    pub const SUBACK: u8 = (PacketType::SubAck as u8) << 4;
    pub const UNSUBSCRIBE: u8 = ((PacketType::Unsubscribe as u8) << 4) | 0x02;
    pub const UNSUBACK: u8 = (PacketType::UnsubAck as u8) << 4;
    pub const PINGREQ: u8 = (PacketType::PingReq as u8) << 4;
    pub const PINGRESP: u8 = (PacketType::PingResp as u8) << 4;
    pub const DISCONNECT: u8 = (PacketType::Disconnect as u8) << 4;
}

pub mod masks {
    pub const PACKET_TYPE: u8 = 0xF0;
    pub const FLAGS: u8 = 0x0F;
    pub const CONTINUATION_BIT: u8 = 0x80;
    pub const VARIABLE_BYTE_VALUE: u8 = 0x7F;
}

pub mod packets {
    pub const PINGREQ_BYTES: [u8; 2] = [super::fixed_header::PINGREQ, 0x00];
    pub const PINGRESP_BYTES: [u8; 2] = [super::fixed_header::PINGRESP, 0x00];
}

pub mod subscription {
    pub const QOS_MASK: u8 = 0x03;
    pub const NO_LOCAL_MASK: u8 = 0x04;
    pub const RETAIN_AS_PUBLISHED_MASK: u8 = 0x08;
    pub const RETAIN_HANDLING_SHIFT: u8 = 4;
    pub const RESERVED_BITS_MASK: u8 = 0xC0;
}

pub mod limits {
    /// Largest length a 2-byte prefixed string or binary field can carry.
    pub const MAX_STRING_LENGTH: usize = u16::MAX as usize;

    /// Largest remaining length, and largest subscription identifier.
    pub const MAX_VARIABLE_BYTE_INTEGER: u32 = 268_435_455;

    /// Fixed header (5 bytes at most) plus the largest remaining length.
    pub const MAX_PACKET_SIZE: u32 = MAX_VARIABLE_BYTE_INTEGER + 5;

    pub const MAX_VARIABLE_BYTE_INTEGER_LEN: usize = 4;
}

pub mod protocol {
    pub const NAME: &str = "MQTT";
    pub const VERSION_V5: u8 = 5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_header_values() {
        assert_eq!(fixed_header::CONNECT, 0x10);
        assert_eq!(fixed_header::CONNACK, 0x20);
        assert_eq!(fixed_header::PUBLISH_BASE, 0x30);
        assert_eq!(fixed_header::PUBREL, 0x62);
        assert_eq!(fixed_header::SUBSCRIBE, 0x82);
        assert_eq!(fixed_header::UNSUBSCRIBE, 0xA2);
        assert_eq!(fixed_header::DISCONNECT, 0xE0);
    }

    #[test]
    fn test_ping_bytes() {
        assert_eq!(packets::PINGREQ_BYTES, [0xC0, 0x00]);
        assert_eq!(packets::PINGRESP_BYTES, [0xD0, 0x00]);
    }
}
