use super::ack_common::{define_ack_packet, is_valid_pubrel_reason_code};
use crate::packet::PacketType;

define_ack_packet! {
    /// MQTT PUBCOMP packet (`QoS` 2 publish complete, part 3)
    pub struct PubCompPacket;
    packet_type = PacketType::PubComp;
    validator = is_valid_pubrel_reason_code;
    error_prefix = "PUBCOMP";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MqttError;
    use crate::packet::{MqttPacket, Packet};
    use crate::protocol::v5::reason_codes::ReasonCode;
    use bytes::BytesMut;

    #[test]
    fn test_pubcomp_short_form() {
        let mut buf = BytesMut::new();
        PubCompPacket::new(1).encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x70, 0x02, 0x00, 0x01]);
    }

    #[test]
    fn test_pubcomp_not_found() {
        let packet =
            PubCompPacket::new_with_reason(300, ReasonCode::PacketIdentifierNotFound).unwrap();
        let mut buf = BytesMut::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x70, 0x03, 0x01, 0x2C, 0x92]);
        assert_eq!(Packet::decode(&buf).unwrap(), Packet::PubComp(packet));
    }

    #[test]
    fn test_pubcomp_allow_list() {
        assert!(PubCompPacket::new_with_reason(1, ReasonCode::Success).is_ok());
        assert_eq!(
            PubCompPacket::new_with_reason(1, ReasonCode::NotAuthorized),
            Err(MqttError::InvalidReasonCode(0x87))
        );
    }

    #[test]
    fn test_pubcomp_truncated() {
        assert!(matches!(
            Packet::decode(&[0x70, 0x01, 0x00]),
            Err(MqttError::MalformedPacket(_))
        ));
    }
}
