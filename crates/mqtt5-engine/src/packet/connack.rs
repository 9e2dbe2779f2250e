use crate::error::{MqttError, Result};
use crate::flags::ConnAckFlags;
use crate::packet::{FixedHeader, MqttPacket, PacketType};
use crate::protocol::v5::properties::{Properties, PropertyScope};
use crate::protocol::v5::reason_codes::ReasonCode;
use bytes::{Buf, BufMut};

pub fn is_valid_connack_reason_code(code: ReasonCode) -> bool {
    matches!(
        code,
        ReasonCode::Success
            | ReasonCode::UnspecifiedError
            | ReasonCode::MalformedPacket
            | ReasonCode::ProtocolError
            | ReasonCode::ImplementationSpecificError
            | ReasonCode::UnsupportedProtocolVersion
            | ReasonCode::ClientIdentifierNotValid
            | ReasonCode::BadUsernameOrPassword
            | ReasonCode::NotAuthorized
            | ReasonCode::ServerUnavailable
            | ReasonCode::ServerBusy
            | ReasonCode::Banned
            | ReasonCode::BadAuthenticationMethod
            | ReasonCode::TopicNameInvalid
            | ReasonCode::PacketTooLarge
            | ReasonCode::QuotaExceeded
            | ReasonCode::PayloadFormatInvalid
            | ReasonCode::RetainNotSupported
            | ReasonCode::QoSNotSupported
            | ReasonCode::UseAnotherServer
            | ReasonCode::ServerMoved
            | ReasonCode::ConnectionRateExceeded
    )
}

/// MQTT CONNACK packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnAckPacket {
    /// Server resumed a stored session; always false on refusal
    pub session_present: bool,
    /// Connect reason code
    pub reason_code: ReasonCode,
    /// Server limits and assignments, such as Receive Maximum
    pub properties: Properties,
}

impl ConnAckPacket {
    #[must_use]
    pub fn new(session_present: bool) -> Self {
        Self {
            session_present,
            reason_code: ReasonCode::Success,
            properties: Properties::default(),
        }
    }

    /// # Errors
    /// Returns `InvalidReasonCode` if CONNACK cannot carry `reason_code`.
    pub fn new_with_reason(session_present: bool, reason_code: ReasonCode) -> Result<Self> {
        check_reason_code(reason_code)?;
        Ok(Self {
            reason_code,
            ..Self::new(session_present)
        })
    }
}

fn check_reason_code(reason_code: ReasonCode) -> Result<()> {
    if is_valid_connack_reason_code(reason_code) {
        Ok(())
    } else {
        Err(MqttError::InvalidReasonCode(u8::from(reason_code)))
    }
}

impl MqttPacket for ConnAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::ConnAck
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        check_reason_code(self.reason_code)?;
        if self.session_present && self.reason_code != ReasonCode::Success {
            return Err(MqttError::MalformedPacket(
                "Session present must be 0 when the connection is refused".to_string(),
            ));
        }

        buf.put_u8(
            ConnAckFlags {
                session_present: self.session_present,
            }
            .encode(),
        );
        buf.put_u8(u8::from(self.reason_code));
        self.properties.encode_for(buf, PropertyScope::ConnAck)
    }

    fn decode_body<B: Buf>(buf: &mut B, _fixed_header: &FixedHeader) -> Result<Self> {
        if buf.remaining() < 2 {
            return Err(MqttError::MalformedPacket(
                "CONNACK variable header truncated".to_string(),
            ));
        }

        let flags = ConnAckFlags::decode(buf.get_u8())?;
        let reason_code = ReasonCode::try_from(buf.get_u8())?;
        check_reason_code(reason_code)?;

        let properties = if buf.has_remaining() {
            Properties::decode_for(buf, PropertyScope::ConnAck)?
        } else {
            Properties::default()
        };

        Ok(Self {
            session_present: flags.session_present,
            reason_code,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;
    use bytes::BytesMut;

    #[test]
    fn test_connack_layout() {
        let packet = ConnAckPacket::new(true);
        let mut buf = BytesMut::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x20, 0x03, 0x01, 0x00, 0x00]);
        assert_eq!(Packet::decode(&buf).unwrap(), Packet::ConnAck(packet));
    }

    #[test]
    fn test_connack_server_properties() {
        let mut packet = ConnAckPacket::new(false);
        packet
            .properties
            .set_assigned_client_identifier("auto-1".to_string());
        packet.properties.set_receive_maximum(20);
        packet.properties.set_server_keep_alive(120);

        let bytes = Packet::ConnAck(packet.clone()).to_bytes().unwrap();
        let Packet::ConnAck(decoded) = Packet::decode(&bytes).unwrap() else {
            panic!("expected CONNACK");
        };
        assert_eq!(decoded.properties.assigned_client_identifier(), Some("auto-1"));
        assert_eq!(decoded.properties.receive_maximum(), Some(20));
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_connack_refused() {
        let packet = ConnAckPacket::new_with_reason(false, ReasonCode::NotAuthorized).unwrap();
        let bytes = Packet::ConnAck(packet.clone()).to_bytes().unwrap();
        assert_eq!(Packet::decode(&bytes).unwrap(), Packet::ConnAck(packet));
    }

    #[test]
    fn test_connack_disallowed_reason() {
        assert_eq!(
            ConnAckPacket::new_with_reason(false, ReasonCode::NoMatchingSubscribers),
            Err(MqttError::InvalidReasonCode(0x10))
        );
        assert_eq!(
            Packet::decode(&[0x20, 0x03, 0x00, 0x92, 0x00]),
            Err(MqttError::InvalidReasonCode(0x92))
        );
    }

    #[test]
    fn test_connack_session_present_on_refusal() {
        let mut packet = ConnAckPacket::new(true);
        packet.reason_code = ReasonCode::ServerBusy;
        let mut buf = BytesMut::new();
        assert!(packet.encode(&mut buf).is_err());
    }
}
