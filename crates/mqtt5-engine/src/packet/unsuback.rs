use crate::error::{MqttError, Result};
use crate::packet::{require_packet_id, FixedHeader, MqttPacket, PacketType};
use crate::protocol::v5::reason_codes::ReasonCode;
use bytes::{Buf, BufMut};

pub fn is_valid_unsuback_reason_code(code: ReasonCode) -> bool {
    matches!(
        code,
        ReasonCode::Success
            | ReasonCode::NoSubscriptionExisted
            | ReasonCode::UnspecifiedError
            | ReasonCode::ImplementationSpecificError
            | ReasonCode::NotAuthorized
            | ReasonCode::TopicFilterInvalid
            | ReasonCode::PacketIdentifierInUse
    )
}

/// MQTT UNSUBACK packet.
///
/// The body is the packet identifier followed by one reason code per
/// filter; no property block is written or expected, so the number of
/// reason codes is the remaining length minus two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubAckPacket {
    pub packet_id: u16,
    pub reason_codes: Vec<ReasonCode>,
}

impl UnsubAckPacket {
    #[must_use]
    pub fn new(packet_id: u16) -> Self {
        Self {
            packet_id,
            reason_codes: Vec::new(),
        }
    }

    /// # Errors
    /// Returns `InvalidReasonCode` if UNSUBACK cannot carry `reason_code`.
    pub fn add_reason_code(mut self, reason_code: ReasonCode) -> Result<Self> {
        check_reason_code(reason_code)?;
        self.reason_codes.push(reason_code);
        Ok(self)
    }

    /// # Errors
    /// Returns `InvalidReasonCode` for the first code UNSUBACK cannot carry.
    pub fn with_reason_codes(packet_id: u16, reason_codes: Vec<ReasonCode>) -> Result<Self> {
        for &code in &reason_codes {
            check_reason_code(code)?;
        }
        Ok(Self {
            packet_id,
            reason_codes,
        })
    }
}

fn check_reason_code(reason_code: ReasonCode) -> Result<()> {
    if is_valid_unsuback_reason_code(reason_code) {
        Ok(())
    } else {
        Err(MqttError::InvalidReasonCode(u8::from(reason_code)))
    }
}

impl MqttPacket for UnsubAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::UnsubAck
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        require_packet_id(self.packet_id, "UNSUBACK")?;
        if self.reason_codes.is_empty() {
            return Err(MqttError::MalformedPacket(
                "UNSUBACK must contain at least one reason code".to_string(),
            ));
        }
        for &code in &self.reason_codes {
            check_reason_code(code)?;
        }

        buf.put_u16(self.packet_id);
        for &code in &self.reason_codes {
            buf.put_u8(u8::from(code));
        }
        Ok(())
    }

    fn decode_body<B: Buf>(buf: &mut B, _fixed_header: &FixedHeader) -> Result<Self> {
        if buf.remaining() < 3 {
            return Err(MqttError::MalformedPacket(format!(
                "UNSUBACK needs a packet identifier and at least one reason code, got {} bytes",
                buf.remaining()
            )));
        }
        let packet_id = buf.get_u16();
        require_packet_id(packet_id, "UNSUBACK")?;

        let mut reason_codes = Vec::with_capacity(buf.remaining());
        while buf.has_remaining() {
            let code = ReasonCode::try_from(buf.get_u8())?;
            check_reason_code(code)?;
            reason_codes.push(code);
        }

        Ok(Self {
            packet_id,
            reason_codes,
        })
    }
}
