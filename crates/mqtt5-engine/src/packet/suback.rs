use crate::error::{MqttError, Result};
use crate::packet::{require_packet_id, FixedHeader, MqttPacket, PacketType};
use crate::protocol::v5::properties::{Properties, PropertyScope};
use crate::protocol::v5::reason_codes::{ReasonCode, GRANTED_QOS_0};
use crate::types::QoS;
use bytes::{Buf, BufMut};

pub fn is_valid_suback_reason_code(code: ReasonCode) -> bool {
    matches!(
        code,
        ReasonCode::Success
            | ReasonCode::GrantedQoS1
            | ReasonCode::GrantedQoS2
            | ReasonCode::UnspecifiedError
            | ReasonCode::ImplementationSpecificError
            | ReasonCode::NotAuthorized
            | ReasonCode::TopicFilterInvalid
            | ReasonCode::PacketIdentifierInUse
            | ReasonCode::QuotaExceeded
            | ReasonCode::SharedSubscriptionsNotSupported
            | ReasonCode::SubscriptionIdentifiersNotSupported
            | ReasonCode::WildcardSubscriptionsNotSupported
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubAckPacket {
    pub packet_id: u16,
    pub properties: Properties,
    /// One entry per filter of the SUBSCRIBE, in the same order.
    pub reason_codes: Vec<ReasonCode>,
}

impl SubAckPacket {
    #[must_use]
    pub fn new(packet_id: u16) -> Self {
        Self {
            packet_id,
            properties: Properties::default(),
            reason_codes: Vec::new(),
        }
    }

    /// # Errors
    /// Returns `InvalidReasonCode` if SUBACK cannot carry `reason_code`.
    pub fn add_reason_code(mut self, reason_code: ReasonCode) -> Result<Self> {
        check_reason_code(reason_code)?;
        self.reason_codes.push(reason_code);
        Ok(self)
    }

    #[must_use]
    pub fn add_granted_qos(mut self, qos: QoS) -> Self {
        self.reason_codes.push(match qos {
            QoS::AtMostOnce => GRANTED_QOS_0,
            QoS::AtLeastOnce => ReasonCode::GrantedQoS1,
            QoS::ExactlyOnce => ReasonCode::GrantedQoS2,
        });
        self
    }

    #[must_use]
    pub fn with_reason_string(mut self, reason: String) -> Self {
        self.properties.set_reason_string(reason);
        self
    }

    /// Granted `QoS` for the filter at `index`, `None` if it was refused.
    #[must_use]
    pub fn granted_qos(&self, index: usize) -> Option<QoS> {
        match self.reason_codes.get(index)? {
            ReasonCode::Success => Some(QoS::AtMostOnce),
            ReasonCode::GrantedQoS1 => Some(QoS::AtLeastOnce),
            ReasonCode::GrantedQoS2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }
}

fn check_reason_code(reason_code: ReasonCode) -> Result<()> {
    if is_valid_suback_reason_code(reason_code) {
        Ok(())
    } else {
        Err(MqttError::InvalidReasonCode(u8::from(reason_code)))
    }
}

impl MqttPacket for SubAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::SubAck
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        require_packet_id(self.packet_id, "SUBACK")?;
        if self.reason_codes.is_empty() {
            return Err(MqttError::MalformedPacket(
                "SUBACK must contain at least one reason code".to_string(),
            ));
        }
        for &code in &self.reason_codes {
            check_reason_code(code)?;
        }

        buf.put_u16(self.packet_id);
        self.properties.encode_for(buf, PropertyScope::SubAck)?;
        for &code in &self.reason_codes {
            buf.put_u8(u8::from(code));
        }
        Ok(())
    }

    fn decode_body<B: Buf>(buf: &mut B, _fixed_header: &FixedHeader) -> Result<Self> {
        if buf.remaining() < 2 {
            return Err(MqttError::MalformedPacket(
                "SUBACK missing packet identifier".to_string(),
            ));
        }
        let packet_id = buf.get_u16();
        require_packet_id(packet_id, "SUBACK")?;

        let properties = Properties::decode_for(buf, PropertyScope::SubAck)?;

        if !buf.has_remaining() {
            return Err(MqttError::MalformedPacket(
                "SUBACK must contain at least one reason code".to_string(),
            ));
        }

        let mut reason_codes = Vec::with_capacity(buf.remaining());
        while buf.has_remaining() {
            let code = ReasonCode::try_from(buf.get_u8())?;
            check_reason_code(code)?;
            reason_codes.push(code);
        }

        Ok(Self {
            packet_id,
            properties,
            reason_codes,
        })
    }
}
