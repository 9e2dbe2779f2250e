use crate::constants::limits::MAX_VARIABLE_BYTE_INTEGER;
use crate::encoding::{decode_string, encode_string};
use crate::error::{MqttError, Result};
use crate::packet::{require_packet_id, FixedHeader, MqttPacket, PacketType};
use crate::protocol::v5::properties::{Properties, PropertyId, PropertyScope};
use crate::types::QoS;
use bytes::{Buf, BufMut};

pub use super::subscribe_options::{RetainHandling, SubscriptionOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    /// Topic filter, wildcards allowed
    pub filter: String,
    /// Options byte sent after the filter
    pub options: SubscriptionOptions,
}

impl TopicFilter {
    #[must_use]
    pub fn new(filter: impl Into<String>, qos: QoS) -> Self {
        Self {
            filter: filter.into(),
            options: SubscriptionOptions::new(qos),
        }
    }

    #[must_use]
    pub fn with_options(filter: impl Into<String>, options: SubscriptionOptions) -> Self {
        Self {
            filter: filter.into(),
            options,
        }
    }
}

/// MQTT SUBSCRIBE packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribePacket {
    /// Packet identifier
    pub packet_id: u16,
    /// Topic filters to subscribe to, at least one
    pub filters: Vec<TopicFilter>,
    /// SUBSCRIBE properties: one subscription identifier at most, plus user properties
    pub properties: Properties,
}

impl SubscribePacket {
    #[must_use]
    pub fn new(packet_id: u16) -> Self {
        Self {
            packet_id,
            filters: Vec::new(),
            properties: Properties::default(),
        }
    }

    #[must_use]
    pub fn add_filter(mut self, filter: impl Into<String>, qos: QoS) -> Self {
        self.filters.push(TopicFilter::new(filter, qos));
        self
    }

    #[must_use]
    pub fn add_filter_with_options(mut self, filter: TopicFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Replaces any subscription identifier already set.
    #[must_use]
    pub fn with_subscription_identifier(mut self, id: u32) -> Self {
        self.properties.remove(PropertyId::SubscriptionIdentifier);
        self.properties.add_subscription_identifier(id);
        self
    }

    #[must_use]
    pub fn with_user_property(mut self, key: String, value: String) -> Self {
        self.properties.add_user_property(key, value);
        self
    }

    #[must_use]
    pub fn subscription_identifier(&self) -> Option<u32> {
        self.properties.subscription_identifiers().first().copied()
    }

    fn validate_subscription_identifier(properties: &Properties) -> Result<()> {
        let ids = properties.subscription_identifiers();
        if ids.len() > 1 {
            return Err(MqttError::MalformedPacket(
                "SUBSCRIBE carries more than one subscription identifier".to_string(),
            ));
        }
        if let Some(&id) = ids.first() {
            if id == 0 || id > MAX_VARIABLE_BYTE_INTEGER {
                return Err(MqttError::MalformedPacket(format!(
                    "Subscription identifier out of range: {id}"
                )));
            }
        }
        Ok(())
    }
}

impl MqttPacket for SubscribePacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Subscribe
    }

    fn flags(&self) -> u8 {
        0x02
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        require_packet_id(self.packet_id, "SUBSCRIBE")?;
        if self.filters.is_empty() {
            return Err(MqttError::MalformedPacket(
                "SUBSCRIBE packet must contain at least one topic filter".to_string(),
            ));
        }
        Self::validate_subscription_identifier(&self.properties)?;

        buf.put_u16(self.packet_id);
        self.properties.encode_for(buf, PropertyScope::Subscribe)?;

        for filter in &self.filters {
            encode_string(buf, &filter.filter)?;
            buf.put_u8(filter.options.encode());
        }

        Ok(())
    }

    fn decode_body<B: Buf>(buf: &mut B, fixed_header: &FixedHeader) -> Result<Self> {
        if fixed_header.flags != 0x02 {
            return Err(MqttError::MalformedPacket(format!(
                "Invalid SUBSCRIBE flags: expected 0x02, got 0x{:02X}",
                fixed_header.flags
            )));
        }

        if buf.remaining() < 2 {
            return Err(MqttError::MalformedPacket(
                "SUBSCRIBE missing packet identifier".to_string(),
            ));
        }
        let packet_id = buf.get_u16();
        require_packet_id(packet_id, "SUBSCRIBE")?;

        let properties = Properties::decode_for(buf, PropertyScope::Subscribe)?;
        Self::validate_subscription_identifier(&properties)?;

        if !buf.has_remaining() {
            return Err(MqttError::MalformedPacket(
                "SUBSCRIBE packet must contain at least one topic filter".to_string(),
            ));
        }

        let mut filters = Vec::new();
        while buf.has_remaining() {
            let filter = decode_string(buf)?;

            if !buf.has_remaining() {
                return Err(MqttError::MalformedPacket(
                    "Missing subscription options for topic filter".to_string(),
                ));
            }
            let options = SubscriptionOptions::decode(buf.get_u8())?;

            filters.push(TopicFilter { filter, options });
        }

        Ok(Self {
            packet_id,
            filters,
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
    fn test_subscribe_layout() {
        let packet = SubscribePacket::new(10).add_filter("a/+", QoS::AtLeastOnce);
        let mut buf = BytesMut::new();
        packet.encode(&mut buf).unwrap();

        assert_eq!(
            &buf[..],
            &[0x82, 0x09, 0x00, 0x0A, 0x00, 0x00, 0x03, b'a', b'/', b'+', 0x01]
        );
        assert_eq!(Packet::decode(&buf).unwrap(), Packet::Subscribe(packet));
    }

    #[test]
    fn test_subscribe_multiple_filters_with_options() {
        let options = SubscriptionOptions::new(QoS::ExactlyOnce)
            .with_no_local(true)
            .with_retain_handling(RetainHandling::DoNotSend);
        let packet = SubscribePacket::new(42)
            .add_filter("sensors/#", QoS::AtMostOnce)
            .add_filter_with_options(TopicFilter::with_options("cmd/+/set", options))
            .with_subscription_identifier(7)
            .with_user_property("origin".to_string(), "test".to_string());

        let bytes = Packet::Subscribe(packet.clone()).to_bytes().unwrap();
        let Packet::Subscribe(decoded) = Packet::decode(&bytes).unwrap() else {
            panic!("expected SUBSCRIBE");
        };
        assert_eq!(decoded.subscription_identifier(), Some(7));
        assert_eq!(decoded.filters[1].options, options);
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_subscribe_identifier_replaced() {
        let packet = SubscribePacket::new(1)
            .add_filter("t", QoS::AtMostOnce)
            .with_subscription_identifier(1)
            .with_subscription_identifier(2);
        assert_eq!(packet.properties.subscription_identifiers(), vec![2]);
    }

    #[test]
    fn test_subscribe_identifier_zero_rejected() {
        let mut packet = SubscribePacket::new(1).add_filter("t", QoS::AtMostOnce);
        packet.properties.add_subscription_identifier(0);
        let mut buf = BytesMut::new();
        assert!(matches!(
            packet.encode(&mut buf),
            Err(MqttError::MalformedPacket(_))
        ));
    }

    #[test]
    fn test_subscribe_requires_filter() {
        let mut buf = BytesMut::new();
        assert!(SubscribePacket::new(1).encode(&mut buf).is_err());

        let result = Packet::decode(&[0x82, 0x03, 0x00, 0x01, 0x00]);
        assert!(matches!(result, Err(MqttError::MalformedPacket(_))));
    }

    #[test]
    fn test_subscribe_requires_packet_id() {
        let packet = SubscribePacket::new(0).add_filter("t", QoS::AtMostOnce);
        let mut buf = BytesMut::new();
        assert!(packet.encode(&mut buf).is_err());
    }

    #[test]
    fn test_subscribe_missing_options_byte() {
        let result = Packet::decode(&[0x82, 0x06, 0x00, 0x01, 0x00, 0x00, 0x01, b't']);
        assert!(matches!(result, Err(MqttError::MalformedPacket(_))));
    }

    #[test]
    fn test_subscribe_reserved_option_bits() {
        let result = Packet::decode(&[0x82, 0x07, 0x00, 0x01, 0x00, 0x00, 0x01, b't', 0xC0]);
        assert!(matches!(result, Err(MqttError::MalformedPacket(_))));
    }

    #[test]
    fn test_subscribe_wrong_flags() {
        let result = Packet::decode(&[0x80, 0x07, 0x00, 0x01, 0x00, 0x00, 0x01, b't', 0x00]);
        assert!(matches!(result, Err(MqttError::MalformedPacket(_))));
    }

    #[test]
    fn test_subscribe_rejects_foreign_property() {
        let mut packet = SubscribePacket::new(1).add_filter("t", QoS::AtMostOnce);
        packet.properties.set_reason_string("no".to_string());
        let mut buf = BytesMut::new();
        assert_eq!(
            packet.encode(&mut buf),
            Err(MqttError::InvalidPropertyId(0x1F))
        );
    }
}
