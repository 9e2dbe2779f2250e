use crate::encoding::{decode_string, encode_string};
use crate::error::{MqttError, Result};
use crate::flags::PublishFlags;
use crate::packet::{require_packet_id, FixedHeader, MqttPacket, PacketType};
use crate::protocol::v5::properties::{Properties, PropertyScope};
use crate::types::QoS;
use bytes::{Buf, BufMut, Bytes};

/// MQTT PUBLISH packet.
///
/// The payload is whatever follows the property block; its length is never
/// written explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPacket {
    /// Topic name; empty only when a topic alias is set
    pub topic_name: String,
    /// Present exactly when `qos` is above 0.
    pub packet_id: Option<u16>,
    /// Delivery guarantee
    pub qos: QoS,
    /// Retain flag
    pub retain: bool,
    /// Set on retransmissions of a QoS 1/2 message
    pub dup: bool,
    /// PUBLISH properties
    pub properties: Properties,
    /// Message payload
    pub payload: Bytes,
}

impl PublishPacket {
    #[must_use]
    pub fn new(topic_name: impl Into<String>, payload: impl Into<Bytes>, qos: QoS) -> Self {
        Self {
            topic_name: topic_name.into(),
            packet_id: None,
            qos,
            retain: false,
            dup: false,
            properties: Properties::default(),
            payload: payload.into(),
        }
    }

    #[must_use]
    pub fn with_packet_id(mut self, packet_id: u16) -> Self {
        self.packet_id = Some(packet_id);
        self
    }

    #[must_use]
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    #[must_use]
    pub fn with_dup(mut self, dup: bool) -> Self {
        self.dup = dup;
        self
    }

    #[must_use]
    pub fn with_topic_alias(mut self, alias: u16) -> Self {
        self.properties.set_topic_alias(alias);
        self
    }

    #[must_use]
    pub fn with_user_property(mut self, key: String, value: String) -> Self {
        self.properties.add_user_property(key, value);
        self
    }

    #[must_use]
    pub fn publish_flags(&self) -> PublishFlags {
        PublishFlags {
            dup: self.dup,
            qos: self.qos,
            retain: self.retain,
        }
    }

    /// Checks everything encoding would refuse: the identifier rule for the
    /// `QoS`, the topic name and the property scope.
    ///
    /// # Errors
    /// `MalformedPacket`, `StringTooLong` or `InvalidPropertyId` for the first
    /// violation found.
    pub fn validate(&self) -> Result<()> {
        match (self.qos, self.packet_id) {
            (QoS::AtMostOnce, Some(_)) => {
                return Err(MqttError::MalformedPacket(
                    "QoS 0 PUBLISH must not carry a packet identifier".to_string(),
                ))
            }
            (QoS::AtMostOnce, None) => {
                if self.dup {
                    return Err(MqttError::MalformedPacket(
                        "DUP must be 0 for QoS 0 PUBLISH".to_string(),
                    ));
                }
            }
            (_, None) => {
                return Err(MqttError::MalformedPacket(format!(
                    "{:?} PUBLISH requires a packet identifier",
                    self.qos
                )))
            }
            (_, Some(id)) => require_packet_id(id, "PUBLISH")?,
        }

        validate_topic_name(&self.topic_name, &self.properties)?;
        self.properties.validate_for(PropertyScope::Publish)
    }
}

fn validate_topic_name(topic: &str, properties: &Properties) -> Result<()> {
    if topic.len() > usize::from(u16::MAX) {
        return Err(MqttError::StringTooLong(topic.len()));
    }
    if topic.is_empty() && properties.topic_alias().is_none() {
        return Err(MqttError::MalformedPacket(
            "Empty topic name requires a topic alias".to_string(),
        ));
    }
    if topic.contains(['+', '#']) {
        return Err(MqttError::MalformedPacket(format!(
            "Topic name must not contain wildcards: {topic}"
        )));
    }
    Ok(())
}

impl MqttPacket for PublishPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Publish
    }

    fn flags(&self) -> u8 {
        self.publish_flags().encode()
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.validate()?;

        encode_string(buf, &self.topic_name)?;
        if let Some(packet_id) = self.packet_id {
            buf.put_u16(packet_id);
        }
        self.properties.encode(buf)?;
        buf.put_slice(&self.payload);
        Ok(())
    }

    fn decode_body<B: Buf>(buf: &mut B, fixed_header: &FixedHeader) -> Result<Self> {
        let flags = PublishFlags::decode(fixed_header.flags)?;
        let topic_name = decode_string(buf)?;

        let packet_id = if flags.qos == QoS::AtMostOnce {
            None
        } else {
            if buf.remaining() < 2 {
                return Err(MqttError::MalformedPacket(
                    "PUBLISH missing packet identifier".to_string(),
                ));
            }
            let id = buf.get_u16();
            require_packet_id(id, "PUBLISH")?;
            Some(id)
        };

        let properties = Properties::decode_for(buf, PropertyScope::Publish)?;
        validate_topic_name(&topic_name, &properties)?;

        let payload = buf.copy_to_bytes(buf.remaining());

        Ok(Self {
            topic_name,
            packet_id,
            qos: flags.qos,
            retain: flags.retain,
            dup: flags.dup,
            properties,
            payload,
        })
    }
}
