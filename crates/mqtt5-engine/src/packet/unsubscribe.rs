use crate::encoding::{decode_string, encode_string};
use crate::error::{MqttError, Result};
use crate::packet::{require_packet_id, FixedHeader, MqttPacket, PacketType};
use crate::protocol::v5::properties::{Properties, PropertyScope};
use bytes::{Buf, BufMut};

/// MQTT UNSUBSCRIBE packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubscribePacket {
    /// Packet identifier
    pub packet_id: u16,
    /// Topic filters to unsubscribe from
    pub filters: Vec<String>,
    /// UNSUBSCRIBE properties (user properties only)
    pub properties: Properties,
}

impl UnsubscribePacket {
    #[must_use]
    pub fn new(packet_id: u16) -> Self {
        Self {
            packet_id,
            filters: Vec::new(),
            properties: Properties::default(),
        }
    }

    #[must_use]
    pub fn add_filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    #[must_use]
    pub fn with_user_property(mut self, key: String, value: String) -> Self {
        self.properties.add_user_property(key, value);
        self
    }
}

impl MqttPacket for UnsubscribePacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Unsubscribe
    }

    fn flags(&self) -> u8 {
        0x02
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        require_packet_id(self.packet_id, "UNSUBSCRIBE")?;
        if self.filters.is_empty() {
            return Err(MqttError::MalformedPacket(
                "UNSUBSCRIBE packet must contain at least one topic filter".to_string(),
            ));
        }

        buf.put_u16(self.packet_id);
        self.properties.encode_for(buf, PropertyScope::Unsubscribe)?;
        for filter in &self.filters {
            encode_string(buf, filter)?;
        }
        Ok(())
    }

    fn decode_body<B: Buf>(buf: &mut B, fixed_header: &FixedHeader) -> Result<Self> {
        if fixed_header.flags != 0x02 {
            return Err(MqttError::MalformedPacket(format!(
                "Invalid UNSUBSCRIBE flags: expected 0x02, got 0x{:02X}",
                fixed_header.flags
            )));
        }

        if buf.remaining() < 2 {
            return Err(MqttError::MalformedPacket(
                "UNSUBSCRIBE missing packet identifier".to_string(),
            ));
        }
        let packet_id = buf.get_u16();
        require_packet_id(packet_id, "UNSUBSCRIBE")?;

        let properties = Properties::decode_for(buf, PropertyScope::Unsubscribe)?;

        let mut filters = Vec::new();
        while buf.has_remaining() {
            filters.push(decode_string(buf)?);
        }

        if filters.is_empty() {
            return Err(MqttError::MalformedPacket(
                "UNSUBSCRIBE packet must contain at least one topic filter".to_string(),
            ));
        }

        Ok(Self {
            packet_id,
            filters,
            properties,
        })
    }
}
