use crate::constants::protocol::{NAME, VERSION_V5};
use crate::encoding::{decode_binary, decode_string, encode_binary, encode_string};
use crate::error::{MqttError, Result};
use crate::flags::ConnectFlags;
use crate::packet::{FixedHeader, MqttPacket, PacketType};
use crate::protocol::v5::properties::{Properties, PropertyScope};
use crate::types::QoS;
use bytes::{Buf, BufMut, Bytes};

/// Message the server publishes for the client if the connection drops
/// without a DISCONNECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastWill {
    /// Topic the will is published to
    pub topic: String,
    /// Will payload
    pub payload: Bytes,
    /// `QoS` of the will message
    pub qos: QoS,
    /// Whether the will message is retained
    pub retain: bool,
    /// Will properties, written ahead of the will topic
    pub properties: Properties,
}

impl LastWill {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: QoS::AtMostOnce,
            retain: false,
            properties: Properties::default(),
        }
    }

    #[must_use]
    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    #[must_use]
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    #[must_use]
    pub fn with_delay_interval(mut self, seconds: u32) -> Self {
        self.properties.set_will_delay_interval(seconds);
        self
    }
}

/// MQTT CONNECT packet, always protocol "MQTT" level 5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPacket {
    /// Client identifier; empty asks the server to assign one
    pub client_id: String,
    /// Start a new session instead of resuming the stored one
    pub clean_start: bool,
    /// Keep alive interval in seconds, 0 disables it
    pub keep_alive: u16,
    /// CONNECT properties
    pub properties: Properties,
    /// Last will, if any
    pub will: Option<LastWill>,
    pub username: Option<String>,
    /// Password; may be sent without a username in v5
    pub password: Option<Bytes>,
}

impl ConnectPacket {
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            clean_start: true,
            keep_alive: 60,
            properties: Properties::default(),
            will: None,
            username: None,
            password: None,
        }
    }

    #[must_use]
    pub fn with_clean_start(mut self, clean_start: bool) -> Self {
        self.clean_start = clean_start;
        self
    }

    #[must_use]
    pub fn with_keep_alive(mut self, seconds: u16) -> Self {
        self.keep_alive = seconds;
        self
    }

    #[must_use]
    pub fn with_will(mut self, will: LastWill) -> Self {
        self.will = Some(will);
        self
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<Bytes>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_session_expiry_interval(mut self, seconds: u32) -> Self {
        self.properties.set_session_expiry_interval(seconds);
        self
    }

    #[must_use]
    pub fn with_receive_maximum(mut self, receive_maximum: u16) -> Self {
        self.properties.set_receive_maximum(receive_maximum);
        self
    }

    #[must_use]
    pub fn with_maximum_packet_size(mut self, size: u32) -> Self {
        self.properties.set_maximum_packet_size(size);
        self
    }

    #[must_use]
    pub fn with_user_property(mut self, key: String, value: String) -> Self {
        self.properties.add_user_property(key, value);
        self
    }

    #[must_use]
    pub fn connect_flags(&self) -> ConnectFlags {
        ConnectFlags {
            clean_start: self.clean_start,
            will_flag: self.will.is_some(),
            will_qos: self.will.as_ref().map_or(QoS::AtMostOnce, |w| w.qos),
            will_retain: self.will.as_ref().is_some_and(|w| w.retain),
            password: self.password.is_some(),
            username: self.username.is_some(),
        }
    }
}

impl MqttPacket for ConnectPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Connect
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.properties.validate_for(PropertyScope::Connect)?;
        if let Some(will) = &self.will {
            will.properties.validate_for(PropertyScope::Will)?;
        }

        encode_string(buf, NAME)?;
        buf.put_u8(VERSION_V5);
        buf.put_u8(self.connect_flags().encode());
        buf.put_u16(self.keep_alive);
        self.properties.encode(buf)?;

        encode_string(buf, &self.client_id)?;

        if let Some(will) = &self.will {
            will.properties.encode(buf)?;
            encode_string(buf, &will.topic)?;
            encode_binary(buf, &will.payload)?;
        }

        if let Some(username) = &self.username {
            encode_string(buf, username)?;
        }
        if let Some(password) = &self.password {
            encode_binary(buf, password)?;
        }

        Ok(())
    }

    fn decode_body<B: Buf>(buf: &mut B, _fixed_header: &FixedHeader) -> Result<Self> {
        let protocol_name = decode_string(buf)?;
        if protocol_name != NAME {
            return Err(MqttError::UnsupportedProtocolVersion);
        }

        if buf.remaining() < 4 {
            return Err(MqttError::MalformedPacket(
                "CONNECT variable header truncated".to_string(),
            ));
        }
        let version = buf.get_u8();
        if version != VERSION_V5 {
            return Err(MqttError::UnsupportedProtocolVersion);
        }

        let flags = ConnectFlags::decode(buf.get_u8())?;
        let keep_alive = buf.get_u16();
        let properties = Properties::decode_for(buf, PropertyScope::Connect)?;

        let client_id = decode_string(buf)?;

        let will = if flags.will_flag {
            let will_properties = Properties::decode_for(buf, PropertyScope::Will)?;
            let topic = decode_string(buf)?;
            let payload = decode_binary(buf)?;
            Some(LastWill {
                topic,
                payload,
                qos: flags.will_qos,
                retain: flags.will_retain,
                properties: will_properties,
            })
        } else {
            None
        };

        let username = if flags.username {
            Some(decode_string(buf)?)
        } else {
            None
        };

        let password = if flags.password {
            Some(decode_binary(buf)?)
        } else {
            None
        };

        Ok(Self {
            client_id,
            clean_start: flags.clean_start,
            keep_alive,
            properties,
            will,
            username,
            password,
        })
    }
}
