//! Engine configuration
//!
//! Limits the codec and the delivery tracker enforce. Both structs are plain
//! data so the surrounding client can load them from wherever it keeps its
//! settings.

use crate::constants::limits::MAX_PACKET_SIZE;
use crate::error::{MqttError, Result};
use serde::{Deserialize, Serialize};

/// Limits applied when turning bytes into packets and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Largest packet accepted or produced, fixed header included
    pub max_packet_size: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
}

impl CodecConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_packet_size(mut self, size: u32) -> Self {
        self.max_packet_size = size;
        self
    }

    /// # Errors
    /// Returns `Configuration` if the maximum packet size cannot hold the
    /// smallest packet or exceeds what the remaining length can express.
    pub fn validate(&self) -> Result<&Self> {
        if self.max_packet_size < 2 {
            return Err(MqttError::Configuration(
                "max_packet_size must be at least 2 bytes".to_string(),
            ));
        }
        if self.max_packet_size > MAX_PACKET_SIZE {
            return Err(MqttError::Configuration(format!(
                "max_packet_size must not exceed {MAX_PACKET_SIZE} bytes"
            )));
        }
        Ok(self)
    }
}

/// Limits for QoS 1 and 2 exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Outbound QoS 1/2 publishes allowed in flight at once
    pub receive_maximum: u16,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            receive_maximum: u16::MAX,
        }
    }
}

impl DeliveryConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_receive_maximum(mut self, receive_maximum: u16) -> Self {
        self.receive_maximum = receive_maximum;
        self
    }

    /// # Errors
    /// Returns `Configuration` if the receive maximum is 0.
    pub fn validate(&self) -> Result<&Self> {
        if self.receive_maximum == 0 {
            return Err(MqttError::Configuration(
                "receive_maximum must be greater than 0".to_string(),
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(CodecConfig::default().max_packet_size, 268_435_460);
        assert_eq!(DeliveryConfig::default().receive_maximum, 65_535);
        assert!(CodecConfig::default().validate().is_ok());
        assert!(DeliveryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_codec_config_validation() {
        let config = CodecConfig::new().with_max_packet_size(1);
        assert!(matches!(
            config.validate(),
            Err(MqttError::Configuration(_))
        ));

        let config = CodecConfig::new().with_max_packet_size(MAX_PACKET_SIZE + 1);
        assert!(config.validate().is_err());

        let config = CodecConfig::new().with_max_packet_size(1024);
        assert_eq!(config.validate().unwrap().max_packet_size, 1024);
    }

    #[test]
    fn test_delivery_config_validation() {
        assert!(DeliveryConfig::new().with_receive_maximum(0).validate().is_err());
        assert!(DeliveryConfig::new().with_receive_maximum(10).validate().is_ok());
    }

    #[test]
    fn test_serde_round_trip() {
        let config = CodecConfig::new().with_max_packet_size(4096);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"max_packet_size":4096}"#);
        assert_eq!(serde_json::from_str::<CodecConfig>(&json).unwrap(), config);

        let config: DeliveryConfig = serde_json::from_str(r#"{"receive_maximum":20}"#).unwrap();
        assert_eq!(config.receive_maximum, 20);
    }
}
