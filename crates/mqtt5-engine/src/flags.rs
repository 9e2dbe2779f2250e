//! Bit-packed flag bytes: the CONNECT flags byte, the CONNACK acknowledge
//! flags and the PUBLISH nibble of the fixed header.

use crate::error::{MqttError, Result};
use crate::types::QoS;
use bebytes::BeBytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, BeBytes)]
pub struct ConnectFlagsBits {
    #[bits(1)]
    pub username: u8,
    #[bits(1)]
    pub password: u8,
    #[bits(1)]
    pub will_retain: u8,
    #[bits(2)]
    pub will_qos: u8,
    #[bits(1)]
    pub will_flag: u8,
    #[bits(1)]
    pub clean_start: u8,
    #[bits(1)]
    pub reserved: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectFlags {
    pub clean_start: bool,
    pub will_flag: bool,
    pub will_qos: QoS,
    pub will_retain: bool,
    pub password: bool,
    pub username: bool,
}

impl ConnectFlags {
    #[must_use]
    pub fn encode(&self) -> u8 {
        let bits = ConnectFlagsBits {
            username: u8::from(self.username),
            password: u8::from(self.password),
            will_retain: u8::from(self.will_retain),
            will_qos: self.will_qos as u8,
            will_flag: u8::from(self.will_flag),
            clean_start: u8::from(self.clean_start),
            reserved: 0,
        };
        bits.to_be_bytes()[0]
    }

    /// # Errors
    /// Returns `MalformedPacket` if the reserved bit is set, the will QoS is
    /// 3, or will QoS/retain are set without the will flag.
    pub fn decode(byte: u8) -> Result<Self> {
        let (bits, _consumed) = ConnectFlagsBits::try_from_be_bytes(&[byte])
            .map_err(|e| MqttError::MalformedPacket(format!("Invalid CONNECT flags: {e}")))?;

        if bits.reserved != 0 {
            return Err(MqttError::MalformedPacket(
                "CONNECT reserved flag must be 0".to_string(),
            ));
        }

        let will_qos = QoS::try_from(bits.will_qos).map_err(|_| {
            MqttError::MalformedPacket(format!("Invalid will QoS: {}", bits.will_qos))
        })?;

        if bits.will_flag == 0 && (bits.will_qos != 0 || bits.will_retain != 0) {
            return Err(MqttError::MalformedPacket(
                "Will QoS and retain must be 0 without a will".to_string(),
            ));
        }

        Ok(Self {
            clean_start: bits.clean_start != 0,
            will_flag: bits.will_flag != 0,
            will_qos,
            will_retain: bits.will_retain != 0,
            password: bits.password != 0,
            username: bits.username != 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BeBytes)]
pub struct ConnAckFlagsBits {
    #[bits(7)]
    pub reserved: u8,
    #[bits(1)]
    pub session_present: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnAckFlags {
    pub session_present: bool,
}

impl ConnAckFlags {
    #[must_use]
    pub fn encode(&self) -> u8 {
        ConnAckFlagsBits {
            reserved: 0,
            session_present: u8::from(self.session_present),
        }
        .to_be_bytes()[0]
    }

    /// # Errors
    /// Returns `MalformedPacket` if any reserved bit is set.
    pub fn decode(byte: u8) -> Result<Self> {
        let (bits, _consumed) = ConnAckFlagsBits::try_from_be_bytes(&[byte])
            .map_err(|e| MqttError::MalformedPacket(format!("Invalid CONNACK flags: {e}")))?;
        if bits.reserved != 0 {
            return Err(MqttError::MalformedPacket(
                "CONNACK reserved flags must be 0".to_string(),
            ));
        }
        Ok(Self {
            session_present: bits.session_present != 0,
        })
    }
}

/// PUBLISH fixed-header flags as they sit in the low nibble of the first
/// byte. The high nibble holds the packet type and is never part of `flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BeBytes)]
pub struct PublishFlagsBits {
    #[bits(4)]
    pub packet_type: u8,
    #[bits(1)]
    pub dup: u8,
    #[bits(2)]
    pub qos: u8,
    #[bits(1)]
    pub retain: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishFlags {
    pub dup: bool,
    pub qos: QoS,
    pub retain: bool,
}

impl PublishFlags {
    #[must_use]
    pub fn encode(&self) -> u8 {
        PublishFlagsBits {
            packet_type: 0,
            dup: u8::from(self.dup),
            qos: self.qos as u8,
            retain: u8::from(self.retain),
        }
        .to_be_bytes()[0]
    }

    /// # Errors
    /// Returns `MalformedPacket` for QoS 3, DUP set on a QoS 0 message, or a
    /// value wider than the flags nibble.
    pub fn decode(flags: u8) -> Result<Self> {
        let (bits, _consumed) = PublishFlagsBits::try_from_be_bytes(&[flags])
            .map_err(|e| MqttError::MalformedPacket(format!("Invalid PUBLISH flags: {e}")))?;
        if bits.packet_type != 0 {
            return Err(MqttError::MalformedPacket(format!(
                "PUBLISH flags must fit in 4 bits, got 0x{flags:02X}"
            )));
        }

        let qos = QoS::try_from(bits.qos)
            .map_err(|_| MqttError::MalformedPacket("PUBLISH QoS must not be 3".to_string()))?;
        let dup = bits.dup != 0;

        if dup && qos == QoS::AtMostOnce {
            return Err(MqttError::MalformedPacket(
                "DUP must be 0 for QoS 0 PUBLISH".to_string(),
            ));
        }

        Ok(Self {
            dup,
            qos,
            retain: bits.retain != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_flags_layout() {
        let flags = ConnectFlags {
            clean_start: true,
            will_flag: true,
            will_qos: QoS::AtLeastOnce,
            will_retain: true,
            password: true,
            username: true,
        };
        assert_eq!(flags.encode(), 0b1110_1110);
        assert_eq!(ConnectFlags::decode(0b1110_1110).unwrap(), flags);
    }

    #[test]
    fn test_connect_flags_clean_start_only() {
        let flags = ConnectFlags::decode(0x02).unwrap();
        assert!(flags.clean_start);
        assert!(!flags.will_flag);
        assert!(!flags.username);
        assert_eq!(flags.encode(), 0x02);
    }

    #[test]
    fn test_connect_flags_reserved_bit() {
        assert!(ConnectFlags::decode(0x03).is_err());
    }

    #[test]
    fn test_connect_flags_will_qos_three() {
        assert!(ConnectFlags::decode(0b0001_1100).is_err());
    }

    #[test]
    fn test_connect_flags_will_qos_without_will() {
        assert!(ConnectFlags::decode(0b0000_1000).is_err());
        assert!(ConnectFlags::decode(0b0010_0000).is_err());
    }

    #[test]
    fn test_connack_flags() {
        assert_eq!(ConnAckFlags { session_present: true }.encode(), 0x01);
        assert!(ConnAckFlags::decode(0x01).unwrap().session_present);
        assert!(!ConnAckFlags::decode(0x00).unwrap().session_present);
        assert!(ConnAckFlags::decode(0x02).is_err());
    }

    #[test]
    fn test_publish_flags() {
        let flags = PublishFlags {
            dup: true,
            qos: QoS::ExactlyOnce,
            retain: true,
        };
        assert_eq!(flags.encode(), 0x0D);
        assert_eq!(PublishFlags::decode(0x0D).unwrap(), flags);
        assert!(PublishFlags::decode(0x06).is_err());
        assert!(PublishFlags::decode(0x08).is_err());
    }

    #[test]
    fn test_publish_flags_bit_positions() {
        let (bits, consumed) = PublishFlagsBits::try_from_be_bytes(&[0x0B]).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!((bits.dup, bits.qos, bits.retain), (1, 1, 1));

        let flags = PublishFlags::decode(0x04).unwrap();
        assert_eq!(flags.qos, QoS::ExactlyOnce);
        assert!(!flags.dup && !flags.retain);
        assert_eq!(flags.encode(), 0x04);

        assert!(PublishFlags::decode(0x30).is_err());
    }
}
