use crate::constants::subscription::RESERVED_BITS_MASK;
use crate::error::{MqttError, Result};
use crate::types::QoS;
use bebytes::BeBytes;

/// Whether the server sends retained messages when the subscription is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RetainHandling {
    #[default]
    SendAtSubscribe = 0,
    SendAtSubscribeIfNew = 1,
    DoNotSend = 2,
}

impl TryFrom<u8> for RetainHandling {
    type Error = MqttError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::SendAtSubscribe),
            1 => Ok(Self::SendAtSubscribeIfNew),
            2 => Ok(Self::DoNotSend),
            _ => Err(MqttError::MalformedPacket(format!(
                "Invalid retain handling value: {value}"
            ))),
        }
    }
}

/// Bit layout of the subscription options byte, most significant bits first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BeBytes)]
pub struct SubscriptionOptionsBits {
    #[bits(2)]
    pub reserved_bits: u8,
    #[bits(2)]
    pub retain_handling: u8,
    #[bits(1)]
    pub retain_as_published: u8,
    #[bits(1)]
    pub no_local: u8,
    #[bits(2)]
    pub qos: u8,
}

impl SubscriptionOptionsBits {
    #[must_use]
    pub fn from_options(options: &SubscriptionOptions) -> Self {
        Self {
            reserved_bits: 0,
            retain_handling: options.retain_handling as u8,
            retain_as_published: u8::from(options.retain_as_published),
            no_local: u8::from(options.no_local),
            qos: u8::from(options.qos),
        }
    }

    /// # Errors
    /// Returns `MalformedPacket` if reserved bits are set or the `QoS` or
    /// retain handling values are out of range.
    pub fn to_options(&self) -> Result<SubscriptionOptions> {
        if self.reserved_bits != 0 {
            return Err(MqttError::MalformedPacket(
                "Reserved bits in subscription options must be 0".to_string(),
            ));
        }

        let qos = QoS::try_from(self.qos).map_err(|_| {
            MqttError::MalformedPacket(format!(
                "Invalid QoS value in subscription options: {}",
                self.qos
            ))
        })?;

        Ok(SubscriptionOptions {
            qos,
            no_local: self.no_local != 0,
            retain_as_published: self.retain_as_published != 0,
            retain_handling: RetainHandling::try_from(self.retain_handling)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscriptionOptions {
    pub qos: QoS,
    pub no_local: bool,
    pub retain_as_published: bool,
    pub retain_handling: RetainHandling,
}

impl SubscriptionOptions {
    #[must_use]
    pub fn new(qos: QoS) -> Self {
        Self {
            qos,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_no_local(mut self, no_local: bool) -> Self {
        self.no_local = no_local;
        self
    }

    #[must_use]
    pub fn with_retain_as_published(mut self, retain_as_published: bool) -> Self {
        self.retain_as_published = retain_as_published;
        self
    }

    #[must_use]
    pub fn with_retain_handling(mut self, retain_handling: RetainHandling) -> Self {
        self.retain_handling = retain_handling;
        self
    }

    #[must_use]
    pub fn encode(&self) -> u8 {
        let bits = SubscriptionOptionsBits::from_options(self);
        bits.to_be_bytes()[0]
    }

    /// # Errors
    /// Returns `MalformedPacket` if the `QoS` value or retain handling is
    /// invalid, or reserved bits are set.
    pub fn decode(byte: u8) -> Result<Self> {
        if byte & RESERVED_BITS_MASK != 0 {
            return Err(MqttError::MalformedPacket(
                "Reserved bits in subscription options must be 0".to_string(),
            ));
        }

        let (bits, _consumed) =
            SubscriptionOptionsBits::try_from_be_bytes(&[byte]).map_err(|e| {
                MqttError::MalformedPacket(format!("Invalid subscription options byte: {e}"))
            })?;

        bits.to_options()
    }
}
