//! Shared shape of PUBACK, PUBREC, PUBREL and PUBCOMP.
//!
//! Body: packet identifier, then optionally a reason code, then optionally a
//! property block. The short forms are used symmetrically: Success with no
//! properties is sent as the identifier alone, and a reason code with no
//! properties omits the property length.

use crate::protocol::v5::reason_codes::ReasonCode;

pub fn is_valid_publish_ack_reason_code(code: ReasonCode) -> bool {
    matches!(
        code,
        ReasonCode::Success
            | ReasonCode::NoMatchingSubscribers
            | ReasonCode::UnspecifiedError
            | ReasonCode::ImplementationSpecificError
            | ReasonCode::NotAuthorized
            | ReasonCode::TopicNameInvalid
            | ReasonCode::PacketIdentifierInUse
            | ReasonCode::QuotaExceeded
            | ReasonCode::PayloadFormatInvalid
    )
}

pub fn is_valid_pubrel_reason_code(code: ReasonCode) -> bool {
    matches!(
        code,
        ReasonCode::Success | ReasonCode::PacketIdentifierNotFound
    )
}

macro_rules! define_ack_packet {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
        packet_type = $packet_type:expr;
        validator = $validator:path;
        error_prefix = $prefix:literal;
        $(flags = $flags:literal;)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub packet_id: u16,
            pub reason_code: $crate::protocol::v5::reason_codes::ReasonCode,
            pub properties: $crate::protocol::v5::properties::Properties,
        }

        impl $name {
            const FLAGS: u8 = 0 $(| $flags)?;

            #[must_use]
            pub fn new(packet_id: u16) -> Self {
                Self {
                    packet_id,
                    reason_code: $crate::protocol::v5::reason_codes::ReasonCode::Success,
                    properties: $crate::protocol::v5::properties::Properties::default(),
                }
            }

            /// # Errors
            /// Returns `InvalidReasonCode` if this packet cannot carry `reason_code`.
            pub fn new_with_reason(
                packet_id: u16,
                reason_code: $crate::protocol::v5::reason_codes::ReasonCode,
            ) -> $crate::error::Result<Self> {
                Self::check_reason_code(reason_code)?;
                Ok(Self {
                    reason_code,
                    ..Self::new(packet_id)
                })
            }

            #[must_use]
            pub fn with_reason_string(mut self, reason: String) -> Self {
                self.properties.set_reason_string(reason);
                self
            }

            #[must_use]
            pub fn with_user_property(mut self, key: String, value: String) -> Self {
                self.properties.add_user_property(key, value);
                self
            }

            #[must_use]
            pub fn create_header(&self) -> $crate::packet::AckPacketHeader {
                $crate::packet::AckPacketHeader::create(self.packet_id, self.reason_code)
            }

            /// # Errors
            /// Returns `InvalidReasonCode` if the header carries an unknown or
            /// disallowed reason code.
            pub fn from_header(
                header: $crate::packet::AckPacketHeader,
                properties: $crate::protocol::v5::properties::Properties,
            ) -> $crate::error::Result<Self> {
                let reason_code = header
                    .get_reason_code()
                    .ok_or($crate::error::MqttError::InvalidReasonCode(header.reason_code))?;
                Self::check_reason_code(reason_code)?;

                Ok(Self {
                    packet_id: header.packet_id,
                    reason_code,
                    properties,
                })
            }

            fn check_reason_code(
                reason_code: $crate::protocol::v5::reason_codes::ReasonCode,
            ) -> $crate::error::Result<()> {
                if $validator(reason_code) {
                    Ok(())
                } else {
                    Err($crate::error::MqttError::InvalidReasonCode(u8::from(reason_code)))
                }
            }
        }

        impl $crate::packet::MqttPacket for $name {
            fn packet_type(&self) -> $crate::packet::PacketType {
                $packet_type
            }

            fn flags(&self) -> u8 {
                Self::FLAGS
            }

            fn encode_body<B: ::bytes::BufMut>(&self, buf: &mut B) -> $crate::error::Result<()> {
                $crate::packet::require_packet_id(self.packet_id, $prefix)?;
                Self::check_reason_code(self.reason_code)?;
                self.properties.validate_for(
                    $crate::protocol::v5::properties::PropertyScope::PublishAck,
                )?;

                let success =
                    self.reason_code == $crate::protocol::v5::reason_codes::ReasonCode::Success;
                if success && self.properties.is_empty() {
                    buf.put_u16(self.packet_id);
                    return Ok(());
                }

                buf.put_slice(&::bebytes::BeBytes::to_be_bytes(&self.create_header()));
                if !self.properties.is_empty() {
                    self.properties.encode(buf)?;
                }
                Ok(())
            }

            fn decode_body<B: ::bytes::Buf>(
                buf: &mut B,
                fixed_header: &$crate::packet::FixedHeader,
            ) -> $crate::error::Result<Self> {
                if fixed_header.flags != Self::FLAGS {
                    return Err($crate::error::MqttError::MalformedPacket(format!(
                        "Invalid {} flags: expected 0x{:02X}, got 0x{:02X}",
                        $prefix,
                        Self::FLAGS,
                        fixed_header.flags
                    )));
                }

                match buf.remaining() {
                    0 | 1 => Err($crate::error::MqttError::MalformedPacket(format!(
                        "{} missing packet identifier",
                        $prefix
                    ))),
                    2 => {
                        let packet_id = buf.get_u16();
                        $crate::packet::require_packet_id(packet_id, $prefix)?;
                        Ok(Self::new(packet_id))
                    }
                    _ => {
                        let mut raw = [0u8; 3];
                        buf.copy_to_slice(&mut raw);
                        let (header, _consumed) =
                            <$crate::packet::AckPacketHeader as ::bebytes::BeBytes>::try_from_be_bytes(&raw)
                                .map_err(|e| {
                                    $crate::error::MqttError::MalformedPacket(format!(
                                        "Invalid {} header: {e}",
                                        $prefix
                                    ))
                                })?;
                        $crate::packet::require_packet_id(header.packet_id, $prefix)?;

                        let properties = if buf.has_remaining() {
                            $crate::protocol::v5::properties::Properties::decode_for(
                                buf,
                                $crate::protocol::v5::properties::PropertyScope::PublishAck,
                            )?
                        } else {
                            $crate::protocol::v5::properties::Properties::default()
                        };

                        Self::from_header(header, properties)
                    }
                }
            }
        }
    };
}

pub(crate) use define_ack_packet;
