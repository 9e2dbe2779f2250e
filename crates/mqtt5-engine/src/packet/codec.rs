use crate::config::CodecConfig;
use crate::constants::masks;
use crate::encoding::peek_variable_int;
use crate::error::{MqttError, Result};
use crate::packet::{FixedHeader, Packet, PacketType};
use bytes::BytesMut;
use tracing::{trace, warn};

impl Packet {
    /// Takes one complete packet off the front of a stream buffer.
    ///
    /// Returns `Ok(None)` and leaves `buf` untouched while the packet is still
    /// incomplete. A declared size above `max_packet_size` is rejected as soon
    /// as the remaining length is readable, before the body arrives.
    ///
    /// # Errors
    /// Returns `PacketTooLarge`, `InvalidPacketType`, or whatever decoding the
    /// frame reports. The stream cannot be resynchronized after an error.
    pub fn decode_frame(buf: &mut BytesMut, max_packet_size: u32) -> Result<Option<Self>> {
        let Some(&first) = buf.first() else {
            return Ok(None);
        };
        let type_bits = (first & masks::PACKET_TYPE) >> 4;
        if PacketType::from_u8(type_bits).is_none() {
            warn!(type_bits, "rejecting frame with unsupported packet type");
            return Err(MqttError::InvalidPacketType(type_bits));
        }

        let Some((remaining_length, len_bytes)) = peek_variable_int(&buf[1..])? else {
            return Ok(None);
        };
        let header_len = 1 + len_bytes;
        let total_len = header_len + remaining_length as usize;

        if total_len > max_packet_size as usize {
            warn!(
                size = total_len,
                max = max_packet_size,
                "rejecting oversized frame"
            );
            return Err(MqttError::PacketTooLarge {
                size: total_len,
                max: max_packet_size as usize,
            });
        }

        if buf.len() < total_len {
            buf.reserve(total_len - buf.len());
            return Ok(None);
        }

        let mut frame = buf.split_to(total_len).freeze();
        let fixed_header = FixedHeader::decode(&mut frame)?;
        let packet = Self::decode_from_body(fixed_header.packet_type, &fixed_header, &mut frame)?;
        trace!(packet_type = ?fixed_header.packet_type, size = total_len, "decoded frame");
        Ok(Some(packet))
    }
}

/// Stateless encoder and stream decoder bound to a [`CodecConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketCodec {
    config: CodecConfig,
}

impl PacketCodec {
    /// # Errors
    /// Returns `Configuration` if `config` does not validate.
    pub fn new(config: CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Appends the encoded packet to `buf`. Nothing is appended on error.
    ///
    /// # Errors
    /// Returns `PacketTooLarge` if the encoded packet exceeds the configured
    /// maximum, or the packet's own encoding error.
    pub fn encode(&self, packet: &Packet, buf: &mut BytesMut) -> Result<()> {
        let mut scratch = BytesMut::new();
        packet.encode(&mut scratch)?;

        if scratch.len() > self.config.max_packet_size as usize {
            return Err(MqttError::PacketTooLarge {
                size: scratch.len(),
                max: self.config.max_packet_size as usize,
            });
        }

        buf.extend_from_slice(&scratch);
        Ok(())
    }

    /// # Errors
    /// As [`Packet::decode_frame`].
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Packet>> {
        Packet::decode_frame(buf, self.config.max_packet_size)
    }
}
