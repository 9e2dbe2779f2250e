//! MQTT v5 control packets.
//!
//! Every packet starts with a fixed header: one byte holding the packet type
//! (high nibble) and flags (low nibble), then the remaining length as a
//! Variable Byte Integer. [`Packet`] is the closed set of packets this engine
//! speaks; encode and decode dispatch over it exhaustively.

pub mod ack_common;
pub mod codec;
pub mod connack;
pub mod connect;
pub mod disconnect;
pub mod ping;
pub mod puback;
pub mod pubcomp;
pub mod publish;
pub mod pubrec;
pub mod pubrel;
pub mod suback;
pub mod subscribe;
pub mod subscribe_options;
pub mod unsuback;
pub mod unsubscribe;

use crate::constants::masks;
use crate::encoding::{decode_variable_int, encode_variable_int, peek_variable_int, variable_int_len};
use crate::error::{MqttError, Result};
use crate::protocol::v5::reason_codes::ReasonCode;
use bebytes::BeBytes;
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub use codec::PacketCodec;
pub use connack::ConnAckPacket;
pub use connect::{ConnectPacket, LastWill};
pub use disconnect::DisconnectPacket;
pub use ping::{PingReqPacket, PingRespPacket};
pub use puback::PubAckPacket;
pub use pubcomp::PubCompPacket;
pub use publish::PublishPacket;
pub use pubrec::PubRecPacket;
pub use pubrel::PubRelPacket;
pub use suback::SubAckPacket;
pub use subscribe::{SubscribePacket, TopicFilter};
pub use subscribe_options::{RetainHandling, SubscriptionOptions};
pub use unsuback::UnsubAckPacket;
pub use unsubscribe::UnsubscribePacket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    PubAck = 4,
    PubRec = 5,
    PubRel = 6,
    PubComp = 7,
    Subscribe = 8,
    SubAck = 9,
    Unsubscribe = 10,
    UnsubAck = 11,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
}

impl PacketType {
    /// Type 0 is reserved and type 15 (AUTH) is not supported.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Connect),
            2 => Some(Self::ConnAck),
            3 => Some(Self::Publish),
            4 => Some(Self::PubAck),
            5 => Some(Self::PubRec),
            6 => Some(Self::PubRel),
            7 => Some(Self::PubComp),
            8 => Some(Self::Subscribe),
            9 => Some(Self::SubAck),
            10 => Some(Self::Unsubscribe),
            11 => Some(Self::UnsubAck),
            12 => Some(Self::PingReq),
            13 => Some(Self::PingResp),
            14 => Some(Self::Disconnect),
            _ => None,
        }
    }

    /// Flags the fixed header must carry, `None` for PUBLISH whose flags vary.
    #[must_use]
    pub fn required_flags(self) -> Option<u8> {
        match self {
            Self::Publish => None,
            Self::PubRel | Self::Subscribe | Self::Unsubscribe => Some(0x02),
            _ => Some(0x00),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    pub flags: u8,
    pub remaining_length: u32,
}

impl FixedHeader {
    #[must_use]
    pub fn new(packet_type: PacketType, flags: u8, remaining_length: u32) -> Self {
        Self {
            packet_type,
            flags,
            remaining_length,
        }
    }

    /// # Errors
    /// Returns error if the remaining length exceeds the VBI maximum.
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        buf.put_u8(((self.packet_type as u8) << 4) | (self.flags & masks::FLAGS));
        encode_variable_int(buf, self.remaining_length)
    }

    /// # Errors
    /// Returns `InvalidPacketType` for types 0 and 15, `MalformedPacket` if
    /// the header is truncated.
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        if !buf.has_remaining() {
            return Err(MqttError::MalformedPacket(
                "Missing fixed header".to_string(),
            ));
        }
        let byte = buf.get_u8();
        let type_bits = (byte & masks::PACKET_TYPE) >> 4;
        let packet_type =
            PacketType::from_u8(type_bits).ok_or(MqttError::InvalidPacketType(type_bits))?;
        let remaining_length = decode_variable_int(buf)?;

        Ok(Self {
            packet_type,
            flags: byte & masks::FLAGS,
            remaining_length,
        })
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        1 + variable_int_len(self.remaining_length)
    }

    /// # Errors
    /// Returns `MalformedPacket` if the flags differ from what the packet
    /// type mandates.
    pub fn validate_flags(&self) -> Result<()> {
        match self.packet_type.required_flags() {
            Some(expected) if expected != self.flags => Err(MqttError::MalformedPacket(format!(
                "Invalid flags for {:?}: expected 0x{expected:02X}, got 0x{:02X}",
                self.packet_type, self.flags
            ))),
            _ => Ok(()),
        }
    }
}

/// Encode/decode capability shared by every packet codec.
pub trait MqttPacket: Sized {
    fn packet_type(&self) -> PacketType;

    fn flags(&self) -> u8 {
        0
    }

    /// # Errors
    /// Returns error if the packet violates an encoding rule.
    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()>;

    /// Decodes a body. `buf` holds exactly the remaining-length bytes.
    ///
    /// # Errors
    /// Returns error if the body is malformed.
    fn decode_body<B: Buf>(buf: &mut B, fixed_header: &FixedHeader) -> Result<Self>;

    /// # Errors
    /// Returns error if the body cannot be encoded.
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let mut body = BytesMut::new();
        self.encode_body(&mut body)?;

        let remaining_length = u32::try_from(body.len()).map_err(|_| MqttError::PacketTooLarge {
            size: body.len(),
            max: crate::constants::limits::MAX_VARIABLE_BYTE_INTEGER as usize,
        })?;
        FixedHeader::new(self.packet_type(), self.flags(), remaining_length).encode(buf)?;
        buf.put_slice(&body);
        Ok(())
    }
}

/// Fails with `MalformedPacket` for a zero packet identifier.
pub(crate) fn require_packet_id(packet_id: u16, packet: &str) -> Result<()> {
    if packet_id == 0 {
        return Err(MqttError::MalformedPacket(format!(
            "{packet} packet identifier must be non-zero"
        )));
    }
    Ok(())
}

/// Packet identifier and reason code, the first three bytes of a long-form
/// PUBACK, PUBREC, PUBREL or PUBCOMP body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BeBytes)]
pub struct AckPacketHeader {
    pub packet_id: u16,
    pub reason_code: u8,
}

impl AckPacketHeader {
    #[must_use]
    pub fn create(packet_id: u16, reason_code: ReasonCode) -> Self {
        Self {
            packet_id,
            reason_code: u8::from(reason_code),
        }
    }

    #[must_use]
    pub fn get_reason_code(&self) -> Option<ReasonCode> {
        ReasonCode::from_u8(self.reason_code)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Connect(Box<ConnectPacket>),
    ConnAck(ConnAckPacket),
    Publish(PublishPacket),
    PubAck(PubAckPacket),
    PubRec(PubRecPacket),
    PubRel(PubRelPacket),
    PubComp(PubCompPacket),
    Subscribe(SubscribePacket),
    SubAck(SubAckPacket),
    Unsubscribe(UnsubscribePacket),
    UnsubAck(UnsubAckPacket),
    PingReq,
    PingResp,
    Disconnect(DisconnectPacket),
}

impl Packet {
    #[must_use]
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Connect(_) => PacketType::Connect,
            Self::ConnAck(_) => PacketType::ConnAck,
            Self::Publish(_) => PacketType::Publish,
            Self::PubAck(_) => PacketType::PubAck,
            Self::PubRec(_) => PacketType::PubRec,
            Self::PubRel(_) => PacketType::PubRel,
            Self::PubComp(_) => PacketType::PubComp,
            Self::Subscribe(_) => PacketType::Subscribe,
            Self::SubAck(_) => PacketType::SubAck,
            Self::Unsubscribe(_) => PacketType::Unsubscribe,
            Self::UnsubAck(_) => PacketType::UnsubAck,
            Self::PingReq => PacketType::PingReq,
            Self::PingResp => PacketType::PingResp,
            Self::Disconnect(_) => PacketType::Disconnect,
        }
    }

    /// The message identifier, for packets that carry one.
    #[must_use]
    pub fn packet_id(&self) -> Option<u16> {
        match self {
            Self::Publish(p) => p.packet_id,
            Self::PubAck(p) => Some(p.packet_id),
            Self::PubRec(p) => Some(p.packet_id),
            Self::PubRel(p) => Some(p.packet_id),
            Self::PubComp(p) => Some(p.packet_id),
            Self::Subscribe(p) => Some(p.packet_id),
            Self::SubAck(p) => Some(p.packet_id),
            Self::Unsubscribe(p) => Some(p.packet_id),
            Self::UnsubAck(p) => Some(p.packet_id),
            Self::Connect(_)
            | Self::ConnAck(_)
            | Self::PingReq
            | Self::PingResp
            | Self::Disconnect(_) => None,
        }
    }

    /// # Errors
    /// Returns error if the packet violates an encoding rule.
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        match self {
            Self::Connect(p) => p.encode(buf),
            Self::ConnAck(p) => p.encode(buf),
            Self::Publish(p) => p.encode(buf),
            Self::PubAck(p) => p.encode(buf),
            Self::PubRec(p) => p.encode(buf),
            Self::PubRel(p) => p.encode(buf),
            Self::PubComp(p) => p.encode(buf),
            Self::Subscribe(p) => p.encode(buf),
            Self::SubAck(p) => p.encode(buf),
            Self::Unsubscribe(p) => p.encode(buf),
            Self::UnsubAck(p) => p.encode(buf),
            Self::PingReq => PingReqPacket.encode(buf),
            Self::PingResp => PingRespPacket.encode(buf),
            Self::Disconnect(p) => p.encode(buf),
        }
    }

    /// # Errors
    /// Returns error if the packet violates an encoding rule.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decodes a buffer holding exactly one packet.
    ///
    /// # Errors
    /// Returns `MalformedPacket` if the buffer is shorter or longer than the
    /// packet it starts with, `InvalidPacketType` for unsupported types, and
    /// whatever the body codec reports.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Some(&first) = bytes.first() else {
            return Err(MqttError::MalformedPacket("Empty buffer".to_string()));
        };
        let type_bits = (first & masks::PACKET_TYPE) >> 4;
        if PacketType::from_u8(type_bits).is_none() {
            return Err(MqttError::InvalidPacketType(type_bits));
        }

        let Some((remaining_length, len_bytes)) = peek_variable_int(&bytes[1..])? else {
            return Err(MqttError::MalformedPacket(
                "Truncated remaining length".to_string(),
            ));
        };
        let header_len = 1 + len_bytes;
        let total_len = header_len + remaining_length as usize;

        if bytes.len() != total_len {
            return Err(MqttError::MalformedPacket(format!(
                "Buffer holds {} bytes but packet declares {total_len}",
                bytes.len()
            )));
        }

        let mut header_buf = &bytes[..header_len];
        let fixed_header = FixedHeader::decode(&mut header_buf)?;
        let mut body = Bytes::copy_from_slice(&bytes[header_len..]);
        Self::decode_from_body(fixed_header.packet_type, &fixed_header, &mut body)
    }

    /// Decodes a body whose fixed header has already been read. Every body
    /// byte must be consumed.
    ///
    /// # Errors
    /// Returns error if the flags are invalid, the body is malformed, or
    /// bytes are left over.
    pub fn decode_from_body<B: Buf>(
        packet_type: PacketType,
        fixed_header: &FixedHeader,
        buf: &mut B,
    ) -> Result<Self> {
        fixed_header.validate_flags()?;

        let packet = match packet_type {
            PacketType::Connect => {
                Self::Connect(Box::new(ConnectPacket::decode_body(buf, fixed_header)?))
            }
            PacketType::ConnAck => Self::ConnAck(ConnAckPacket::decode_body(buf, fixed_header)?),
            PacketType::Publish => Self::Publish(PublishPacket::decode_body(buf, fixed_header)?),
            PacketType::PubAck => Self::PubAck(PubAckPacket::decode_body(buf, fixed_header)?),
            PacketType::PubRec => Self::PubRec(PubRecPacket::decode_body(buf, fixed_header)?),
            PacketType::PubRel => Self::PubRel(PubRelPacket::decode_body(buf, fixed_header)?),
            PacketType::PubComp => Self::PubComp(PubCompPacket::decode_body(buf, fixed_header)?),
            PacketType::Subscribe => {
                Self::Subscribe(SubscribePacket::decode_body(buf, fixed_header)?)
            }
            PacketType::SubAck => Self::SubAck(SubAckPacket::decode_body(buf, fixed_header)?),
            PacketType::Unsubscribe => {
                Self::Unsubscribe(UnsubscribePacket::decode_body(buf, fixed_header)?)
            }
            PacketType::UnsubAck => {
                Self::UnsubAck(UnsubAckPacket::decode_body(buf, fixed_header)?)
            }
            PacketType::PingReq => {
                PingReqPacket::decode_body(buf, fixed_header)?;
                Self::PingReq
            }
            PacketType::PingResp => {
                PingRespPacket::decode_body(buf, fixed_header)?;
                Self::PingResp
            }
            PacketType::Disconnect => {
                Self::Disconnect(DisconnectPacket::decode_body(buf, fixed_header)?)
            }
        };

        if buf.has_remaining() {
            return Err(MqttError::MalformedPacket(format!(
                "{} unexpected trailing bytes in {packet_type:?}",
                buf.remaining()
            )));
        }

        Ok(packet)
    }
}

impl From<ConnectPacket> for Packet {
    fn from(packet: ConnectPacket) -> Self {
        Self::Connect(Box::new(packet))
    }
}

impl From<PublishPacket> for Packet {
    fn from(packet: PublishPacket) -> Self {
        Self::Publish(packet)
    }
}

impl From<PubAckPacket> for Packet {
    fn from(packet: PubAckPacket) -> Self {
        Self::PubAck(packet)
    }
}

impl From<PubRecPacket> for Packet {
    fn from(packet: PubRecPacket) -> Self {
        Self::PubRec(packet)
    }
}

impl From<PubRelPacket> for Packet {
    fn from(packet: PubRelPacket) -> Self {
        Self::PubRel(packet)
    }
}

impl From<PubCompPacket> for Packet {
    fn from(packet: PubCompPacket) -> Self {
        Self::PubComp(packet)
    }
}
