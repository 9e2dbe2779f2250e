use crate::error::{MqttError, Result};
use crate::packet::{FixedHeader, MqttPacket, PacketType};
use bytes::{Buf, BufMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PingReqPacket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PingRespPacket;

fn require_empty_body<B: Buf>(buf: &B, packet: &str) -> Result<()> {
    if buf.has_remaining() {
        return Err(MqttError::MalformedPacket(format!(
            "{packet} must have an empty body, got {} bytes",
            buf.remaining()
        )));
    }
    Ok(())
}

impl MqttPacket for PingReqPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::PingReq
    }

    fn encode_body<B: BufMut>(&self, _buf: &mut B) -> Result<()> {
        Ok(())
    }

    fn decode_body<B: Buf>(buf: &mut B, _fixed_header: &FixedHeader) -> Result<Self> {
        require_empty_body(buf, "PINGREQ")?;
        Ok(Self)
    }
}

impl MqttPacket for PingRespPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::PingResp
    }

    fn encode_body<B: BufMut>(&self, _buf: &mut B) -> Result<()> {
        Ok(())
    }

    fn decode_body<B: Buf>(buf: &mut B, _fixed_header: &FixedHeader) -> Result<Self> {
        require_empty_body(buf, "PINGRESP")?;
        Ok(Self)
    }
}
