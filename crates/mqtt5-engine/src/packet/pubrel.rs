use super::ack_common::{define_ack_packet, is_valid_pubrel_reason_code};
use crate::packet::PacketType;

define_ack_packet! {
    /// MQTT PUBREL packet (`QoS` 2 publish release, part 2)
    pub struct PubRelPacket;
    packet_type = PacketType::PubRel;
    validator = is_valid_pubrel_reason_code;
    error_prefix = "PUBREL";
    flags = 0x02;
}
