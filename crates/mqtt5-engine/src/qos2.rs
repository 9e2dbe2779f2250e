//! Decision functions for the QoS 2 exchange.
//!
//! Each function looks at one incoming event plus what is already recorded
//! for the packet identifier and returns the steps to take, in order. They
//! hold no state; [`crate::session::inflight::DeliveryTracker`] owns the
//! records and carries the steps out.

use crate::error::Result;
use crate::packet::pubcomp::PubCompPacket;
use crate::packet::pubrec::PubRecPacket;
use crate::packet::pubrel::PubRelPacket;
use crate::protocol::v5::reason_codes::ReasonCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QoS2Action {
    SendPubRec {
        packet_id: u16,
        reason_code: ReasonCode,
    },
    SendPubRel {
        packet_id: u16,
    },
    SendPubComp {
        packet_id: u16,
        reason_code: ReasonCode,
    },
    /// PUBREL sent, PUBCOMP expected.
    TrackOutgoingPubRel {
        packet_id: u16,
    },
    RemoveOutgoingPubRel {
        packet_id: u16,
    },
    /// PUBREC sent for an inbound PUBLISH, PUBREL expected.
    TrackIncomingPubRec {
        packet_id: u16,
    },
    RemoveIncomingPubRec {
        packet_id: u16,
    },
    DeliverMessage {
        packet_id: u16,
    },
    CompleteFlow {
        packet_id: u16,
    },
    ErrorFlow {
        packet_id: u16,
        reason_code: ReasonCode,
    },
}

impl QoS2Action {
    /// # Errors
    /// Returns `InvalidReasonCode` if the action carries a code PUBREC
    /// cannot hold.
    pub fn to_pubrec_packet(&self) -> Result<Option<PubRecPacket>> {
        match self {
            QoS2Action::SendPubRec {
                packet_id,
                reason_code,
            } => PubRecPacket::new_with_reason(*packet_id, *reason_code).map(Some),
            _ => Ok(None),
        }
    }

    #[must_use]
    pub fn to_pubrel_packet(&self) -> Option<PubRelPacket> {
        match self {
            QoS2Action::SendPubRel { packet_id } => Some(PubRelPacket::new(*packet_id)),
            _ => None,
        }
    }

    /// # Errors
    /// Returns `InvalidReasonCode` if the action carries a code PUBCOMP
    /// cannot hold.
    pub fn to_pubcomp_packet(&self) -> Result<Option<PubCompPacket>> {
        match self {
            QoS2Action::SendPubComp {
                packet_id,
                reason_code,
            } => PubCompPacket::new_with_reason(*packet_id, *reason_code).map(Some),
            _ => Ok(None),
        }
    }
}

/// `has_pending_publish` is true while the identifier awaits PUBREC or,
/// for a repeated PUBREC, PUBCOMP.
#[must_use]
pub fn handle_incoming_pubrec(
    packet_id: u16,
    reason_code: ReasonCode,
    has_pending_publish: bool,
) -> Vec<QoS2Action> {
    if !has_pending_publish {
        return vec![QoS2Action::ErrorFlow {
            packet_id,
            reason_code: ReasonCode::PacketIdentifierNotFound,
        }];
    }

    if reason_code.is_error() {
        return vec![QoS2Action::ErrorFlow {
            packet_id,
            reason_code,
        }];
    }

    vec![
        QoS2Action::SendPubRel { packet_id },
        QoS2Action::TrackOutgoingPubRel { packet_id },
    ]
}

#[must_use]
pub fn handle_incoming_pubcomp(
    packet_id: u16,
    reason_code: ReasonCode,
    has_pending_pubrel: bool,
) -> Vec<QoS2Action> {
    if !has_pending_pubrel {
        return vec![QoS2Action::ErrorFlow {
            packet_id,
            reason_code: ReasonCode::PacketIdentifierNotFound,
        }];
    }

    vec![
        QoS2Action::RemoveOutgoingPubRel { packet_id },
        if reason_code == ReasonCode::Success {
            QoS2Action::CompleteFlow { packet_id }
        } else {
            QoS2Action::ErrorFlow {
                packet_id,
                reason_code,
            }
        },
    ]
}

#[must_use]
pub fn handle_incoming_publish_qos2(packet_id: u16, is_duplicate: bool) -> Vec<QoS2Action> {
    if is_duplicate {
        vec![QoS2Action::SendPubRec {
            packet_id,
            reason_code: ReasonCode::Success,
        }]
    } else {
        vec![
            QoS2Action::DeliverMessage { packet_id },
            QoS2Action::SendPubRec {
                packet_id,
                reason_code: ReasonCode::Success,
            },
            QoS2Action::TrackIncomingPubRec { packet_id },
        ]
    }
}

#[must_use]
pub fn handle_incoming_pubrel(packet_id: u16, has_pending_pubrec: bool) -> Vec<QoS2Action> {
    if has_pending_pubrec {
        vec![
            QoS2Action::RemoveIncomingPubRec { packet_id },
            QoS2Action::SendPubComp {
                packet_id,
                reason_code: ReasonCode::Success,
            },
        ]
    } else {
        vec![QoS2Action::SendPubComp {
            packet_id,
            reason_code: ReasonCode::PacketIdentifierNotFound,
        }]
    }
}
