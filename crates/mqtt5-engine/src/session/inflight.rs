//! In-flight QoS 1 and QoS 2 exchanges.
//!
//! [`DeliveryTracker`] records every exchange that still expects a packet
//! from the peer, keyed by message identifier, and turns each received or
//! sent packet into the [`DeliveryAction`]s the connection must carry out.
//! QoS 2 decisions come from [`crate::qos2`]; QoS 1 needs a single round trip
//! and is handled here directly.

use crate::config::DeliveryConfig;
use crate::error::{MqttError, Result};
use crate::packet::{
    require_packet_id, Packet, PubAckPacket, PubCompPacket, PubRecPacket, PubRelPacket, PublishPacket,
};
use crate::protocol::v5::reason_codes::ReasonCode;
use crate::qos2::{self, QoS2Action};
use crate::types::QoS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// What an in-flight exchange is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InFlightStage {
    /// Outbound QoS 1 PUBLISH sent.
    AwaitingPubAck,
    /// Outbound QoS 2 PUBLISH sent.
    AwaitingPubRec,
    /// PUBREL sent for an outbound QoS 2 PUBLISH.
    AwaitingPubComp,
    /// Inbound QoS 2 PUBLISH delivered and PUBREC sent.
    AwaitingPubRel,
}

impl InFlightStage {
    #[must_use]
    pub fn is_outbound(self) -> bool {
        !matches!(self, Self::AwaitingPubRel)
    }
}

/// One in-flight exchange, in the shape handed to a persistence store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlightRecord {
    pub packet_id: u16,
    pub stage: InFlightStage,
    /// The outbound PUBLISH while it may still need retransmitting.
    #[serde(default, with = "encoded_publish")]
    pub publish: Option<PublishPacket>,
}

/// Stores a PUBLISH as its wire bytes, since the property map has no serde
/// representation of its own.
mod encoded_publish {
    use crate::packet::{MqttPacket, Packet, PublishPacket};
    use bytes::BytesMut;
    use serde::{de, ser, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        publish: &Option<PublishPacket>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match publish {
            Some(publish) => {
                let mut buf = BytesMut::new();
                publish.encode(&mut buf).map_err(ser::Error::custom)?;
                serializer.serialize_some(&buf[..])
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<PublishPacket>, D::Error> {
        let Some(bytes) = Option::<Vec<u8>>::deserialize(deserializer)? else {
            return Ok(None);
        };
        match Packet::decode(&bytes).map_err(de::Error::custom)? {
            Packet::Publish(publish) => Ok(Some(publish)),
            other => Err(de::Error::custom(format!(
                "expected PUBLISH, found {:?}",
                other.packet_type()
            ))),
        }
    }
}

/// A step the connection must take after the tracker processed a packet.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryAction {
    /// Write this packet to the peer.
    Send(Packet),
    /// Hand this message to the application.
    Deliver(PublishPacket),
    /// The outbound exchange finished and its identifier is free again.
    Completed { packet_id: u16 },
    /// The peer refused the outbound message; the exchange is over and its
    /// identifier is free again.
    Failed {
        packet_id: u16,
        reason_code: ReasonCode,
    },
}

/// Owns the in-flight records of one session.
///
/// Every method takes `&mut self`; callers on several tasks share one
/// tracker behind a lock, so each message identifier is handled by one
/// caller at a time.
#[derive(Debug, Default)]
pub struct DeliveryTracker {
    config: DeliveryConfig,
    outbound: BTreeMap<u16, InFlightRecord>,
    inbound: BTreeMap<u16, InFlightRecord>,
}

fn require_publish_id(publish: &PublishPacket) -> Result<u16> {
    let packet_id = publish.packet_id.ok_or_else(|| {
        MqttError::MalformedPacket(format!(
            "{:?} PUBLISH requires a packet identifier",
            publish.qos
        ))
    })?;
    require_packet_id(packet_id, "PUBLISH")?;
    Ok(packet_id)
}

impl DeliveryTracker {
    /// # Errors
    /// Returns `Configuration` if `config` does not validate.
    pub fn new(config: DeliveryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            outbound: BTreeMap::new(),
            inbound: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Applies the peer's Receive Maximum from CONNACK. Exchanges already
    /// in flight are kept even if they exceed the new limit.
    ///
    /// # Errors
    /// Returns `ProtocolError` for 0, which a CONNACK must not carry. The
    /// current limit is left unchanged.
    pub fn set_receive_maximum(&mut self, receive_maximum: u16) -> Result<()> {
        if receive_maximum == 0 {
            warn!("peer sent a Receive Maximum of 0");
            return Err(MqttError::ProtocolError(
                "Receive Maximum must be greater than 0".to_string(),
            ));
        }
        self.config.receive_maximum = receive_maximum;
        Ok(())
    }

    #[must_use]
    pub fn outbound_in_flight(&self) -> usize {
        self.outbound.len()
    }

    #[must_use]
    pub fn inbound_in_flight(&self) -> usize {
        self.inbound.len()
    }

    #[must_use]
    pub fn stage(&self, packet_id: u16) -> Option<InFlightStage> {
        self.outbound
            .get(&packet_id)
            .or_else(|| self.inbound.get(&packet_id))
            .map(|record| record.stage)
    }

    #[must_use]
    pub fn is_outbound_in_flight(&self, packet_id: u16) -> bool {
        self.outbound.contains_key(&packet_id)
    }

    /// Registers an outbound PUBLISH and returns it as the packet to send.
    /// QoS 0 leaves no record.
    ///
    /// # Errors
    /// `PacketIdInUse` if the identifier is already in flight,
    /// `ReceiveMaximumExceeded` if the peer's quota is used up, and any
    /// error [`PublishPacket::validate`] reports, such as a missing or zero
    /// identifier or a wildcard topic. Nothing is recorded on error.
    pub fn send_publish(&mut self, publish: PublishPacket) -> Result<Vec<DeliveryAction>> {
        publish.validate()?;
        let stage = match publish.qos {
            QoS::AtMostOnce => return Ok(vec![DeliveryAction::Send(Packet::Publish(publish))]),
            QoS::AtLeastOnce => InFlightStage::AwaitingPubAck,
            QoS::ExactlyOnce => InFlightStage::AwaitingPubRec,
        };
        let packet_id = require_publish_id(&publish)?;

        if self.outbound.contains_key(&packet_id) {
            warn!(packet_id, "outbound packet identifier already in flight");
            return Err(MqttError::PacketIdInUse(packet_id));
        }
        if self.outbound.len() >= usize::from(self.config.receive_maximum) {
            debug!(
                packet_id,
                in_flight = self.outbound.len(),
                receive_maximum = self.config.receive_maximum,
                "receive maximum reached"
            );
            return Err(MqttError::ReceiveMaximumExceeded);
        }

        trace!(packet_id, ?stage, "tracking outbound publish");
        self.outbound.insert(
            packet_id,
            InFlightRecord {
                packet_id,
                stage,
                publish: Some(publish.clone()),
            },
        );
        Ok(vec![DeliveryAction::Send(Packet::Publish(publish))])
    }

    /// # Errors
    /// `PacketIdNotFound` if no QoS 1 PUBLISH with this identifier awaits
    /// PUBACK. The stream stays usable.
    pub fn handle_puback(&mut self, puback: &PubAckPacket) -> Result<Vec<DeliveryAction>> {
        let packet_id = puback.packet_id;
        match self.outbound.get(&packet_id).map(|record| record.stage) {
            Some(InFlightStage::AwaitingPubAck) => {
                self.outbound.remove(&packet_id);
            }
            _ => {
                warn!(packet_id, "PUBACK for unknown packet identifier");
                return Err(MqttError::PacketIdNotFound(packet_id));
            }
        }

        trace!(packet_id, reason_code = ?puback.reason_code, "QoS 1 exchange finished");
        Ok(vec![if puback.reason_code.is_error() {
            DeliveryAction::Failed {
                packet_id,
                reason_code: puback.reason_code,
            }
        } else {
            DeliveryAction::Completed { packet_id }
        }])
    }

    /// A success PUBREC moves the exchange to `AwaitingPubComp` and sends
    /// PUBREL; a repeated PUBREC re-sends PUBREL. An error reason ends the
    /// exchange without PUBREL.
    ///
    /// # Errors
    /// `PacketIdNotFound` if no QoS 2 PUBLISH with this identifier is in
    /// flight.
    pub fn handle_pubrec(&mut self, pubrec: &PubRecPacket) -> Result<Vec<DeliveryAction>> {
        let packet_id = pubrec.packet_id;
        let has_pending = matches!(
            self.outbound.get(&packet_id).map(|record| record.stage),
            Some(InFlightStage::AwaitingPubRec | InFlightStage::AwaitingPubComp)
        );

        let actions = qos2::handle_incoming_pubrec(packet_id, pubrec.reason_code, has_pending);
        self.apply_outbound(actions, has_pending)
    }

    /// # Errors
    /// `PacketIdNotFound` if no PUBREL with this identifier awaits PUBCOMP.
    pub fn handle_pubcomp(&mut self, pubcomp: &PubCompPacket) -> Result<Vec<DeliveryAction>> {
        let packet_id = pubcomp.packet_id;
        let has_pending = matches!(
            self.outbound.get(&packet_id).map(|record| record.stage),
            Some(InFlightStage::AwaitingPubComp)
        );

        let actions = qos2::handle_incoming_pubcomp(packet_id, pubcomp.reason_code, has_pending);
        self.apply_outbound(actions, has_pending)
    }

    fn apply_outbound(
        &mut self,
        actions: Vec<QoS2Action>,
        has_pending: bool,
    ) -> Result<Vec<DeliveryAction>> {
        let mut out = Vec::with_capacity(actions.len());

        for action in actions {
            match action {
                QoS2Action::SendPubRel { .. } => {
                    if let Some(pubrel) = action.to_pubrel_packet() {
                        out.push(DeliveryAction::Send(Packet::PubRel(pubrel)));
                    }
                }
                QoS2Action::TrackOutgoingPubRel { packet_id } => {
                    if let Some(record) = self.outbound.get_mut(&packet_id) {
                        record.stage = InFlightStage::AwaitingPubComp;
                        record.publish = None;
                    }
                    trace!(packet_id, "awaiting PUBCOMP");
                }
                QoS2Action::RemoveOutgoingPubRel { packet_id } => {
                    self.outbound.remove(&packet_id);
                }
                QoS2Action::CompleteFlow { packet_id } => {
                    trace!(packet_id, "QoS 2 exchange finished");
                    out.push(DeliveryAction::Completed { packet_id });
                }
                QoS2Action::ErrorFlow {
                    packet_id,
                    reason_code,
                } => {
                    if !has_pending {
                        warn!(packet_id, "acknowledgment for unknown packet identifier");
                        return Err(MqttError::PacketIdNotFound(packet_id));
                    }
                    self.outbound.remove(&packet_id);
                    debug!(packet_id, ?reason_code, "QoS 2 exchange refused by peer");
                    out.push(DeliveryAction::Failed {
                        packet_id,
                        reason_code,
                    });
                }
                other => {
                    return Err(MqttError::ProtocolError(format!(
                        "unexpected outbound QoS 2 step {other:?}"
                    )))
                }
            }
        }

        Ok(out)
    }

    /// Processes an inbound PUBLISH. QoS 2 messages are delivered once;
    /// a repeat while the identifier awaits PUBREL only re-sends PUBREC.
    ///
    /// # Errors
    /// `MalformedPacket` for a QoS 1/2 PUBLISH without identifier.
    pub fn handle_publish(&mut self, publish: PublishPacket) -> Result<Vec<DeliveryAction>> {
        match publish.qos {
            QoS::AtMostOnce => Ok(vec![DeliveryAction::Deliver(publish)]),
            QoS::AtLeastOnce => {
                let packet_id = require_publish_id(&publish)?;
                Ok(vec![
                    DeliveryAction::Deliver(publish),
                    DeliveryAction::Send(Packet::PubAck(PubAckPacket::new(packet_id))),
                ])
            }
            QoS::ExactlyOnce => {
                let packet_id = require_publish_id(&publish)?;
                let is_duplicate = self.inbound.contains_key(&packet_id);
                if is_duplicate {
                    debug!(packet_id, "duplicate QoS 2 publish, not delivering again");
                }

                let mut publish = Some(publish);
                let mut out = Vec::new();
                for action in qos2::handle_incoming_publish_qos2(packet_id, is_duplicate) {
                    match action {
                        QoS2Action::DeliverMessage { .. } => {
                            if let Some(publish) = publish.take() {
                                out.push(DeliveryAction::Deliver(publish));
                            }
                        }
                        QoS2Action::SendPubRec { .. } => {
                            if let Some(pubrec) = action.to_pubrec_packet()? {
                                out.push(DeliveryAction::Send(Packet::PubRec(pubrec)));
                            }
                        }
                        QoS2Action::TrackIncomingPubRec { packet_id } => {
                            trace!(packet_id, "awaiting PUBREL");
                            self.inbound.insert(
                                packet_id,
                                InFlightRecord {
                                    packet_id,
                                    stage: InFlightStage::AwaitingPubRel,
                                    publish: None,
                                },
                            );
                        }
                        other => {
                            return Err(MqttError::ProtocolError(format!(
                                "unexpected inbound QoS 2 step {other:?}"
                            )))
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    /// Always answers with PUBCOMP: Success for a known identifier,
    /// PacketIdentifierNotFound otherwise.
    ///
    /// # Errors
    /// Only if a PUBCOMP cannot be built, which the reason codes used here
    /// never trigger.
    pub fn handle_pubrel(&mut self, pubrel: &PubRelPacket) -> Result<Vec<DeliveryAction>> {
        let packet_id = pubrel.packet_id;
        let has_pending = self.inbound.contains_key(&packet_id);
        if !has_pending {
            warn!(packet_id, "PUBREL for unknown packet identifier");
        }

        let mut out = Vec::new();
        for action in qos2::handle_incoming_pubrel(packet_id, has_pending) {
            match action {
                QoS2Action::RemoveIncomingPubRec { packet_id } => {
                    self.inbound.remove(&packet_id);
                }
                QoS2Action::SendPubComp { .. } => {
                    if let Some(pubcomp) = action.to_pubcomp_packet()? {
                        out.push(DeliveryAction::Send(Packet::PubComp(pubcomp)));
                    }
                }
                other => {
                    return Err(MqttError::ProtocolError(format!(
                        "unexpected PUBREL step {other:?}"
                    )))
                }
            }
        }
        Ok(out)
    }

    /// Dispatches any acknowledgment or PUBLISH to its handler. Other packet
    /// types produce no actions.
    ///
    /// # Errors
    /// As the individual handlers.
    pub fn handle_packet(&mut self, packet: Packet) -> Result<Vec<DeliveryAction>> {
        match packet {
            Packet::Publish(publish) => self.handle_publish(publish),
            Packet::PubAck(puback) => self.handle_puback(&puback),
            Packet::PubRec(pubrec) => self.handle_pubrec(&pubrec),
            Packet::PubRel(pubrel) => self.handle_pubrel(&pubrel),
            Packet::PubComp(pubcomp) => self.handle_pubcomp(&pubcomp),
            _ => Ok(Vec::new()),
        }
    }

    /// Packets to resend after reconnecting with an existing session, in
    /// message identifier order: PUBLISH with DUP set for exchanges awaiting
    /// PUBACK or PUBREC, PUBREL for those awaiting PUBCOMP.
    #[must_use]
    pub fn retransmissions(&self) -> Vec<Packet> {
        self.outbound
            .values()
            .filter_map(|record| match (record.stage, &record.publish) {
                (InFlightStage::AwaitingPubAck | InFlightStage::AwaitingPubRec, Some(publish)) => {
                    Some(Packet::Publish(publish.clone().with_dup(true)))
                }
                (InFlightStage::AwaitingPubComp, _) => {
                    Some(Packet::PubRel(PubRelPacket::new(record.packet_id)))
                }
                _ => None,
            })
            .collect()
    }

    /// Drops every record, as a clean start requires.
    pub fn clear(&mut self) {
        debug!(
            outbound = self.outbound.len(),
            inbound = self.inbound.len(),
            "clearing in-flight state"
        );
        self.outbound.clear();
        self.inbound.clear();
    }

    /// Every record, outbound first, each direction in identifier order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<InFlightRecord> {
        self.outbound
            .values()
            .chain(self.inbound.values())
            .cloned()
            .collect()
    }

    /// Replaces the current records with `records`.
    ///
    /// # Errors
    /// `PacketIdInUse` for an identifier listed twice in one direction,
    /// `ProtocolError` for a record awaiting PUBACK or PUBREC without its
    /// PUBLISH. The tracker is left empty on error.
    pub fn restore(&mut self, records: Vec<InFlightRecord>) -> Result<()> {
        self.outbound.clear();
        self.inbound.clear();

        for record in records {
            let packet_id = record.packet_id;
            let needs_publish = matches!(
                record.stage,
                InFlightStage::AwaitingPubAck | InFlightStage::AwaitingPubRec
            );
            if needs_publish && record.publish.is_none() {
                self.clear();
                return Err(MqttError::ProtocolError(format!(
                    "in-flight record {packet_id} has no PUBLISH to retransmit"
                )));
            }

            let target = if record.stage.is_outbound() {
                &mut self.outbound
            } else {
                &mut self.inbound
            };
            if target.insert(packet_id, record).is_some() {
                self.clear();
                return Err(MqttError::PacketIdInUse(packet_id));
            }
        }

        debug!(
            outbound = self.outbound.len(),
            inbound = self.inbound.len(),
            "restored in-flight state"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish(packet_id: u16, qos: QoS) -> PublishPacket {
        PublishPacket::new("t/1", &b"payload"[..], qos).with_packet_id(packet_id)
    }

    #[test]
    fn test_qos0_send_leaves_no_state() {
        let mut tracker = DeliveryTracker::default();
        let message = PublishPacket::new("t", &b"x"[..], QoS::AtMostOnce);
        let actions = tracker.send_publish(message.clone()).unwrap();

        assert_eq!(actions, vec![DeliveryAction::Send(Packet::Publish(message))]);
        assert_eq!(tracker.outbound_in_flight(), 0);
    }

    #[test]
    fn test_qos1_outbound_flow() {
        let mut tracker = DeliveryTracker::default();
        tracker.send_publish(publish(1, QoS::AtLeastOnce)).unwrap();
        assert_eq!(tracker.stage(1), Some(InFlightStage::AwaitingPubAck));

        let actions = tracker.handle_puback(&PubAckPacket::new(1)).unwrap();
        assert_eq!(actions, vec![DeliveryAction::Completed { packet_id: 1 }]);
        assert_eq!(tracker.stage(1), None);
    }

    #[test]
    fn test_qos1_puback_error_reason() {
        let mut tracker = DeliveryTracker::default();
        tracker.send_publish(publish(4, QoS::AtLeastOnce)).unwrap();

        let puback = PubAckPacket::new_with_reason(4, ReasonCode::QuotaExceeded).unwrap();
        let actions = tracker.handle_puback(&puback).unwrap();
        assert_eq!(
            actions,
            vec![DeliveryAction::Failed {
                packet_id: 4,
                reason_code: ReasonCode::QuotaExceeded
            }]
        );
        assert_eq!(tracker.outbound_in_flight(), 0);
    }

    #[test]
    fn test_qos2_outbound_flow() {
        let mut tracker = DeliveryTracker::default();
        tracker.send_publish(publish(7, QoS::ExactlyOnce)).unwrap();
        assert_eq!(tracker.stage(7), Some(InFlightStage::AwaitingPubRec));

        let actions = tracker.handle_pubrec(&PubRecPacket::new(7)).unwrap();
        assert_eq!(
            actions,
            vec![DeliveryAction::Send(Packet::PubRel(PubRelPacket::new(7)))]
        );
        assert_eq!(tracker.stage(7), Some(InFlightStage::AwaitingPubComp));

        let actions = tracker.handle_pubcomp(&PubCompPacket::new(7)).unwrap();
        assert_eq!(actions, vec![DeliveryAction::Completed { packet_id: 7 }]);
        assert_eq!(tracker.stage(7), None);
    }

    #[test]
    fn test_pubrec_error_ends_exchange_without_pubrel() {
        let mut tracker = DeliveryTracker::default();
        tracker.send_publish(publish(8, QoS::ExactlyOnce)).unwrap();

        let pubrec = PubRecPacket::new_with_reason(8, ReasonCode::NotAuthorized).unwrap();
        let actions = tracker.handle_pubrec(&pubrec).unwrap();
        assert_eq!(
            actions,
            vec![DeliveryAction::Failed {
                packet_id: 8,
                reason_code: ReasonCode::NotAuthorized
            }]
        );
        assert_eq!(tracker.outbound_in_flight(), 0);
    }

    #[test]
    fn test_repeated_pubrec_resends_pubrel() {
        let mut tracker = DeliveryTracker::default();
        tracker.send_publish(publish(9, QoS::ExactlyOnce)).unwrap();
        tracker.handle_pubrec(&PubRecPacket::new(9)).unwrap();

        let actions = tracker.handle_pubrec(&PubRecPacket::new(9)).unwrap();
        assert_eq!(
            actions,
            vec![DeliveryAction::Send(Packet::PubRel(PubRelPacket::new(9)))]
        );
        assert_eq!(tracker.stage(9), Some(InFlightStage::AwaitingPubComp));
    }

    #[test]
    fn test_unknown_acknowledgments_are_recoverable() {
        let mut tracker = DeliveryTracker::default();

        let error = tracker.handle_puback(&PubAckPacket::new(1)).unwrap_err();
        assert_eq!(error, MqttError::PacketIdNotFound(1));
        assert!(!error.is_fatal());

        assert_eq!(
            tracker.handle_pubrec(&PubRecPacket::new(2)),
            Err(MqttError::PacketIdNotFound(2))
        );
        assert_eq!(
            tracker.handle_pubcomp(&PubCompPacket::new(3)),
            Err(MqttError::PacketIdNotFound(3))
        );
    }

    #[test]
    fn test_ack_for_wrong_stage_is_unknown() {
        let mut tracker = DeliveryTracker::default();
        tracker.send_publish(publish(5, QoS::ExactlyOnce)).unwrap();

        assert_eq!(
            tracker.handle_puback(&PubAckPacket::new(5)),
            Err(MqttError::PacketIdNotFound(5))
        );
        assert_eq!(
            tracker.handle_pubcomp(&PubCompPacket::new(5)),
            Err(MqttError::PacketIdNotFound(5))
        );
        assert_eq!(tracker.stage(5), Some(InFlightStage::AwaitingPubRec));
    }

    #[test]
    fn test_packet_id_in_use() {
        let mut tracker = DeliveryTracker::default();
        tracker.send_publish(publish(1, QoS::AtLeastOnce)).unwrap();
        assert_eq!(
            tracker.send_publish(publish(1, QoS::ExactlyOnce)),
            Err(MqttError::PacketIdInUse(1))
        );
        assert_eq!(tracker.stage(1), Some(InFlightStage::AwaitingPubAck));
    }

    #[test]
    fn test_receive_maximum() {
        let mut tracker =
            DeliveryTracker::new(DeliveryConfig::new().with_receive_maximum(2)).unwrap();
        tracker.send_publish(publish(1, QoS::AtLeastOnce)).unwrap();
        tracker.send_publish(publish(2, QoS::ExactlyOnce)).unwrap();
        assert_eq!(
            tracker.send_publish(publish(3, QoS::AtLeastOnce)),
            Err(MqttError::ReceiveMaximumExceeded)
        );

        let message = PublishPacket::new("t", &b"x"[..], QoS::AtMostOnce);
        assert!(tracker.send_publish(message).is_ok());

        tracker.handle_puback(&PubAckPacket::new(1)).unwrap();
        assert!(tracker.send_publish(publish(3, QoS::AtLeastOnce)).is_ok());
    }

    #[test]
    fn test_unencodable_publish_is_not_recorded() {
        let mut tracker = DeliveryTracker::default();

        assert!(matches!(
            tracker.send_publish(publish(0, QoS::AtLeastOnce)),
            Err(MqttError::MalformedPacket(_))
        ));
        let wildcard = PublishPacket::new("a/+", &b"x"[..], QoS::ExactlyOnce).with_packet_id(5);
        assert!(matches!(
            tracker.send_publish(wildcard),
            Err(MqttError::MalformedPacket(_))
        ));
        let mut foreign = publish(6, QoS::AtLeastOnce);
        foreign.properties.set_reason_string("r".to_string());
        assert_eq!(
            tracker.send_publish(foreign),
            Err(MqttError::InvalidPropertyId(0x1F))
        );
        let qos0_with_id = PublishPacket::new("t", &b"x"[..], QoS::AtMostOnce).with_packet_id(7);
        assert!(tracker.send_publish(qos0_with_id).is_err());

        assert_eq!(tracker.outbound_in_flight(), 0);
        assert!(tracker.retransmissions().is_empty());
    }

    #[test]
    fn test_inbound_zero_packet_id_rejected() {
        let mut tracker = DeliveryTracker::default();
        for qos in [QoS::AtLeastOnce, QoS::ExactlyOnce] {
            assert!(matches!(
                tracker.handle_publish(publish(0, qos)),
                Err(MqttError::MalformedPacket(_))
            ));
        }
        assert_eq!(tracker.inbound_in_flight(), 0);
    }

    #[test]
    fn test_zero_receive_maximum_rejected() {
        assert!(matches!(
            DeliveryTracker::new(DeliveryConfig::new().with_receive_maximum(0)),
            Err(MqttError::Configuration(_))
        ));

        let mut tracker =
            DeliveryTracker::new(DeliveryConfig::new().with_receive_maximum(1)).unwrap();
        assert!(matches!(
            tracker.set_receive_maximum(0),
            Err(MqttError::ProtocolError(_))
        ));
        assert_eq!(tracker.config().receive_maximum, 1);
        assert!(tracker.send_publish(publish(1, QoS::AtLeastOnce)).is_ok());

        tracker.set_receive_maximum(2).unwrap();
        assert!(tracker.send_publish(publish(2, QoS::AtLeastOnce)).is_ok());
    }

    #[test]
    fn test_missing_packet_id_rejected() {
        let mut tracker = DeliveryTracker::default();
        let message = PublishPacket::new("t", &b"x"[..], QoS::AtLeastOnce);
        assert!(matches!(
            tracker.send_publish(message),
            Err(MqttError::MalformedPacket(_))
        ));
    }

    #[test]
    fn test_inbound_qos0_and_qos1() {
        let mut tracker = DeliveryTracker::default();

        let message = PublishPacket::new("t", &b"x"[..], QoS::AtMostOnce);
        assert_eq!(
            tracker.handle_publish(message.clone()).unwrap(),
            vec![DeliveryAction::Deliver(message)]
        );

        let message = publish(11, QoS::AtLeastOnce);
        assert_eq!(
            tracker.handle_publish(message.clone()).unwrap(),
            vec![
                DeliveryAction::Deliver(message),
                DeliveryAction::Send(Packet::PubAck(PubAckPacket::new(11))),
            ]
        );
        assert_eq!(tracker.inbound_in_flight(), 0);
    }

    #[test]
    fn test_inbound_qos2_delivers_once() {
        let mut tracker = DeliveryTracker::default();
        let message = publish(20, QoS::ExactlyOnce);

        let actions = tracker.handle_publish(message.clone()).unwrap();
        assert_eq!(
            actions,
            vec![
                DeliveryAction::Deliver(message.clone()),
                DeliveryAction::Send(Packet::PubRec(PubRecPacket::new(20))),
            ]
        );
        assert_eq!(tracker.stage(20), Some(InFlightStage::AwaitingPubRel));

        let actions = tracker.handle_publish(message.with_dup(true)).unwrap();
        assert_eq!(
            actions,
            vec![DeliveryAction::Send(Packet::PubRec(PubRecPacket::new(20)))]
        );

        let actions = tracker.handle_pubrel(&PubRelPacket::new(20)).unwrap();
        assert_eq!(
            actions,
            vec![DeliveryAction::Send(Packet::PubComp(PubCompPacket::new(20)))]
        );
        assert_eq!(tracker.inbound_in_flight(), 0);
    }

    #[test]
    fn test_unknown_pubrel_answers_not_found() {
        let mut tracker = DeliveryTracker::default();
        let actions = tracker.handle_pubrel(&PubRelPacket::new(30)).unwrap();
        let expected =
            PubCompPacket::new_with_reason(30, ReasonCode::PacketIdentifierNotFound).unwrap();
        assert_eq!(actions, vec![DeliveryAction::Send(Packet::PubComp(expected))]);
    }

    #[test]
    fn test_retransmissions_in_id_order() {
        let mut tracker = DeliveryTracker::default();
        tracker.send_publish(publish(3, QoS::ExactlyOnce)).unwrap();
        tracker.send_publish(publish(1, QoS::AtLeastOnce)).unwrap();
        tracker.send_publish(publish(2, QoS::ExactlyOnce)).unwrap();
        tracker.handle_pubrec(&PubRecPacket::new(2)).unwrap();
        tracker.handle_publish(publish(9, QoS::ExactlyOnce)).unwrap();

        let packets = tracker.retransmissions();
        assert_eq!(
            packets,
            vec![
                Packet::Publish(publish(1, QoS::AtLeastOnce).with_dup(true)),
                Packet::PubRel(PubRelPacket::new(2)),
                Packet::Publish(publish(3, QoS::ExactlyOnce).with_dup(true)),
            ]
        );
    }

    #[test]
    fn test_clear() {
        let mut tracker = DeliveryTracker::default();
        tracker.send_publish(publish(1, QoS::AtLeastOnce)).unwrap();
        tracker.handle_publish(publish(2, QoS::ExactlyOnce)).unwrap();

        tracker.clear();
        assert_eq!(tracker.outbound_in_flight(), 0);
        assert_eq!(tracker.inbound_in_flight(), 0);
        assert!(tracker.retransmissions().is_empty());
    }

    #[test]
    fn test_snapshot_restore_preserves_retransmissions() {
        let mut tracker = DeliveryTracker::default();
        tracker.send_publish(publish(1, QoS::AtLeastOnce)).unwrap();
        tracker.send_publish(publish(2, QoS::ExactlyOnce)).unwrap();
        tracker.handle_pubrec(&PubRecPacket::new(2)).unwrap();
        tracker.handle_publish(publish(5, QoS::ExactlyOnce)).unwrap();

        let json = serde_json::to_string(&tracker.snapshot()).unwrap();
        let records: Vec<InFlightRecord> = serde_json::from_str(&json).unwrap();

        let mut restored = DeliveryTracker::default();
        restored.restore(records).unwrap();
        assert_eq!(restored.retransmissions(), tracker.retransmissions());
        assert_eq!(restored.stage(5), Some(InFlightStage::AwaitingPubRel));
        assert_eq!(restored.snapshot(), tracker.snapshot());
    }

    #[test]
    fn test_restore_rejects_duplicates() {
        let record = InFlightRecord {
            packet_id: 1,
            stage: InFlightStage::AwaitingPubComp,
            publish: None,
        };
        let mut tracker = DeliveryTracker::default();
        assert_eq!(
            tracker.restore(vec![record.clone(), record]),
            Err(MqttError::PacketIdInUse(1))
        );
        assert_eq!(tracker.outbound_in_flight(), 0);
    }

    #[test]
    fn test_restore_requires_publish_for_retransmission() {
        let record = InFlightRecord {
            packet_id: 1,
            stage: InFlightStage::AwaitingPubAck,
            publish: None,
        };
        let mut tracker = DeliveryTracker::default();
        assert!(matches!(
            tracker.restore(vec![record]),
            Err(MqttError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_handle_packet_dispatch() {
        let mut tracker = DeliveryTracker::default();
        tracker.send_publish(publish(1, QoS::AtLeastOnce)).unwrap();

        let actions = tracker
            .handle_packet(Packet::PubAck(PubAckPacket::new(1)))
            .unwrap();
        assert_eq!(actions, vec![DeliveryAction::Completed { packet_id: 1 }]);
        assert!(tracker.handle_packet(Packet::PingResp).unwrap().is_empty());
    }
}
