use bytes::BytesMut;
use mqtt5_engine::packet::{PubRecPacket, PublishPacket};
use mqtt5_engine::{
    DeliveryAction, DeliveryConfig, DeliveryTracker, InFlightRecord, InFlightStage, MqttError,
    Packet, PacketCodec, QoS, ReasonCode, SessionState,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// One side of a connection: its tracker plus everything it handed to the
/// application.
struct Endpoint {
    tracker: DeliveryTracker,
    delivered: Vec<PublishPacket>,
    completed: Vec<u16>,
    failed: Vec<(u16, ReasonCode)>,
}

impl Endpoint {
    fn new() -> Self {
        Self {
            tracker: DeliveryTracker::default(),
            delivered: Vec::new(),
            completed: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Applies actions, writing every outgoing packet to `wire`.
    fn apply(&mut self, actions: Vec<DeliveryAction>, wire: &mut BytesMut) {
        let codec = PacketCodec::default();
        for action in actions {
            match action {
                DeliveryAction::Send(packet) => codec.encode(&packet, wire).unwrap(),
                DeliveryAction::Deliver(publish) => self.delivered.push(publish),
                DeliveryAction::Completed { packet_id } => self.completed.push(packet_id),
                DeliveryAction::Failed {
                    packet_id,
                    reason_code,
                } => self.failed.push((packet_id, reason_code)),
            }
        }
    }

    /// Reads every complete packet from `inbound` and answers into `outbound`.
    fn receive(&mut self, inbound: &mut BytesMut, outbound: &mut BytesMut) -> usize {
        let codec = PacketCodec::default();
        let mut handled = 0;
        while let Some(packet) = codec.decode(inbound).unwrap() {
            let actions = self.tracker.handle_packet(packet).unwrap();
            self.apply(actions, outbound);
            handled += 1;
        }
        handled
    }
}

/// Pumps bytes between the two endpoints until both wires are empty.
fn settle(client: &mut Endpoint, broker: &mut Endpoint, to_broker: &mut BytesMut) {
    let mut to_client = BytesMut::new();
    loop {
        let a = broker.receive(to_broker, &mut to_client);
        let b = client.receive(&mut to_client, to_broker);
        if a == 0 && b == 0 {
            break;
        }
    }
}

#[test]
fn qos1_and_qos2_complete_over_the_wire() {
    init_tracing();
    let session = SessionState::new("flows");
    let mut client = Endpoint::new();
    let mut broker = Endpoint::new();
    let mut wire = BytesMut::new();

    for qos in [QoS::AtMostOnce, QoS::AtLeastOnce, QoS::ExactlyOnce] {
        let mut publish = PublishPacket::new("plant/line1", &b"running"[..], qos);
        if qos != QoS::AtMostOnce {
            publish = publish.with_packet_id(session.next_packet_id());
        }
        let actions = client.tracker.send_publish(publish).unwrap();
        client.apply(actions, &mut wire);
    }
    assert_eq!(client.tracker.outbound_in_flight(), 2);

    settle(&mut client, &mut broker, &mut wire);

    assert_eq!(broker.delivered.len(), 3);
    assert_eq!(client.completed, vec![1, 2]);
    assert!(client.failed.is_empty());
    assert_eq!(client.tracker.outbound_in_flight(), 0);
    assert_eq!(broker.tracker.inbound_in_flight(), 0);
}

#[test]
fn qos2_redelivery_does_not_reach_application_twice() {
    init_tracing();
    let mut broker = Endpoint::new();
    let codec = PacketCodec::default();
    let publish = PublishPacket::new("orders", &b"#1001"[..], QoS::ExactlyOnce).with_packet_id(77);

    let mut wire = BytesMut::new();
    codec
        .encode(&Packet::Publish(publish.clone()), &mut wire)
        .unwrap();
    codec
        .encode(&Packet::Publish(publish.with_dup(true)), &mut wire)
        .unwrap();

    let mut replies = BytesMut::new();
    assert_eq!(broker.receive(&mut wire, &mut replies), 2);

    assert_eq!(broker.delivered.len(), 1);
    assert_eq!(
        broker.tracker.stage(77),
        Some(InFlightStage::AwaitingPubRel)
    );
    let expected = Packet::PubRec(PubRecPacket::new(77)).to_bytes().unwrap();
    assert_eq!(&replies[..], [&expected[..], &expected[..]].concat());
}

#[test]
fn refused_publish_frees_its_identifier() {
    let mut tracker =
        DeliveryTracker::new(DeliveryConfig::new().with_receive_maximum(1)).unwrap();
    let publish = PublishPacket::new("t", &b"x"[..], QoS::ExactlyOnce).with_packet_id(5);
    tracker.send_publish(publish.clone()).unwrap();
    assert_eq!(
        tracker.send_publish(publish.clone().with_packet_id(6)),
        Err(MqttError::ReceiveMaximumExceeded)
    );

    let pubrec = PubRecPacket::new_with_reason(5, ReasonCode::NotAuthorized).unwrap();
    let actions = tracker.handle_packet(Packet::PubRec(pubrec)).unwrap();
    assert_eq!(
        actions,
        vec![DeliveryAction::Failed {
            packet_id: 5,
            reason_code: ReasonCode::NotAuthorized
        }]
    );

    assert!(tracker.send_publish(publish).is_ok());
}

#[test]
fn unknown_ack_is_reported_but_stream_continues() {
    let mut client = Endpoint::new();
    let codec = PacketCodec::default();
    let mut wire = BytesMut::new();
    codec
        .encode(
            &Packet::PubAck(mqtt5_engine::packet::PubAckPacket::new(404)),
            &mut wire,
        )
        .unwrap();
    codec.encode(&Packet::PingResp, &mut wire).unwrap();

    let first = codec.decode(&mut wire).unwrap().unwrap();
    let error = client.tracker.handle_packet(first).unwrap_err();
    assert_eq!(error, MqttError::PacketIdNotFound(404));
    assert!(!error.is_fatal());

    assert_eq!(codec.decode(&mut wire).unwrap(), Some(Packet::PingResp));
}

#[test]
fn resumed_session_retransmits_from_persisted_records() {
    init_tracing();
    let mut tracker = DeliveryTracker::default();
    for (id, qos) in [(1, QoS::AtLeastOnce), (2, QoS::ExactlyOnce), (3, QoS::ExactlyOnce)] {
        let publish = PublishPacket::new("log", vec![id as u8; 4], qos).with_packet_id(id);
        tracker.send_publish(publish).unwrap();
    }
    tracker
        .handle_packet(Packet::PubRec(PubRecPacket::new(3)))
        .unwrap();

    let stored = serde_json::to_vec(&tracker.snapshot()).unwrap();

    let mut resumed = DeliveryTracker::default();
    let records: Vec<InFlightRecord> = serde_json::from_slice(&stored).unwrap();
    resumed.restore(records).unwrap();

    let packets = resumed.retransmissions();
    assert_eq!(packets.len(), 3);
    for packet in &packets[..2] {
        let Packet::Publish(publish) = packet else {
            panic!("expected PUBLISH");
        };
        assert!(publish.dup);
    }
    assert_eq!(packets[2].packet_type(), mqtt5_engine::PacketType::PubRel);
    assert_eq!(packets, tracker.retransmissions());

    resumed.clear();
    assert!(resumed.retransmissions().is_empty());
}
