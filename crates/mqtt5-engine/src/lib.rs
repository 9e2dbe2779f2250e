#![warn(clippy::pedantic)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

//! MQTT v5.0 client engine.
//!
//! Turns application intents into exact MQTT v5 wire bytes and received bytes
//! back into typed packets, while tracking the per-session state the protocol
//! needs: in-flight QoS 1/2 exchanges, subscription identifiers and message
//! identifiers. No I/O happens here; the surrounding client owns the socket.

pub mod config;
pub mod constants;
pub mod encoding;
pub mod error;
pub mod error_classification;
pub mod flags;
pub mod packet;
pub mod packet_id;
pub mod protocol;
pub mod qos2;
pub mod session;
pub mod types;

pub use config::{CodecConfig, DeliveryConfig};
pub use error::{MqttError, Result};
pub use error_classification::ErrorSeverity;
pub use flags::{ConnAckFlags, ConnectFlags, PublishFlags};
pub use packet::{FixedHeader, MqttPacket, Packet, PacketCodec, PacketType};
pub use packet_id::PacketIdGenerator;
pub use protocol::v5::properties::{
    Properties, PropertyId, PropertyScope, PropertyValue, PropertyValueType,
};
pub use protocol::v5::reason_codes::ReasonCode;
pub use session::inflight::{DeliveryAction, DeliveryTracker, InFlightRecord, InFlightStage};
pub use session::state::SessionState;
pub use types::QoS;
