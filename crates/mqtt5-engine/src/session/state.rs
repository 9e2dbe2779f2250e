use crate::constants::limits::MAX_VARIABLE_BYTE_INTEGER;
use crate::packet::{SubscribePacket, UnsubscribePacket};
use crate::packet_id::PacketIdGenerator;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

/// Largest subscription identifier before allocation wraps back to 1.
pub const MAX_SUBSCRIPTION_IDENTIFIER: u32 = MAX_VARIABLE_BYTE_INTEGER;

/// Per-session identifiers shared by every task of one client.
///
/// Subscription identifiers run 1..=268,435,455 and wrap; message
/// identifiers run 1..=65535 and wrap. A clean start resets both counters.
/// The client identifier outlives resets.
#[derive(Debug)]
pub struct SessionState {
    next_subscription_id: AtomicU32,
    packet_ids: PacketIdGenerator,
    client_id: Mutex<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl SessionState {
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            next_subscription_id: AtomicU32::new(1),
            packet_ids: PacketIdGenerator::new(),
            client_id: Mutex::new(client_id.into()),
        }
    }

    /// Starts the subscription identifier counter at `next`, clamped into
    /// the valid range.
    #[must_use]
    pub fn with_initial_counter(self, next: u32) -> Self {
        self.next_subscription_id
            .store(next.clamp(1, MAX_SUBSCRIPTION_IDENTIFIER), Ordering::Release);
        self
    }

    #[must_use]
    pub fn get_client_id(&self) -> String {
        self.client_id.lock().clone()
    }

    pub fn set_client_id(&self, client_id: impl Into<String>) {
        *self.client_id.lock() = client_id.into();
    }

    /// Returns the current counter and advances it in one compare-and-swap,
    /// so concurrent callers never observe the same value.
    #[must_use]
    pub fn next_subscription_identifier(&self) -> u32 {
        let previous = self.next_subscription_id.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |current| {
                Some(if current >= MAX_SUBSCRIPTION_IDENTIFIER {
                    1
                } else {
                    current + 1
                })
            },
        );
        // The closure never returns None.
        match previous {
            Ok(id) | Err(id) => id,
        }
    }

    #[must_use]
    pub fn next_packet_id(&self) -> u16 {
        self.packet_ids.next()
    }

    /// Resets both counters to 1. The client identifier is kept.
    pub fn clear_session_state(&self) {
        self.next_subscription_id.store(1, Ordering::Release);
        self.packet_ids.reset();
        debug!(client_id = %self.client_id.lock(), "session state cleared");
    }

    /// Applies the session-start semantics of a CONNECT; a clean start
    /// discards the counters, otherwise they carry over.
    pub fn begin(&self, clean_start: bool) {
        if clean_start {
            self.clear_session_state();
        } else {
            debug!(client_id = %self.client_id.lock(), "resuming session state");
        }
    }

    /// A SUBSCRIBE with a fresh message identifier and subscription
    /// identifier, ready for filters.
    #[must_use]
    pub fn new_subscribe(&self) -> SubscribePacket {
        SubscribePacket::new(self.next_packet_id())
            .with_subscription_identifier(self.next_subscription_identifier())
    }

    #[must_use]
    pub fn new_unsubscribe(&self) -> UnsubscribePacket {
        UnsubscribePacket::new(self.next_packet_id())
    }
}
