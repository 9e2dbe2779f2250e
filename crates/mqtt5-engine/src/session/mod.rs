pub mod inflight;
pub mod state;

pub use inflight::{DeliveryAction, DeliveryTracker, InFlightRecord, InFlightStage};
pub use state::SessionState;
