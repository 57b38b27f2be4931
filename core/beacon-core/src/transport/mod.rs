//! Beacon transports.
//!
//! A transport takes a fully addressed [`Beacon`] and delivers it on a
//! best-effort basis. The contract every implementation honours:
//!
//! - `send` returns without waiting for delivery
//! - failures are logged and dropped, never reported to the caller
//! - no retries; a lost beacon stays lost
//! - a send started during page teardown is allowed to finish on its own

mod http;
mod recording;

pub use http::{HttpTransport, TransportStats};
pub use recording::RecordingTransport;

use beacon_protocol::Beacon;

pub trait Transport: Send + Sync {
    fn send(&self, beacon: Beacon);
}
