//! Session lifecycle for an instrumented page.
//!
//! ```text
//!            request_start             request_end
//!   None ─────────────────▶ Started ─────────────────▶ Ended
//!                              ▲                         │
//!                              └──────request_start──────┘
//! ```
//!
//! Browser signals are noisy: blur and hidden usually arrive together, and
//! focus/visible likewise. Each signal requests exactly one transition and the
//! transition guards collapse duplicates, so every taken transition emits one
//! beacon and every refused one emits nothing.
//!
//! # Module Structure
//!
//! - [`types`]: `SessionState` and `SessionRequest`
//! - [`transition`]: pure guard rules and the signal → request mapping
//! - [`tracker`]: `SessionLifecycleTracker`, which owns the state and sends beacons

mod tracker;
mod transition;
mod types;

pub use tracker::SessionLifecycleTracker;
pub use transition::{next_state, request_for_signal};
pub use types::{SessionRequest, SessionState};
