//! # beacon-core
//!
//! Session lifecycle tracking for pages instrumented with the Trantor beacon.
//!
//! A [`SessionLifecycleTracker`] turns page lifecycle signals (load,
//! visibility, focus, blur) into exactly one session-start or session-end
//! beacon per real transition, and reports click events on demand.
//!
//! ## Design Principles
//!
//! - **Single-threaded tracker**: state lives in a `Cell`, handed out as `Rc`.
//!   The page environment drives it from one event loop.
//! - **Injected collaborators**: the page ([`PageEnvironment`]) and the network
//!   ([`Transport`]) are traits, so the state machine runs without a browser.
//! - **Telemetry never breaks the page**: delivery failures are logged and
//!   dropped. Only a malformed embedding is an error, and it is fatal.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use beacon_core::{ScriptTag, ScriptedPage, SessionLifecycleTracker, TrackingContext};
//!
//! let tag = ScriptTag::new("https://stats.example.com/launch-control.js")
//!     .with_data("id", "trantor")
//!     .with_data("tracking-id", "trk-42");
//! let context = TrackingContext::from_script_tags(&[tag])?;
//! let tracker = SessionLifecycleTracker::new(context, page, transport);
//! tracker.initialize();
//! tracker.report_click("signup-button");
//! ```

pub mod attribution;
pub mod clock;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod session;
pub mod transport;

pub use attribution::extract_source_name;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::LaunchControlConfig;
pub use context::{ScriptTag, TrackingContext};
pub use environment::{PageEnvironment, PageSignal, ScriptedPage, SignalListener, VisibilityState};
pub use error::{BeaconError, Result};
pub use session::{SessionLifecycleTracker, SessionRequest, SessionState};
pub use transport::{HttpTransport, RecordingTransport, Transport, TransportStats};
