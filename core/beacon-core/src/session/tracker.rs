//! The session lifecycle tracker.
//!
//! One tracker exists per page load. It is the only writer of its
//! [`SessionState`] and the only sender of session beacons. The guard check
//! and the state flip happen back to back on the caller's thread, before the
//! beacon is handed to the transport, so a second signal arriving while the
//! first beacon is still in flight already sees the new state.

use super::transition::{next_state, request_for_signal};
use super::types::{SessionRequest, SessionState};
use crate::attribution::extract_source_name;
use crate::clock::{Clock, SystemClock};
use crate::context::TrackingContext;
use crate::environment::{PageEnvironment, PageSignal};
use crate::transport::Transport;
use beacon_protocol::{
    timestamp_seconds, Beacon, ClickEventPayload, SessionEndPayload, SessionStartPayload,
    SESSION_END_PATH, SESSION_EVENT_PATH, SESSION_START_PATH, SOURCE_NAME_HEADER,
    TRACKING_ID_HEADER,
};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SessionLifecycleTracker {
    context: TrackingContext,
    page: Rc<dyn PageEnvironment>,
    transport: Arc<dyn Transport>,
    clock: Box<dyn Clock>,
    state: Cell<SessionState>,
}

impl SessionLifecycleTracker {
    pub fn new(
        context: TrackingContext,
        page: Rc<dyn PageEnvironment>,
        transport: Arc<dyn Transport>,
    ) -> Rc<Self> {
        Self::with_clock(context, page, transport, SystemClock)
    }

    pub fn with_clock(
        context: TrackingContext,
        page: Rc<dyn PageEnvironment>,
        transport: Arc<dyn Transport>,
        clock: impl Clock + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            context,
            page,
            transport,
            clock: Box::new(clock),
            state: Cell::new(SessionState::None),
        })
    }

    /// Starts the first session and wires the tracker to page signals.
    ///
    /// The page only holds a weak handle; once every strong reference is
    /// dropped, later signals are ignored and the teardown beacon is sent.
    pub fn initialize(self: &Rc<Self>) {
        self.request_start();

        let tracker = Rc::downgrade(self);
        self.page.subscribe(Box::new(move |signal| {
            if let Some(tracker) = tracker.upgrade() {
                tracker.handle_signal(signal);
            }
        }));
    }

    pub fn handle_signal(&self, signal: PageSignal) {
        match request_for_signal(signal) {
            Some(request) => {
                self.apply(request, signal);
            }
            None => debug!(%signal, "Signal carries no session transition"),
        }
    }

    /// Opens a session unless one is already open. Returns whether a
    /// transition (and therefore a beacon) happened.
    pub fn request_start(&self) -> bool {
        self.apply_request(SessionRequest::Start)
    }

    /// Closes the open session, if any. Returns whether a transition happened.
    pub fn request_end(&self) -> bool {
        self.apply_request(SessionRequest::End)
    }

    /// Reports a click regardless of session state.
    pub fn report_click(&self, label: &str) {
        info!(tracking_id = %self.context.tracking_id(), target = %label, "click event");

        let beacon = Beacon::click(
            self.context.endpoint(SESSION_EVENT_PATH),
            &ClickEventPayload::new(label),
        )
        .with_header(TRACKING_ID_HEADER, self.context.tracking_id());
        self.transport.send(beacon);
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn context(&self) -> &TrackingContext {
        &self.context
    }

    fn apply(&self, request: SessionRequest, signal: PageSignal) -> bool {
        debug!(%signal, ?request, "Page signal");
        self.apply_request(request)
    }

    fn apply_request(&self, request: SessionRequest) -> bool {
        let current = self.state.get();
        let next = match next_state(current, request) {
            Some(next) => next,
            None => {
                debug!(state = ?current, ?request, "Transition refused");
                return false;
            }
        };

        self.state.set(next);

        match request {
            SessionRequest::Start => {
                info!(tracking_id = %self.context.tracking_id(), "session start");
                self.send_session_start();
            }
            SessionRequest::End => {
                info!(tracking_id = %self.context.tracking_id(), "session end");
                self.send_session_end();
            }
        }
        true
    }

    fn send_session_start(&self) {
        let source = extract_source_name(&*self.page);
        let location = self.page.location();
        let payload = SessionStartPayload {
            timestamp: timestamp_seconds(self.clock.now()),
            pathname: location.path().to_string(),
            title: self.page.title(),
        };

        let mut beacon =
            Beacon::session_start(self.context.endpoint(SESSION_START_PATH), &payload)
                .with_header(TRACKING_ID_HEADER, self.context.tracking_id());
        if let Some(source) = source {
            beacon = beacon.with_header(SOURCE_NAME_HEADER, source);
        }

        self.transport.send(beacon);
    }

    fn send_session_end(&self) {
        let payload = SessionEndPayload {
            timestamp: timestamp_seconds(self.clock.now()),
        };
        self.transport.send(Beacon::session_end(
            self.context.endpoint(SESSION_END_PATH),
            &payload,
        ));
    }
}

impl Drop for SessionLifecycleTracker {
    fn drop(&mut self) {
        if self.request_end() {
            debug!("Sent teardown session end");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::environment::{ScriptedPage, VisibilityState};
    use crate::transport::RecordingTransport;
    use beacon_protocol::BeaconKind;
    use chrono::{TimeZone, Utc};
    use url::Url;

    struct Harness {
        page: Rc<ScriptedPage>,
        transport: Arc<RecordingTransport>,
        tracker: Rc<SessionLifecycleTracker>,
    }

    fn harness(url: &str) -> Harness {
        let page = Rc::new(ScriptedPage::new(Url::parse(url).unwrap(), "Home"));
        let transport = Arc::new(RecordingTransport::new());
        let context = TrackingContext::new("https://stats.example.com", "trk-7").unwrap();
        let clock = FixedClock(Utc.timestamp_millis_opt(1_700_000_000_250).unwrap());
        let tracker = SessionLifecycleTracker::with_clock(
            context,
            page.clone(),
            transport.clone(),
            clock,
        );
        Harness {
            page,
            transport,
            tracker,
        }
    }

    #[test]
    fn test_new_tracker_is_idle_and_silent() {
        let h = harness("https://shop.example.com/");
        assert_eq!(h.tracker.state(), SessionState::None);
        assert!(h.transport.beacons().is_empty());
    }

    #[test]
    fn test_repeated_start_sends_one_beacon() {
        let h = harness("https://shop.example.com/");
        assert!(h.tracker.request_start());
        assert!(!h.tracker.request_start());
        assert_eq!(h.transport.kinds(), vec![BeaconKind::SessionStart]);
        assert_eq!(h.tracker.state(), SessionState::Started);
    }

    #[test]
    fn test_repeated_end_sends_one_beacon() {
        let h = harness("https://shop.example.com/");
        h.tracker.request_start();
        assert!(h.tracker.request_end());
        assert!(!h.tracker.request_end());
        assert_eq!(
            h.transport.kinds(),
            vec![BeaconKind::SessionStart, BeaconKind::SessionEnd]
        );
    }

    #[test]
    fn test_end_without_start_is_silent() {
        let h = harness("https://shop.example.com/");
        assert!(!h.tracker.request_end());
        assert_eq!(h.tracker.state(), SessionState::None);
        assert!(h.transport.beacons().is_empty());
    }

    #[test]
    fn test_session_start_beacon_shape() {
        let h = harness("https://shop.example.com/pricing?plan=pro");
        h.tracker.request_start();

        let beacon = &h.transport.beacons()[0];
        assert_eq!(beacon.url, "https://stats.example.com/session/start");
        assert_eq!(beacon.header("content-type"), Some("application/json"));
        assert_eq!(beacon.header("x-tracking-id"), Some("trk-7"));
        assert!(!beacon.has_header("x-source-name"));
        assert_eq!(
            beacon.body,
            serde_json::json!({
                "timestamp": 1_700_000_000.25,
                "pathname": "/pricing",
                "title": "Home"
            })
        );
        assert!(beacon.validate().is_ok());
    }

    #[test]
    fn test_session_end_beacon_shape() {
        let h = harness("https://shop.example.com/");
        h.tracker.request_start();
        h.tracker.request_end();

        let beacon = &h.transport.beacons()[1];
        assert_eq!(beacon.url, "https://stats.example.com/session/end");
        assert_eq!(beacon.headers.len(), 1);
        assert_eq!(
            beacon.body,
            serde_json::json!({ "timestamp": 1_700_000_000.25 })
        );
    }

    #[test]
    fn test_click_does_not_touch_state() {
        let h = harness("https://shop.example.com/");
        h.tracker.report_click("signup-button");
        assert_eq!(h.tracker.state(), SessionState::None);

        h.tracker.request_start();
        h.tracker.report_click("checkout");
        assert_eq!(h.tracker.state(), SessionState::Started);

        let clicks: Vec<_> = h
            .transport
            .beacons()
            .into_iter()
            .filter(|beacon| beacon.kind == BeaconKind::Click)
            .collect();
        assert_eq!(clicks.len(), 2);
        assert_eq!(clicks[0].url, "https://stats.example.com/session/event");
        assert_eq!(clicks[0].header("x-tracking-id"), Some("trk-7"));
        assert_eq!(
            clicks[0].body,
            serde_json::json!({"type": "click", "target": "signup-button"})
        );
    }

    #[test]
    fn test_initialize_starts_and_subscribes() {
        let h = harness("https://shop.example.com/");
        h.tracker.initialize();

        assert_eq!(h.tracker.state(), SessionState::Started);
        assert_eq!(h.page.listener_count(), 1);

        h.page.dispatch(PageSignal::Visibility(VisibilityState::Hidden));
        assert_eq!(h.tracker.state(), SessionState::Ended);
    }

    #[test]
    fn test_drop_sends_teardown_end_when_started() {
        let h = harness("https://shop.example.com/");
        h.tracker.initialize();
        let Harness {
            page,
            transport,
            tracker,
        } = h;

        drop(tracker);
        assert_eq!(
            transport.kinds(),
            vec![BeaconKind::SessionStart, BeaconKind::SessionEnd]
        );

        page.dispatch(PageSignal::Focus);
        assert_eq!(transport.beacons().len(), 2);
    }

    #[test]
    fn test_drop_after_end_sends_nothing_more() {
        let h = harness("https://shop.example.com/");
        h.tracker.request_start();
        h.tracker.request_end();
        let transport = h.transport.clone();
        drop(h);
        assert_eq!(transport.beacons().len(), 2);
    }
}
