//! Guard rules for session transitions and the page-signal mapping.
//! A refused request is a no-op, never an error.

use super::types::{SessionRequest, SessionState};
use crate::environment::{PageSignal, VisibilityState};

/// Returns the state a request moves to, or `None` when the guard refuses it.
pub fn next_state(current: SessionState, request: SessionRequest) -> Option<SessionState> {
    match (current, request) {
        (SessionState::None | SessionState::Ended, SessionRequest::Start) => {
            Some(SessionState::Started)
        }
        (SessionState::Started, SessionRequest::End) => Some(SessionState::Ended),
        (SessionState::Started, SessionRequest::Start) => None,
        (SessionState::None | SessionState::Ended, SessionRequest::End) => None,
    }
}

pub fn request_for_signal(signal: PageSignal) -> Option<SessionRequest> {
    match signal {
        PageSignal::Visibility(VisibilityState::Visible) => Some(SessionRequest::Start),
        PageSignal::Visibility(VisibilityState::Hidden) => Some(SessionRequest::End),
        PageSignal::Visibility(VisibilityState::Other) => None,
        PageSignal::Focus => Some(SessionRequest::Start),
        PageSignal::Blur => Some(SessionRequest::End),
        PageSignal::PageHide => Some(SessionRequest::End),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_from_none() {
        assert_eq!(
            next_state(SessionState::None, SessionRequest::Start),
            Some(SessionState::Started)
        );
    }

    #[test]
    fn test_start_from_ended_restarts() {
        assert_eq!(
            next_state(SessionState::Ended, SessionRequest::Start),
            Some(SessionState::Started)
        );
    }

    #[test]
    fn test_start_while_started_is_refused() {
        assert_eq!(next_state(SessionState::Started, SessionRequest::Start), None);
    }

    #[test]
    fn test_end_from_started() {
        assert_eq!(
            next_state(SessionState::Started, SessionRequest::End),
            Some(SessionState::Ended)
        );
    }

    #[test]
    fn test_end_before_any_start_is_refused() {
        assert_eq!(next_state(SessionState::None, SessionRequest::End), None);
    }

    #[test]
    fn test_end_while_ended_is_refused() {
        assert_eq!(next_state(SessionState::Ended, SessionRequest::End), None);
    }

    #[test]
    fn test_signal_mapping() {
        assert_eq!(
            request_for_signal(PageSignal::Visibility(VisibilityState::Visible)),
            Some(SessionRequest::Start)
        );
        assert_eq!(
            request_for_signal(PageSignal::Visibility(VisibilityState::Hidden)),
            Some(SessionRequest::End)
        );
        assert_eq!(request_for_signal(PageSignal::Focus), Some(SessionRequest::Start));
        assert_eq!(request_for_signal(PageSignal::Blur), Some(SessionRequest::End));
        assert_eq!(request_for_signal(PageSignal::PageHide), Some(SessionRequest::End));
    }

    #[test]
    fn test_other_visibility_states_are_ignored() {
        assert_eq!(
            request_for_signal(PageSignal::Visibility(VisibilityState::Other)),
            None
        );
    }
}
