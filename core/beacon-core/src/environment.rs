//! Page environment capability and the in-process scripted page.
//!
//! The tracker never touches a browser directly. It reads the location and
//! title, rewrites the visible URL, and subscribes to lifecycle signals through
//! [`PageEnvironment`], so the state machine runs the same under a real page
//! binding, the `launch-control` host, or a test.

use std::cell::RefCell;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Callback registered for lifecycle signals.
pub type SignalListener = Box<dyn FnMut(PageSignal)>;

/// Lifecycle signals a page delivers, in event-queue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSignal {
    Visibility(VisibilityState),
    Focus,
    Blur,
    /// The page is being torn down (unload/pagehide).
    PageHide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    Visible,
    Hidden,
    /// Any other reported state (e.g. `prerender`); carries no transition.
    Other,
}

impl fmt::Display for PageSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PageSignal::Visibility(VisibilityState::Visible) => "visible",
            PageSignal::Visibility(VisibilityState::Hidden) => "hidden",
            PageSignal::Visibility(VisibilityState::Other) => "visibility-other",
            PageSignal::Focus => "focus",
            PageSignal::Blur => "blur",
            PageSignal::PageHide => "pagehide",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown page signal: {0}")]
pub struct UnknownSignal(pub String);

impl FromStr for PageSignal {
    type Err = UnknownSignal;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "visible" => Ok(PageSignal::Visibility(VisibilityState::Visible)),
            "hidden" => Ok(PageSignal::Visibility(VisibilityState::Hidden)),
            "prerender" => Ok(PageSignal::Visibility(VisibilityState::Other)),
            "focus" => Ok(PageSignal::Focus),
            "blur" => Ok(PageSignal::Blur),
            "pagehide" | "unload" => Ok(PageSignal::PageHide),
            other => Err(UnknownSignal(other.to_string())),
        }
    }
}

/// Capabilities the tracker needs from the page it instruments.
///
/// Implementations must not perform network or storage side effects; the only
/// mutation allowed is [`replace_location`](Self::replace_location), which
/// rewrites the visible URL without navigating.
pub trait PageEnvironment {
    /// Current location (the address bar URL).
    fn location(&self) -> Url;

    fn title(&self) -> String;

    /// Replaces the visible URL in history without reloading the page.
    fn replace_location(&self, url: &Url);

    /// Registers a listener for lifecycle signals.
    fn subscribe(&self, listener: SignalListener);
}

/// In-process page with a fixed title, a rewritable location and signals
/// delivered by [`dispatch`](Self::dispatch).
///
/// Listeners run synchronously in subscription order. They may read the page
/// and rewrite its location but must not subscribe from inside a dispatch.
pub struct ScriptedPage {
    location: RefCell<Url>,
    title: String,
    history: RefCell<Vec<Url>>,
    listeners: RefCell<Vec<SignalListener>>,
}

impl ScriptedPage {
    pub fn new(location: Url, title: impl Into<String>) -> Self {
        Self {
            location: RefCell::new(location),
            title: title.into(),
            history: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Delivers a signal to every subscriber.
    pub fn dispatch(&self, signal: PageSignal) {
        tracing::trace!(%signal, "dispatching page signal");
        let mut listeners = self.listeners.borrow_mut();
        for listener in listeners.iter_mut() {
            listener(signal);
        }
    }

    /// Every URL written through `replace_location`, oldest first.
    pub fn history(&self) -> Vec<Url> {
        self.history.borrow().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl PageEnvironment for ScriptedPage {
    fn location(&self) -> Url {
        self.location.borrow().clone()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn replace_location(&self, url: &Url) {
        tracing::debug!(url = %url, "replacing visible location");
        *self.location.borrow_mut() = url.clone();
        self.history.borrow_mut().push(url.clone());
    }

    fn subscribe(&self, listener: SignalListener) {
        self.listeners.borrow_mut().push(listener);
    }
}
