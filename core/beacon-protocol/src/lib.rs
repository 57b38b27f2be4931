//! Wire contract for Trantor session beacons.
//!
//! Shared by the tracker and anything that wants to inspect or replay what it
//! sends (dry runs, test collectors) so the endpoint paths, header names and
//! payload shapes cannot drift apart. The collection server remains the
//! authority on validation; [`Beacon::validate`] mirrors its required-header
//! rules so malformed beacons are caught before they leave the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SESSION_START_PATH: &str = "/session/start";
pub const SESSION_END_PATH: &str = "/session/end";
pub const SESSION_EVENT_PATH: &str = "/session/event";

pub const CONTENT_TYPE_HEADER: &str = "content-type";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const TRACKING_ID_HEADER: &str = "x-tracking-id";
pub const SOURCE_NAME_HEADER: &str = "x-source-name";

/// Query parameter carrying the campaign/source name on landing URLs.
pub const SOURCE_PARAM: &str = "src";

/// Value of the `data-id` attribute that marks the embedding script tag.
pub const SCRIPT_MARKER: &str = "trantor";

/// Converts a wall-clock instant into the float-seconds timestamp the
/// collector expects (millisecond precision).
pub fn timestamp_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeaconKind {
    SessionStart,
    SessionEnd,
    Click,
}

impl BeaconKind {
    pub fn path(self) -> &'static str {
        match self {
            BeaconKind::SessionStart => SESSION_START_PATH,
            BeaconKind::SessionEnd => SESSION_END_PATH,
            BeaconKind::Click => SESSION_EVENT_PATH,
        }
    }

    /// Headers the collector rejects the beacon without.
    fn required_headers(self) -> &'static [&'static str] {
        match self {
            BeaconKind::SessionStart | BeaconKind::Click => &[TRACKING_ID_HEADER],
            BeaconKind::SessionEnd => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionStartPayload {
    pub timestamp: f64,
    pub pathname: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionEndPayload {
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Click,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClickEventPayload {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub target: String,
}

impl ClickEventPayload {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Click,
            target: target.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A fully addressed beacon, ready for a transport.
///
/// Header names are stored lower-case. The JSON content-type header is always
/// the first entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    pub kind: BeaconKind,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl Beacon {
    pub fn new(kind: BeaconKind, url: impl Into<String>, body: Value) -> Self {
        Self {
            kind,
            url: url.into(),
            headers: vec![(
                CONTENT_TYPE_HEADER.to_string(),
                CONTENT_TYPE_JSON.to_string(),
            )],
            body,
        }
    }

    pub fn session_start(url: impl Into<String>, payload: &SessionStartPayload) -> Self {
        Self::new(BeaconKind::SessionStart, url, to_value(payload))
    }

    pub fn session_end(url: impl Into<String>, payload: &SessionEndPayload) -> Self {
        Self::new(BeaconKind::SessionEnd, url, to_value(payload))
    }

    pub fn click(url: impl Into<String>, payload: &ClickEventPayload) -> Self {
        Self::new(BeaconKind::Click, url, to_value(payload))
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    pub fn validate(&self) -> Result<(), ErrorInfo> {
        if !self.url.ends_with(self.kind.path()) {
            return Err(ErrorInfo::new(
                "invalid_url",
                format!("{} beacon must target {}", kind_label(self.kind), self.kind.path()),
            ));
        }

        if self.header(CONTENT_TYPE_HEADER) != Some(CONTENT_TYPE_JSON) {
            return Err(ErrorInfo::new(
                "invalid_content_type",
                "content-type must be application/json",
            ));
        }

        for name in self.kind.required_headers() {
            match self.header(name) {
                Some(value) if !value.trim().is_empty() => {}
                _ => {
                    return Err(ErrorInfo::new(
                        "missing_header",
                        format!("{} is required", name),
                    ))
                }
            }
        }

        match self.kind {
            BeaconKind::SessionStart => {
                parse_body::<SessionStartPayload>(&self.body)?;
            }
            BeaconKind::SessionEnd => {
                parse_body::<SessionEndPayload>(&self.body)?;
            }
            BeaconKind::Click => {
                parse_body::<ClickEventPayload>(&self.body)?;
            }
        }

        Ok(())
    }
}

fn kind_label(kind: BeaconKind) -> &'static str {
    match kind {
        BeaconKind::SessionStart => "session start",
        BeaconKind::SessionEnd => "session end",
        BeaconKind::Click => "click",
    }
}

fn to_value<T: Serialize>(payload: &T) -> Value {
    // Payload structs hold only strings and finite floats.
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &Value) -> Result<T, ErrorInfo> {
    serde_json::from_value(body.clone()).map_err(|err| {
        ErrorInfo::new("invalid_body", format!("beacon body is invalid: {}", err))
    })
}
