//! Tracking context and the embed bootstrap that discovers it.
//!
//! A page embeds the beacon with a tag like:
//!
//! ```text
//! <script data-id="trantor" data-tracking-id="trk-42"
//!         src="https://stats.example.com/launch-control.js"></script>
//! ```
//!
//! The collector origin is the origin of the script's own `src`; the tracking
//! id is the `data-tracking-id` attribute. Anything missing here is fatal: a
//! tracker that cannot address its beacons must not start silently.

use crate::error::{BeaconError, Result};
use beacon_protocol::SCRIPT_MARKER;
use reqwest::header::HeaderValue;
use std::collections::BTreeMap;
use url::Url;

/// Immutable addressing for every beacon a tracker sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingContext {
    server_url: String,
    tracking_id: String,
}

impl TrackingContext {
    /// Builds a context from a collector URL and a tracking id.
    ///
    /// The collector must have a scheme/host/port origin, and the tracking id
    /// must be representable as an HTTP header value: every beacon that
    /// carries it would otherwise fail to send.
    pub fn new(server_url: impl Into<String>, tracking_id: impl Into<String>) -> Result<Self> {
        let server_url = server_url.into();
        let parsed = Url::parse(&server_url).map_err(|source| BeaconError::InvalidServerUrl {
            url: server_url.clone(),
            source,
        })?;
        if !parsed.origin().is_tuple() {
            return Err(BeaconError::OpaqueOrigin(server_url));
        }

        let tracking_id = tracking_id.into();
        if tracking_id.trim().is_empty() {
            return Err(BeaconError::MissingTrackingId);
        }
        if HeaderValue::from_str(&tracking_id).is_err() {
            return Err(BeaconError::InvalidTrackingId(tracking_id));
        }

        Ok(Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            tracking_id,
        })
    }

    /// Locates the marked embedding tag among `tags` and derives the context
    /// from its attributes.
    pub fn from_script_tags(tags: &[ScriptTag]) -> Result<Self> {
        let tag = tags
            .iter()
            .find(|tag| tag.data("id") == Some(SCRIPT_MARKER))
            .ok_or_else(|| BeaconError::MissingScriptTag(SCRIPT_MARKER.to_string()))?;
        Self::from_script_tag(tag)
    }

    pub fn from_script_tag(tag: &ScriptTag) -> Result<Self> {
        let src = tag.src.as_deref().ok_or(BeaconError::MissingScriptSrc)?;
        let parsed = Url::parse(src).map_err(|source| BeaconError::InvalidScriptSrc {
            src: src.to_string(),
            source,
        })?;

        let origin = parsed.origin();
        if !origin.is_tuple() {
            return Err(BeaconError::OpaqueOrigin(src.to_string()));
        }

        let tracking_id = tag
            .data("tracking-id")
            .ok_or(BeaconError::MissingTrackingId)?;

        Self::new(origin.ascii_serialization(), tracking_id)
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn tracking_id(&self) -> &str {
        &self.tracking_id
    }

    /// Absolute URL for a collector path such as `/session/start`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }
}

/// The attributes of a `<script>` element relevant to the bootstrap.
///
/// `dataset` keys are stored without the `data-` prefix, as a DOM dataset
/// exposes them (`data-tracking-id` becomes `tracking-id`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptTag {
    pub src: Option<String>,
    pub dataset: BTreeMap<String, String>,
}

impl ScriptTag {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            dataset: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: &str, value: impl Into<String>) -> Self {
        let key = key.strip_prefix("data-").unwrap_or(key);
        self.dataset.insert(key.to_string(), value.into());
        self
    }

    pub fn data(&self, key: &str) -> Option<&str> {
        self.dataset.get(key).map(String::as_str)
    }
}
