//! Error types for beacon-core operations.
//!
//! Only initialization and configuration errors ever reach a caller. Delivery
//! failures are converted to [`BeaconError::Transport`] for logging and then
//! dropped.

use std::path::PathBuf;

/// All errors that can occur in beacon-core operations.
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    // ─────────────────────────────────────────────────────────────────────
    // Embedding Errors (fatal at initialization)
    // ─────────────────────────────────────────────────────────────────────
    #[error("No script tag with data-id=\"{0}\" found on the page")]
    MissingScriptTag(String),

    #[error("Embedding script tag has no src attribute")]
    MissingScriptSrc,

    #[error("Embedding script src is not a valid URL: {src}: {source}")]
    InvalidScriptSrc {
        src: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Embedding script src has no usable origin: {0}")]
    OpaqueOrigin(String),

    #[error("Embedding script tag has no data-tracking-id attribute")]
    MissingTrackingId,

    #[error("Tracking id cannot be sent as a header value: {0:?}")]
    InvalidTrackingId(String),

    #[error("Invalid collector URL: {url}: {source}")]
    InvalidServerUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Invalid configuration value: {key}: {details}")]
    ConfigValue { key: String, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // I/O and Delivery Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Beacon delivery failed: {0}")]
    Transport(String),
}

/// Convenience type alias for Results using BeaconError.
pub type Result<T> = std::result::Result<T, BeaconError>;

impl From<BeaconError> for String {
    fn from(err: BeaconError) -> String {
        err.to_string()
    }
}
