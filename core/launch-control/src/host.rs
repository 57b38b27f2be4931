//! Shared host plumbing: embed attributes, page construction and delivery.

use beacon_core::{
    HttpTransport, LaunchControlConfig, ScriptTag, ScriptedPage, Transport, TrackingContext,
};
use beacon_protocol::{Beacon, SCRIPT_MARKER};
use clap::Args;
use std::io::{self, Stdout, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// The attributes a page's embedding `<script>` tag would carry.
#[derive(Args, Debug, Clone)]
pub struct EmbedArgs {
    /// Script src; its origin is the collector (e.g. https://stats.example.com/launch-control.js)
    #[arg(long, value_name = "URL")]
    pub script_src: Option<String>,

    /// Value of the tag's data-tracking-id attribute
    #[arg(long, value_name = "ID")]
    pub tracking_id: Option<String>,
}

impl EmbedArgs {
    pub fn script_tag(&self) -> ScriptTag {
        let mut tag = ScriptTag {
            src: self.script_src.clone(),
            ..ScriptTag::default()
        }
        .with_data("id", SCRIPT_MARKER);
        if let Some(tracking_id) = &self.tracking_id {
            tag = tag.with_data("tracking-id", tracking_id.as_str());
        }
        tag
    }

    /// Fails when the embedding is malformed; the caller treats this as fatal.
    pub fn tracking_context(&self) -> Result<TrackingContext, String> {
        TrackingContext::from_script_tags(&[self.script_tag()]).map_err(String::from)
    }
}

pub fn scripted_page(page_url: &str, title: &str) -> Result<ScriptedPage, String> {
    let location =
        Url::parse(page_url).map_err(|err| format!("Invalid page URL {page_url}: {err}"))?;
    Ok(ScriptedPage::new(location, title))
}

/// Where beacons go: the collector, or stdout for a dry run.
pub enum Delivery {
    Http(Arc<HttpTransport>),
    DryRun(Arc<StdoutTransport>),
}

impl Delivery {
    pub fn new(config: &LaunchControlConfig, dry_run: bool) -> Result<Self, String> {
        if dry_run {
            return Ok(Delivery::DryRun(Arc::new(LineTransport::new(io::stdout()))));
        }
        let transport = HttpTransport::new(config).map_err(String::from)?;
        Ok(Delivery::Http(Arc::new(transport)))
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        match self {
            Delivery::Http(transport) => transport.clone(),
            Delivery::DryRun(transport) => transport.clone(),
        }
    }

    /// Gives in-flight beacons up to `timeout` to finish.
    pub fn finish(&self, timeout: Duration) {
        match self {
            Delivery::Http(transport) => {
                let drained = transport.flush(timeout);
                tracing::info!(
                    delivered = transport.stats().delivered(),
                    failed = transport.stats().failed(),
                    drained,
                    "Beacon delivery finished"
                );
            }
            Delivery::DryRun(_) => {}
        }
    }
}

/// Dry-run output: beacons printed to stdout.
pub type StdoutTransport = LineTransport<Stdout>;

/// Writes each beacon to `out` as one JSON line.
pub struct LineTransport<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> LineTransport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> Transport for LineTransport<W> {
    fn send(&self, beacon: Beacon) {
        let line = match serde_json::to_string(&beacon) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to serialize beacon");
                return;
            }
        };

        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(err) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            tracing::warn!(error = %err, "Failed to print beacon");
        }
    }
}
