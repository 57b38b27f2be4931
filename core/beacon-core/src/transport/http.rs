//! HTTP transport: one detached worker thread per beacon.
//!
//! `send` hands the beacon to a freshly spawned thread and returns, so the
//! signal handler that triggered it never waits on the network. Workers are
//! not tied to the caller; they finish even after the tracker is gone, which
//! is what lets a teardown SessionEnd reach the collector. The host calls
//! [`HttpTransport::flush`] before exiting to give them a bounded grace period.
//!
//! Threads are not pooled. Beacons follow human-paced page activity (a start
//! and an end per visibility or focus change, one per click), so a page keeps
//! at most a handful in flight, each bounded by the request timeout. A host
//! that forwards machine-generated traffic should put its own limit in front
//! of `send`.
//!
//! The client keeps a cookie store, so cookies set by the collector on
//! `/session/start` (visitor and session ids) ride along on later beacons.

use super::Transport;
use crate::config::LaunchControlConfig;
use crate::error::{BeaconError, Result};
use beacon_protocol::Beacon;
use reqwest::blocking::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const WORKER_NAME: &str = "beacon-send";

#[derive(Debug, Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn begin(&self) {
        *self.lock() += 1;
    }

    fn finish(&self) {
        let mut count = self.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, usize> {
        self.count
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Delivery counters, for host summaries and tests.
#[derive(Debug, Default)]
pub struct TransportStats {
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl TransportStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Posts beacons to the collector, one short-lived worker thread each.
///
/// Cloning the reqwest client is cheap and shares its connection pool and
/// cookie jar across workers.
pub struct HttpTransport {
    client: Client,
    in_flight: Arc<InFlight>,
    stats: Arc<TransportStats>,
}

impl HttpTransport {
    pub fn new(config: &LaunchControlConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| BeaconError::Transport(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            in_flight: Arc::new(InFlight::default()),
            stats: Arc::new(TransportStats::default()),
        })
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Number of beacons still being delivered.
    pub fn pending(&self) -> usize {
        *self.in_flight.lock()
    }

    /// Waits up to `timeout` for in-flight beacons. Returns true when none are
    /// left; stragglers are abandoned otherwise.
    pub fn flush(&self, timeout: Duration) -> bool {
        let count = self.in_flight.lock();
        let (count, _) = self
            .in_flight
            .idle
            .wait_timeout_while(count, timeout, |pending| *pending > 0)
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if *count > 0 {
            warn!(pending = *count, "Abandoning undelivered beacons");
            return false;
        }
        true
    }
}

impl Transport for HttpTransport {
    fn send(&self, beacon: Beacon) {
        if let Err(err) = beacon.validate() {
            warn!(kind = ?beacon.kind, error = %err, "Dropping malformed beacon");
            self.stats.failed.fetch_add(1, Ordering::SeqCst);
            return;
        }

        self.in_flight.begin();
        let client = self.client.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let stats = Arc::clone(&self.stats);
        let kind = beacon.kind;

        let spawned = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                match deliver(&client, &beacon) {
                    Ok(()) => {
                        stats.delivered.fetch_add(1, Ordering::SeqCst);
                        debug!(kind = ?beacon.kind, url = %beacon.url, "Beacon delivered");
                    }
                    Err(err) => {
                        stats.failed.fetch_add(1, Ordering::SeqCst);
                        warn!(kind = ?beacon.kind, error = %err, "Beacon lost");
                    }
                }
                in_flight.finish();
            });

        if let Err(err) = spawned {
            self.in_flight.finish();
            self.stats.failed.fetch_add(1, Ordering::SeqCst);
            warn!(kind = ?kind, error = %err, "Failed to spawn beacon worker");
        }
    }
}

fn deliver(client: &Client, beacon: &Beacon) -> Result<()> {
    let body = serde_json::to_vec(&beacon.body)
        .map_err(|err| BeaconError::Transport(format!("Failed to serialize body: {err}")))?;

    let mut request = client.post(&beacon.url);
    for (name, value) in &beacon.headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request
        .body(body)
        .send()
        .map_err(|err| BeaconError::Transport(format!("{}: {}", beacon.url, err)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BeaconError::Transport(format!(
            "{} returned {}",
            beacon.url, status
        )));
    }
    Ok(())
}
