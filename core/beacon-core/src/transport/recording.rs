//! In-memory transport that keeps every beacon it is handed.

use super::Transport;
use beacon_protocol::{Beacon, BeaconKind};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct RecordingTransport {
    beacons: Mutex<Vec<Beacon>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Beacons received so far, in send order.
    pub fn beacons(&self) -> Vec<Beacon> {
        self.lock().clone()
    }

    pub fn kinds(&self) -> Vec<BeaconKind> {
        self.lock().iter().map(|beacon| beacon.kind).collect()
    }

    pub fn count(&self, kind: BeaconKind) -> usize {
        self.lock().iter().filter(|beacon| beacon.kind == kind).count()
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<Beacon> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Beacon>> {
        self.beacons
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for RecordingTransport {
    fn send(&self, beacon: Beacon) {
        self.lock().push(beacon);
    }
}
