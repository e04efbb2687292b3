//! Publish counters shared between the subscriber and the publisher.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Lock-free counters updated on the publish path
#[derive(Debug, Default)]
pub struct SinkStats {
    accepted: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
    bytes_published: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SinkStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_published(&self, bytes: usize) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.bytes_published.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn begin_send(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
    }

    pub(crate) fn end_send(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Consistent-enough copy of the counters for reporting
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_published: self.bytes_published.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            max_in_flight: self.max_in_flight.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time view of the publish counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Messages taken from the upstream channel
    pub accepted: u64,
    /// Messages acknowledged by the broker
    pub published: u64,
    /// Messages that failed translation or transport
    pub failed: u64,
    /// Payload bytes acknowledged by the broker
    pub bytes_published: u64,
    /// Sends currently handed to the broker
    pub in_flight: usize,
    /// Peak concurrent sends observed
    pub max_in_flight: usize,
}

impl StatsSnapshot {
    /// Messages accepted but not yet resolved either way
    pub fn pending(&self) -> u64 {
        self.accepted.saturating_sub(self.published + self.failed)
    }
}
