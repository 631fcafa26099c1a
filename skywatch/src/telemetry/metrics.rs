//! Atomic event counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::Utc;

/// Lock-free counters shared by the poller, cache and pipeline.
///
/// All methods take `&self` and are safe to call from any task.
pub struct TrackerMetrics {
    started_at: Instant,
    polls_ok: AtomicU64,
    polls_failed: AtomicU64,
    snapshots_merged: AtomicU64,
    flushes_ok: AtomicU64,
    flushes_failed: AtomicU64,
    records_persisted: AtomicU64,
    send_attempts: AtomicU64,
    send_failures: AtomicU64,
    breaker_opens: AtomicU64,
    alerts_sent: AtomicU64,
    /// Unix millis of the last successful flush; 0 when none has happened.
    last_flush_unix_ms: AtomicU64,
}

impl TrackerMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            polls_ok: AtomicU64::new(0),
            polls_failed: AtomicU64::new(0),
            snapshots_merged: AtomicU64::new(0),
            flushes_ok: AtomicU64::new(0),
            flushes_failed: AtomicU64::new(0),
            records_persisted: AtomicU64::new(0),
            send_attempts: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            breaker_opens: AtomicU64::new(0),
            alerts_sent: AtomicU64::new(0),
            last_flush_unix_ms: AtomicU64::new(0),
        }
    }

    pub fn poll_succeeded(&self, snapshots: usize) {
        self.polls_ok.fetch_add(1, Ordering::Relaxed);
        self.snapshots_merged
            .fetch_add(snapshots as u64, Ordering::Relaxed);
    }

    pub fn poll_failed(&self) {
        self.polls_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flush_succeeded(&self, records: usize) {
        self.flushes_ok.fetch_add(1, Ordering::Relaxed);
        self.records_persisted
            .fetch_add(records as u64, Ordering::Relaxed);
        self.last_flush_unix_ms
            .store(Utc::now().timestamp_millis().max(0) as u64, Ordering::Relaxed);
    }

    pub fn flush_failed(&self) {
        self.flushes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn send_attempted(&self) {
        self.send_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn send_failed(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn breaker_opened(&self) {
        self.breaker_opens.fetch_add(1, Ordering::Relaxed);
    }

    pub fn alert_sent(&self) {
        self.alerts_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    pub(crate) fn counters(&self) -> Counters {
        Counters {
            polls_ok: self.polls_ok.load(Ordering::Relaxed),
            polls_failed: self.polls_failed.load(Ordering::Relaxed),
            snapshots_merged: self.snapshots_merged.load(Ordering::Relaxed),
            flushes_ok: self.flushes_ok.load(Ordering::Relaxed),
            flushes_failed: self.flushes_failed.load(Ordering::Relaxed),
            records_persisted: self.records_persisted.load(Ordering::Relaxed),
            send_attempts: self.send_attempts.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            breaker_opens: self.breaker_opens.load(Ordering::Relaxed),
            alerts_sent: self.alerts_sent.load(Ordering::Relaxed),
            last_flush_unix_ms: self.last_flush_unix_ms.load(Ordering::Relaxed),
        }
    }
}

impl Default for TrackerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain copy of the counter values.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Counters {
    pub polls_ok: u64,
    pub polls_failed: u64,
    pub snapshots_merged: u64,
    pub flushes_ok: u64,
    pub flushes_failed: u64,
    pub records_persisted: u64,
    pub send_attempts: u64,
    pub send_failures: u64,
    pub breaker_opens: u64,
    pub alerts_sent: u64,
    pub last_flush_unix_ms: u64,
}
