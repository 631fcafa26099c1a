//! Point-in-time telemetry snapshot for display.

use std::time::Duration;

use crate::cache::CacheStats;
use crate::pipeline::PipelineStatus;
use crate::telemetry::TrackerMetrics;

/// A consistent copy of all statistics the dashboard renders.
///
/// Taken by [`crate::app::App::telemetry_snapshot`]; the dashboard only ever
/// reads snapshots, it never touches live state.
#[derive(Clone, Debug)]
pub struct TelemetrySnapshot {
    /// Process uptime.
    pub uptime: Duration,
    /// Successful feed polls.
    pub polls_ok: u64,
    /// Failed (skipped) feed polls.
    pub polls_failed: u64,
    /// Snapshots merged into the cache.
    pub snapshots_merged: u64,
    /// Successful flush cycles.
    pub flushes_ok: u64,
    /// Flush cycles that exhausted retries.
    pub flushes_failed: u64,
    /// Records acknowledged by the store.
    pub records_persisted: u64,
    /// Individual store send attempts.
    pub send_attempts: u64,
    /// Individual store send failures.
    pub send_failures: u64,
    /// Times the circuit breaker has opened.
    pub breaker_opens: u64,
    /// Alert notifications sent.
    pub alerts_sent: u64,
    /// Unix millis of the last successful flush; 0 when none yet.
    pub last_flush_unix_ms: u64,
    /// Cache statistics.
    pub cache: CacheStats,
    /// Upload pipeline status (breaker state, pool usage).
    pub pipeline: PipelineStatus,
}

impl TelemetrySnapshot {
    /// Assemble a snapshot from the live components.
    pub fn capture(
        metrics: &TrackerMetrics,
        cache: CacheStats,
        pipeline: PipelineStatus,
    ) -> Self {
        let counters = metrics.counters();
        Self {
            uptime: metrics.uptime(),
            polls_ok: counters.polls_ok,
            polls_failed: counters.polls_failed,
            snapshots_merged: counters.snapshots_merged,
            flushes_ok: counters.flushes_ok,
            flushes_failed: counters.flushes_failed,
            records_persisted: counters.records_persisted,
            send_attempts: counters.send_attempts,
            send_failures: counters.send_failures,
            breaker_opens: counters.breaker_opens,
            alerts_sent: counters.alerts_sent,
            last_flush_unix_ms: counters.last_flush_unix_ms,
            cache,
            pipeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::BreakerState;

    #[test]
    fn test_capture_copies_counters() {
        let metrics = TrackerMetrics::new();
        metrics.poll_succeeded(5);
        metrics.flush_succeeded(5);

        let snapshot =
            TelemetrySnapshot::capture(&metrics, CacheStats::default(), PipelineStatus::default());

        assert_eq!(snapshot.polls_ok, 1);
        assert_eq!(snapshot.snapshots_merged, 5);
        assert_eq!(snapshot.records_persisted, 5);
        assert_eq!(snapshot.pipeline.breaker_state, BreakerState::Closed);
    }
}
