//! Tracker telemetry for observability and the dashboard.
//!
//! Lock-free atomic counters record events from the poller, cache and
//! pipeline; a point-in-time [`TelemetrySnapshot`] combines them with cache
//! and breaker status for read-only rendering.
//!
//! ```text
//! Poller / Cache / Pipeline ──► TrackerMetrics ──► TelemetrySnapshot ──► Views
//!                               (atomic counters)  (point-in-time copy)   (CLI)
//! ```

mod metrics;
mod snapshot;

pub use metrics::TrackerMetrics;
pub use snapshot::TelemetrySnapshot;
