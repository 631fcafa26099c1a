//! Periodic flush scheduling.
//!
//! The scheduler drives the cache-to-store path: every flush interval it runs
//! one cycle, and a cache-pressure hint from the poller can pull the next
//! cycle forward. A cycle evicts stale aircraft (flush first, then remove)
//! and then drains and uploads the dirty records.
//!
//! Cycles never overlap: a tick that arrives while the previous cycle is
//! still uploading is skipped, not queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{AircraftCache, Batch};
use crate::pipeline::UploadPipeline;
use crate::telemetry::TrackerMetrics;

/// Runs flush cycles on an interval until cancelled.
pub struct FlushScheduler {
    cache: Arc<AircraftCache>,
    pipeline: Arc<UploadPipeline>,
    metrics: Arc<TrackerMetrics>,
    flush_interval: Duration,
    stale_after: Duration,
    pressure: Arc<Notify>,
    in_flight: Mutex<()>,
}

impl FlushScheduler {
    pub fn new(
        cache: Arc<AircraftCache>,
        pipeline: Arc<UploadPipeline>,
        metrics: Arc<TrackerMetrics>,
        flush_interval: Duration,
        stale_after: Duration,
    ) -> Self {
        Self {
            cache,
            pipeline,
            metrics,
            flush_interval,
            stale_after,
            pressure: Arc::new(Notify::new()),
            in_flight: Mutex::new(()),
        }
    }

    /// Handle the poller uses to request an early flush under cache pressure.
    pub fn pressure_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.pressure)
    }

    /// Run scheduled flush cycles until the token is cancelled.
    ///
    /// The final flush on shutdown is not done here; the shutdown coordinator
    /// drains the whole cache itself after all tasks have stopped.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; consume it so the first real
        // flush happens one full interval after startup.
        ticker.tick().await;

        info!(
            interval_secs = self.flush_interval.as_secs(),
            "Flush scheduler started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Flush scheduler stopping");
                    return;
                }
                _ = ticker.tick() => {
                    self.flush_cycle().await;
                }
                _ = self.pressure.notified() => {
                    debug!("Early flush requested by cache pressure");
                    self.flush_cycle().await;
                }
            }
        }
    }

    /// Run one flush cycle: stale eviction, then the dirty drain.
    ///
    /// Skips entirely when a previous cycle is still in flight.
    pub async fn flush_cycle(&self) {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("Flush cycle already in flight, skipping");
            return;
        };

        self.evict_stale().await;
        self.flush_dirty().await;
    }

    /// Flush stale aircraft to the store, then remove them from the cache.
    ///
    /// Removal only happens after a successful upload, so a store outage
    /// defers eviction instead of dropping data. A record merged again
    /// between capture and removal is spared by the cache.
    async fn evict_stale(&self) {
        let stale = self.cache.stale_records(self.stale_after);
        if stale.is_empty() {
            return;
        }

        let batch = Batch::new(stale);
        match self.pipeline.send(&batch).await {
            Ok(ack) => {
                let removed = self.cache.remove_flushed(&batch.records);
                self.metrics.flush_succeeded(ack.records);
                info!(
                    candidates = batch.len(),
                    removed, "Evicted stale aircraft after final flush"
                );
            }
            Err(e) => {
                warn!(
                    candidates = batch.len(),
                    error = %e,
                    "Stale flush failed, eviction deferred"
                );
            }
        }
    }

    /// Drain the dirty records and upload them.
    ///
    /// On failure the drained batch is restored dirty so the next cycle
    /// retries it; nothing is lost between the drain and the upload.
    async fn flush_dirty(&self) {
        let batch = self.cache.drain_dirty();
        if batch.is_empty() {
            debug!("No dirty records, skipping flush");
            return;
        }

        match self.pipeline.send(&batch).await {
            Ok(ack) => {
                self.metrics.flush_succeeded(ack.records);
                info!(
                    records = batch.len(),
                    acked = ack.records,
                    "Flushed summary batch"
                );
            }
            Err(e) => {
                self.cache.restore_dirty(&batch);
                self.metrics.flush_failed();
                warn!(
                    records = batch.len(),
                    error = %e,
                    "Flush failed, batch restored for retry"
                );
            }
        }
    }
}
