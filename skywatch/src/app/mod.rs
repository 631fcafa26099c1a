//! Application assembly and lifecycle.
//!
//! [`App`] wires the components together from an [`AppConfig`], runs the feed
//! poller and the flush scheduler until cancelled, and coordinates the
//! shutdown flush. All cross-component dependencies are injected here; the
//! components themselves never construct each other.

mod error;

pub use error::AppError;

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alert::{NoopNotifier, Notifier, WebhookNotifier};
use crate::cache::AircraftCache;
use crate::config::AppConfig;
use crate::feed::{HttpSnapshotSource, SnapshotSource};
use crate::pipeline::UploadPipeline;
use crate::registry::{AircraftRegistry, HttpRegistrySource, RegistrySource};
use crate::scheduler::FlushScheduler;
use crate::store::{HttpSummaryStore, SummaryStore};
use crate::telemetry::{TelemetrySnapshot, TrackerMetrics};

/// How the tracker came to a stop. Drives the process exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The final flush delivered everything (or there was nothing to flush).
    Clean,
    /// The final flush failed or exceeded the shutdown deadline; unflushed
    /// records were lost.
    FinalFlushFailed,
}

impl ShutdownOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownOutcome::Clean => 0,
            ShutdownOutcome::FinalFlushFailed => 1,
        }
    }
}

/// The assembled tracker.
pub struct App {
    config: AppConfig,
    cache: Arc<AircraftCache>,
    registry: Arc<AircraftRegistry>,
    source: Arc<dyn SnapshotSource>,
    pipeline: Arc<UploadPipeline>,
    scheduler: Arc<FlushScheduler>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<TrackerMetrics>,
}

impl App {
    /// Assemble the tracker with HTTP-backed components from the
    /// configuration.
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let source = Arc::new(HttpSnapshotSource::new(&config.feed)?);
        let registry_source = Box::new(HttpRegistrySource::new(&config.feed)?);
        let store = Arc::new(HttpSummaryStore::new(&config.store)?);
        let notifier: Arc<dyn Notifier> = match &config.alert.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
            None => Arc::new(NoopNotifier),
        };
        Ok(Self::assemble(config, source, registry_source, store, notifier))
    }

    /// Assemble the tracker from explicit components.
    pub fn assemble(
        config: AppConfig,
        source: Arc<dyn SnapshotSource>,
        registry_source: Box<dyn RegistrySource>,
        store: Arc<dyn SummaryStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let metrics = Arc::new(TrackerMetrics::new());
        let cache = Arc::new(AircraftCache::new(&config.cache));
        let registry = Arc::new(AircraftRegistry::new(
            registry_source,
            config.feed.registry_ttl,
        ));
        let pipeline = Arc::new(UploadPipeline::new(
            config.pipeline.clone(),
            store,
            Arc::clone(&notifier),
            Arc::clone(&metrics),
        ));
        let scheduler = Arc::new(FlushScheduler::new(
            Arc::clone(&cache),
            Arc::clone(&pipeline),
            Arc::clone(&metrics),
            config.flush_interval,
            config.cache.stale_after,
        ));

        Self {
            config,
            cache,
            registry,
            source,
            pipeline,
            scheduler,
            notifier,
            metrics,
        }
    }

    /// Run the tracker until the token is cancelled, then perform the final
    /// flush.
    pub async fn run(&self, cancel: CancellationToken) -> ShutdownOutcome {
        info!(
            feed = %self.config.feed.aircraft_json_url,
            store = %self.config.store.endpoint,
            "Skywatch tracker starting"
        );

        tokio::join!(
            self.poll_loop(cancel.clone()),
            self.scheduler.run(cancel.clone()),
        );

        self.final_flush().await
    }

    /// Poll the feed on its interval until cancelled.
    async fn poll_loop(&self, cancel: CancellationToken) {
        let mut ticker = interval(self.config.feed.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let pressure = self.scheduler.pressure_handle();

        info!(
            interval_secs = self.config.feed.poll_interval.as_secs(),
            "Feed poller started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Feed poller stopping");
                    return;
                }
                _ = ticker.tick() => {
                    self.poll_once(&pressure).await;
                }
            }
        }
    }

    /// One poll cycle: refresh the registry if due, fetch, merge.
    ///
    /// A failed poll is logged and skipped; the cache keeps its previous
    /// state and the next tick retries.
    async fn poll_once(&self, pressure: &Notify) {
        self.registry.refresh_if_stale().await;

        match self.source.fetch().await {
            Ok(snapshots) => {
                let count = snapshots.len();
                for snapshot in snapshots {
                    self.cache.merge(snapshot, &self.registry);
                }
                self.metrics.poll_succeeded(count);
                debug!(
                    aircraft = count,
                    tracked = self.cache.len(),
                    "Feed poll merged"
                );

                if self.cache.over_capacity() {
                    debug!(
                        tracked = self.cache.len(),
                        capacity = self.config.cache.max_entries,
                        "Cache over capacity, requesting early flush"
                    );
                    pressure.notify_one();
                }
            }
            Err(e) => {
                self.metrics.poll_failed();
                warn!(error = %e, "Feed poll failed, skipping cycle");
            }
        }
    }

    /// Flush everything still in the cache, bounded by the shutdown deadline.
    ///
    /// All records are drained, not just the dirty ones, so nothing merged
    /// after the last scheduled flush is left behind. A failure past this
    /// point cannot be retried; it is alerted and reflected in the exit code.
    async fn final_flush(&self) -> ShutdownOutcome {
        let batch = self.cache.drain_all();
        if batch.is_empty() {
            info!("Shutdown: cache empty, nothing to flush");
            return ShutdownOutcome::Clean;
        }

        info!(
            records = batch.len(),
            deadline_secs = self.config.shutdown_deadline.as_secs(),
            "Shutdown: flushing remaining records"
        );

        let send = self.pipeline.send(&batch);
        match tokio::time::timeout(self.config.shutdown_deadline, send).await {
            Ok(Ok(ack)) => {
                self.metrics.flush_succeeded(ack.records);
                info!(acked = ack.records, "Final flush complete");
                ShutdownOutcome::Clean
            }
            Ok(Err(e)) => {
                self.metrics.flush_failed();
                error!(
                    records = batch.len(),
                    error = %e,
                    "Final flush failed, unflushed records lost"
                );
                self.alert_final_flush(batch.len(), &e.to_string()).await;
                ShutdownOutcome::FinalFlushFailed
            }
            Err(_) => {
                self.metrics.flush_failed();
                error!(
                    records = batch.len(),
                    "Final flush exceeded the shutdown deadline, unflushed records lost"
                );
                self.alert_final_flush(batch.len(), "shutdown deadline exceeded")
                    .await;
                ShutdownOutcome::FinalFlushFailed
            }
        }
    }

    async fn alert_final_flush(&self, records: usize, reason: &str) {
        let body = format!(
            "The final flush during shutdown did not complete; {records} \
             record(s) were lost.\nReason: {reason}"
        );
        self.notifier
            .notify("Skywatch: final flush failed", &body)
            .await;
        self.metrics.alert_sent();
    }

    /// Point-in-time telemetry for the dashboard.
    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::capture(&self.metrics, self.cache.stats(), self.pipeline.status())
    }
}
