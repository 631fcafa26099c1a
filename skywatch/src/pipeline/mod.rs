//! Resilient upload pipeline.
//!
//! [`UploadPipeline::send`] wraps the durable-store write with a bounded
//! connection pool, retry with exponential backoff and jitter, and a circuit
//! breaker. Sustained failure raises one alert per breaker-open transition.
//!
//! A batch never disappears inside the pipeline: a send either returns an
//! acknowledgement or an error, and on error the caller restores the batch's
//! dirty flags so the next scheduled flush retries it.

mod breaker;
mod pool;

pub use breaker::{Admission, BreakerState, BreakerStatus, CircuitBreaker, FailureOutcome};
pub use pool::{ConnectionPool, PoolPermit};

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::alert::Notifier;
use crate::cache::Batch;
use crate::config::PipelineConfig;
use crate::store::{StoreAck, SummaryStore};
use crate::telemetry::TrackerMetrics;

/// Errors surfacing from a pipeline send. The batch is returned to the caller
/// for re-queue in every case.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Circuit is open; retry after the remaining cooldown.
    #[error("circuit open, store unavailable for another {retry_after:?}")]
    CircuitOpen { retry_after: Duration },

    /// Every attempt failed; the last failure is included.
    #[error("upload failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Point-in-time pipeline status for the dashboard.
#[derive(Clone, Copy, Debug)]
pub struct PipelineStatus {
    pub breaker_state: BreakerState,
    pub consecutive_failures: u32,
    /// Time since the most recent store failure.
    pub last_failure_age: Option<Duration>,
    /// Store connections currently in use.
    pub pool_in_use: usize,
    /// Total pool size.
    pub pool_size: usize,
}

impl Default for PipelineStatus {
    fn default() -> Self {
        Self {
            breaker_state: BreakerState::Closed,
            consecutive_failures: 0,
            last_failure_age: None,
            pool_in_use: 0,
            pool_size: 0,
        }
    }
}

/// Resilient wrapper around the durable store's upsert primitive.
pub struct UploadPipeline {
    config: PipelineConfig,
    store: Arc<dyn SummaryStore>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<TrackerMetrics>,
    breaker: CircuitBreaker,
    pool: ConnectionPool,
}

impl UploadPipeline {
    /// Assemble a pipeline from its injected collaborators.
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn SummaryStore>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<TrackerMetrics>,
    ) -> Self {
        let breaker = CircuitBreaker::new(config.breaker_threshold, config.breaker_cooldown);
        let pool = ConnectionPool::new(config.pool_size, config.pool_acquire_timeout);
        Self {
            config,
            store,
            notifier,
            metrics,
            breaker,
            pool,
        }
    }

    /// Send one batch to the store.
    ///
    /// Fails fast with [`UploadError::CircuitOpen`] while the breaker rejects
    /// sends. Otherwise attempts the write up to the configured retry count
    /// with exponential backoff; pool exhaustion counts as a retryable
    /// failure. An empty batch is acknowledged without touching the store.
    pub async fn send(&self, batch: &Batch) -> Result<StoreAck, UploadError> {
        if batch.is_empty() {
            return Ok(StoreAck::default());
        }

        let attempts = self.config.max_retry_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            let admission = self
                .breaker
                .try_admit()
                .map_err(|retry_after| UploadError::CircuitOpen { retry_after })?;

            self.metrics.send_attempted();
            match self.attempt(batch).await {
                Ok(ack) => {
                    self.breaker.record_success();
                    debug!(
                        records = batch.len(),
                        acked = ack.records,
                        attempt = attempt + 1,
                        "Batch persisted"
                    );
                    return Ok(ack);
                }
                Err(error) => {
                    self.metrics.send_failed();
                    warn!(
                        records = batch.len(),
                        attempt = attempt + 1,
                        error = %error,
                        "Store write failed"
                    );
                    last_error = error;

                    let outcome = self.breaker.record_failure();
                    if outcome.opened_circuit() {
                        self.metrics.breaker_opened();
                        self.alert_breaker_open(&last_error).await;
                    }

                    // A failed half-open trial re-opened the circuit; further
                    // attempts would only fail fast.
                    if admission == Admission::Trial {
                        return Err(UploadError::CircuitOpen {
                            retry_after: self.config.breaker_cooldown,
                        });
                    }

                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                    }
                }
            }
        }

        Err(UploadError::RetriesExhausted {
            attempts,
            last_error,
        })
    }

    /// One write attempt: acquire a pooled connection, then upsert.
    async fn attempt(&self, batch: &Batch) -> Result<StoreAck, String> {
        let Some(_permit) = self.pool.acquire().await else {
            return Err("store connection pool exhausted".to_string());
        };
        self.store
            .upsert_batch(&batch.records)
            .await
            .map_err(|e| e.to_string())
    }

    /// Exponential backoff with a cap and up to 10% random jitter.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let doubled = self
            .config
            .retry_base_delay
            .saturating_mul(1u32 << attempt.min(16));
        let capped = doubled.min(self.config.retry_max_delay);
        let jitter_ms = (capped.as_millis() as u64 / 10).max(1);
        capped + Duration::from_millis(rand::rng().random_range(0..jitter_ms))
    }

    async fn alert_breaker_open(&self, last_error: &str) {
        let status = self.breaker.status();
        let body = format!(
            "The aircraft summary store is failing and the circuit breaker has opened.\n\
             Consecutive failures: {}\n\
             Cooldown: {:?}\n\
             Last error: {}",
            status.consecutive_failures, self.config.breaker_cooldown, last_error
        );
        self.notifier
            .notify("Skywatch: summary store unavailable", &body)
            .await;
        self.metrics.alert_sent();
    }

    /// Current breaker and pool status.
    pub fn status(&self) -> PipelineStatus {
        let breaker = self.breaker.status();
        PipelineStatus {
            breaker_state: breaker.state,
            consecutive_failures: breaker.consecutive_failures,
            last_failure_age: breaker.last_failure_age,
            pool_in_use: self.pool.in_use(),
            pool_size: self.pool.size(),
        }
    }
}
