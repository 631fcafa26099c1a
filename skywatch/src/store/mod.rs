//! Durable store port.
//!
//! The store exposes a single write primitive: upsert a batch of aircraft
//! summary records. The pipeline delivers batches at-least-once (retries may
//! replay a batch), so implementations must treat repeated delivery of the
//! same record state as idempotent.

mod http;

pub use http::HttpSummaryStore;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::cache::AircraftRecord;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors raised by the durable store. All variants are retryable; sustained
/// failure is handled by the pipeline's breaker, not here.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write request could not be delivered.
    #[error("store request failed: {0}")]
    Request(String),

    /// The store rejected the batch.
    #[error("store rejected batch: {0}")]
    Rejected(String),
}

/// Acknowledgement of a persisted batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreAck {
    /// Number of records the store accepted.
    pub records: usize,
}

/// Write interface to the durable store.
///
/// Implementations must be safe to call from concurrent flush attempts; the
/// pipeline bounds concurrency with its connection pool.
pub trait SummaryStore: Send + Sync {
    /// Upsert a batch of aircraft summary records.
    fn upsert_batch<'a>(
        &'a self,
        records: &'a [AircraftRecord],
    ) -> BoxFuture<'a, Result<StoreAck, StoreError>>;
}
