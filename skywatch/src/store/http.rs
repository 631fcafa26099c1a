//! HTTP implementation of the durable store port.
//!
//! Batches are posted as a JSON array to the configured upsert endpoint.
//! The endpoint is expected to apply insert-or-update semantics keyed by the
//! aircraft hex identifier, which makes replayed batches harmless.

use serde::Deserialize;

use super::{BoxFuture, StoreAck, StoreError, SummaryStore};
use crate::cache::AircraftRecord;
use crate::config::StoreConfig;

/// Durable store client posting JSON batches over HTTP.
pub struct HttpSummaryStore {
    client: reqwest::Client,
    endpoint: String,
    username: Option<String>,
    password: Option<String>,
}

/// Optional response body from the upsert endpoint.
#[derive(Debug, Deserialize)]
struct UpsertResponse {
    #[serde(default)]
    records: Option<usize>,
}

impl HttpSummaryStore {
    /// Create a store client for the configured endpoint.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoreError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

impl SummaryStore for HttpSummaryStore {
    fn upsert_batch<'a>(
        &'a self,
        records: &'a [AircraftRecord],
    ) -> BoxFuture<'a, Result<StoreAck, StoreError>> {
        Box::pin(async move {
            let mut request = self.client.post(&self.endpoint).json(records);
            if let Some(user) = &self.username {
                request = request.basic_auth(user, self.password.as_deref());
            }

            let response = request
                .send()
                .await
                .map_err(|e| StoreError::Request(format!("request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(StoreError::Rejected(format!("HTTP {status}: {body}")));
            }

            // An empty or unparseable body still counts as an ack; the batch
            // size is the best available record count in that case.
            let acked = response
                .json::<UpsertResponse>()
                .await
                .ok()
                .and_then(|r| r.records)
                .unwrap_or(records.len());

            Ok(StoreAck { records: acked })
        })
    }
}
