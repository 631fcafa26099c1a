//! HTTP snapshot source backed by reqwest.

use chrono::Utc;

use super::{decode_aircraft_json, FeedError, Snapshot, SnapshotSource};
use crate::config::FeedConfig;
use crate::store::BoxFuture;

/// Polls `aircraft.json` over HTTP.
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSnapshotSource {
    /// Create a source for the configured feed endpoint.
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FeedError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.aircraft_json_url.clone(),
        })
    }
}

impl SnapshotSource for HttpSnapshotSource {
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<Snapshot>, FeedError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|e| FeedError::Http(format!("request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(FeedError::Http(format!(
                    "HTTP {} from {}",
                    response.status(),
                    self.url
                )));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| FeedError::Http(format!("failed to read response: {e}")))?;

            decode_aircraft_json(&body, Utc::now())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_configured_url() {
        let config = FeedConfig {
            aircraft_json_url: "http://feeder:8080/data/aircraft.json".to_string(),
            ..FeedConfig::default()
        };
        let source = HttpSnapshotSource::new(&config).unwrap();
        assert_eq!(source.url, "http://feeder:8080/data/aircraft.json");
    }
}
