//! HTTP registry source backed by reqwest.

use super::{RegistryError, RegistrySource};
use crate::config::FeedConfig;
use crate::store::BoxFuture;

/// Fetches the registry CSV over HTTP.
pub struct HttpRegistrySource {
    client: reqwest::Client,
    url: String,
}

impl HttpRegistrySource {
    /// Create a source for the configured registry endpoint.
    pub fn new(config: &FeedConfig) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RegistryError::Fetch(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.aircraft_csv_url.clone(),
        })
    }
}

impl RegistrySource for HttpRegistrySource {
    fn fetch(&self) -> BoxFuture<'_, Result<String, RegistryError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|e| RegistryError::Fetch(format!("request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(RegistryError::Fetch(format!(
                    "HTTP {} from {}",
                    response.status(),
                    self.url
                )));
            }

            response
                .text()
                .await
                .map_err(|e| RegistryError::Fetch(format!("failed to read response: {e}")))
        })
    }
}
