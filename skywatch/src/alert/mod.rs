//! Operator alerting port.
//!
//! The pipeline reports sustained store trouble through a [`Notifier`]
//! injected at startup. Alerting is strictly best-effort: a failing alert
//! channel is logged and swallowed, it never blocks or fails the upload path.

use serde_json::json;
use tracing::{info, warn};

use crate::store::BoxFuture;

/// One-method notification port.
///
/// Injected into the pipeline so tests can observe alerts with a double and
/// deployments without an alert channel run a no-op.
pub trait Notifier: Send + Sync {
    /// Deliver one message. Best-effort; implementations swallow their own
    /// failures.
    fn notify<'a>(&'a self, subject: &'a str, body: &'a str) -> BoxFuture<'a, ()>;
}

/// Notifier that drops all messages. Used when no alert channel is
/// configured.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify<'a>(&'a self, subject: &'a str, _body: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            info!(subject, "Alerting not configured, dropping notification");
        })
    }
}

/// Posts alerts as JSON to a webhook endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a notifier for the given webhook URL.
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

impl Notifier for WebhookNotifier {
    fn notify<'a>(&'a self, subject: &'a str, body: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let payload = json!({
                "subject": subject,
                "body": body,
            });
            let result = self.client.post(&self.url).json(&payload).send().await;
            match result {
                Ok(response) if response.status().is_success() => {
                    info!(subject, "Alert notification delivered");
                }
                Ok(response) => {
                    warn!(
                        subject,
                        status = %response.status(),
                        "Alert webhook rejected notification"
                    );
                }
                Err(e) => {
                    warn!(subject, error = %e, "Failed to deliver alert notification");
                }
            }
        })
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use parking_lot::Mutex;

    /// Test double recording every notification.
    #[derive(Default)]
    pub struct CollectingNotifier {
        pub messages: Mutex<Vec<(String, String)>>,
    }

    impl CollectingNotifier {
        pub fn count(&self) -> usize {
            self.messages.lock().len()
        }
    }

    impl Notifier for CollectingNotifier {
        fn notify<'a>(&'a self, subject: &'a str, body: &'a str) -> BoxFuture<'a, ()> {
            self.messages
                .lock()
                .push((subject.to_string(), body.to_string()));
            Box::pin(async {})
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::CollectingNotifier;
    use super::*;

    #[tokio::test]
    async fn test_noop_notifier_swallows_messages() {
        let notifier = NoopNotifier;
        notifier.notify("subject", "body").await;
    }

    #[tokio::test]
    async fn test_collecting_notifier_records() {
        let notifier = CollectingNotifier::default();
        notifier.notify("store down", "5 consecutive failures").await;

        assert_eq!(notifier.count(), 1);
        let messages = notifier.messages.lock();
        assert_eq!(messages[0].0, "store down");
    }

    #[tokio::test]
    async fn test_webhook_notifier_swallows_connection_failure() {
        // Unroutable endpoint: must neither panic nor return an error
        let notifier = WebhookNotifier::new("http://127.0.0.1:1/hook".to_string());
        notifier.notify("subject", "body").await;
    }
}
