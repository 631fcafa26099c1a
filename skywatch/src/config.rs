//! Application configuration.
//!
//! All settings live in an explicit, immutable [`AppConfig`] constructed once
//! at startup and passed by reference to each component. Every knob can be
//! overridden through a `SKYWATCH_*` environment variable and falls back to a
//! sensible default, so deployments are configured without touching the
//! source. There is no ambient global configuration state.

use std::time::Duration;

/// Default feed poll interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default summary flush interval in seconds (5 minutes).
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 300;

/// Default staleness threshold before an aircraft is evicted (1 hour).
pub const DEFAULT_STALE_AFTER_SECS: u64 = 3600;

/// Default registry CSV refresh interval (24 hours).
pub const DEFAULT_REGISTRY_TTL_SECS: u64 = 86_400;

/// Default cache-pressure threshold that requests an early flush.
pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 200;

/// Feed and registry source configuration.
#[derive(Clone, Debug)]
pub struct FeedConfig {
    /// URL of the `aircraft.json` endpoint (dump1090-fa or tar1090).
    pub aircraft_json_url: String,
    /// URL of the aircraft registry CSV (`hex;registration;type_code;...`).
    pub aircraft_csv_url: String,
    /// How often the feed is polled.
    pub poll_interval: Duration,
    /// Per-request timeout for feed and registry fetches.
    pub request_timeout: Duration,
    /// How long the registry table is served before a reload is attempted.
    pub registry_ttl: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            aircraft_json_url: "http://localhost:8080/data/aircraft.json".to_string(),
            aircraft_csv_url: "http://localhost:8080/data/aircraft.csv".to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            request_timeout: Duration::from_secs(10),
            registry_ttl: Duration::from_secs(DEFAULT_REGISTRY_TTL_SECS),
        }
    }
}

/// Aircraft cache configuration.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Aircraft unseen for longer than this are flushed and evicted.
    pub stale_after: Duration,
    /// Entry count beyond which an early flush is requested.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(DEFAULT_STALE_AFTER_SECS),
            max_entries: DEFAULT_MAX_CACHE_ENTRIES,
        }
    }
}

/// Upload pipeline configuration: retry, backoff, pool and breaker settings.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Maximum send attempts per batch.
    pub max_retry_attempts: u32,
    /// Base delay between attempts; doubles each attempt.
    pub retry_base_delay: Duration,
    /// Upper bound on the backoff delay.
    pub retry_max_delay: Duration,
    /// Consecutive failures (across batches) before the breaker opens.
    pub breaker_threshold: u32,
    /// How long the breaker stays open before admitting a trial send.
    pub breaker_cooldown: Duration,
    /// Number of concurrent store connections.
    pub pool_size: usize,
    /// How long a send waits for a pool connection before failing.
    pub pool_acquire_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            retry_base_delay: Duration::from_secs(10),
            retry_max_delay: Duration::from_secs(120),
            breaker_threshold: 5,
            breaker_cooldown: Duration::from_secs(60),
            pool_size: 5,
            pool_acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Durable store endpoint and credentials.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// URL the summary batches are upserted to.
    pub endpoint: String,
    /// Basic-auth user, if the endpoint requires credentials.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
    /// Per-request timeout for store writes.
    pub request_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9090/api/aircraft/upsert".to_string(),
            username: None,
            password: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Alert channel configuration.
#[derive(Clone, Debug, Default)]
pub struct AlertConfig {
    /// Webhook URL alerts are posted to. `None` disables alerting.
    pub webhook_url: Option<String>,
}

/// Top-level configuration passed to [`crate::app::App`].
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
    pub store: StoreConfig,
    pub alert: AlertConfig,
    /// Interval between scheduled flush cycles.
    pub flush_interval: Duration,
    /// Hard time budget for the final flush during shutdown.
    pub shutdown_deadline: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            cache: CacheConfig::default(),
            pipeline: PipelineConfig::default(),
            store: StoreConfig::default(),
            alert: AlertConfig::default(),
            flush_interval: Duration::from_secs(DEFAULT_FLUSH_INTERVAL_SECS),
            shutdown_deadline: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Factored out of [`AppConfig::from_env`] so tests can supply variables
    /// without mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("SKYWATCH_AIRCRAFT_JSON_URL") {
            config.feed.aircraft_json_url = url;
        }
        if let Some(url) = lookup("SKYWATCH_AIRCRAFT_CSV_URL") {
            config.feed.aircraft_csv_url = url;
        }
        if let Some(secs) = parse(&lookup, "SKYWATCH_POLL_INTERVAL_SECS") {
            config.feed.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse(&lookup, "SKYWATCH_REQUEST_TIMEOUT_SECS") {
            config.feed.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse(&lookup, "SKYWATCH_REGISTRY_TTL_SECS") {
            config.feed.registry_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse(&lookup, "SKYWATCH_STALE_AFTER_SECS") {
            config.cache.stale_after = Duration::from_secs(secs);
        }
        if let Some(n) = parse(&lookup, "SKYWATCH_MAX_CACHE_ENTRIES") {
            config.cache.max_entries = n;
        }
        if let Some(n) = parse(&lookup, "SKYWATCH_MAX_RETRY_ATTEMPTS") {
            config.pipeline.max_retry_attempts = n;
        }
        if let Some(secs) = parse(&lookup, "SKYWATCH_RETRY_BASE_DELAY_SECS") {
            config.pipeline.retry_base_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = parse(&lookup, "SKYWATCH_RETRY_MAX_DELAY_SECS") {
            config.pipeline.retry_max_delay = Duration::from_secs(secs);
        }
        if let Some(n) = parse(&lookup, "SKYWATCH_BREAKER_THRESHOLD") {
            config.pipeline.breaker_threshold = n;
        }
        if let Some(secs) = parse(&lookup, "SKYWATCH_BREAKER_COOLDOWN_SECS") {
            config.pipeline.breaker_cooldown = Duration::from_secs(secs);
        }
        if let Some(n) = parse(&lookup, "SKYWATCH_POOL_SIZE") {
            config.pipeline.pool_size = n;
        }
        if let Some(secs) = parse(&lookup, "SKYWATCH_POOL_ACQUIRE_TIMEOUT_SECS") {
            config.pipeline.pool_acquire_timeout = Duration::from_secs(secs);
        }
        if let Some(url) = lookup("SKYWATCH_STORE_ENDPOINT") {
            config.store.endpoint = url;
        }
        if let Some(user) = lookup("SKYWATCH_STORE_USER") {
            config.store.username = Some(user);
        }
        if let Some(password) = lookup("SKYWATCH_STORE_PASSWORD") {
            config.store.password = Some(password);
        }
        if let Some(secs) = parse(&lookup, "SKYWATCH_STORE_TIMEOUT_SECS") {
            config.store.request_timeout = Duration::from_secs(secs);
        }
        if let Some(url) = lookup("SKYWATCH_ALERT_WEBHOOK_URL") {
            config.alert.webhook_url = Some(url);
        }
        if let Some(secs) = parse(&lookup, "SKYWATCH_FLUSH_INTERVAL_SECS") {
            config.flush_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse(&lookup, "SKYWATCH_SHUTDOWN_DEADLINE_SECS") {
            config.shutdown_deadline = Duration::from_secs(secs);
        }

        config
    }
}

/// Parse a variable through the lookup; unparseable values fall back to the
/// default (logged at warn so a typo is visible, not fatal).
fn parse<F, T>(lookup: &F, name: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.feed.poll_interval, Duration::from_secs(60));
        assert_eq!(config.flush_interval, Duration::from_secs(300));
        assert_eq!(config.cache.stale_after, Duration::from_secs(3600));
        assert_eq!(config.cache.max_entries, 200);
        assert_eq!(config.pipeline.breaker_threshold, 5);
        assert_eq!(config.pipeline.pool_size, 5);
        assert!(config.alert.webhook_url.is_none());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let lookup = lookup_from(&[
            ("SKYWATCH_AIRCRAFT_JSON_URL", "http://feeder/aircraft.json"),
            ("SKYWATCH_POLL_INTERVAL_SECS", "15"),
            ("SKYWATCH_BREAKER_THRESHOLD", "3"),
            ("SKYWATCH_STORE_USER", "tracker"),
            ("SKYWATCH_ALERT_WEBHOOK_URL", "http://hooks/adsb"),
        ]);
        let config = AppConfig::from_lookup(lookup);

        assert_eq!(config.feed.aircraft_json_url, "http://feeder/aircraft.json");
        assert_eq!(config.feed.poll_interval, Duration::from_secs(15));
        assert_eq!(config.pipeline.breaker_threshold, 3);
        assert_eq!(config.store.username.as_deref(), Some("tracker"));
        assert_eq!(config.alert.webhook_url.as_deref(), Some("http://hooks/adsb"));
        // Untouched settings keep their defaults
        assert_eq!(config.flush_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_from_lookup_ignores_unparseable() {
        let lookup = lookup_from(&[("SKYWATCH_POLL_INTERVAL_SECS", "not-a-number")]);
        let config = AppConfig::from_lookup(lookup);
        assert_eq!(config.feed.poll_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_from_lookup_trims_whitespace() {
        let lookup = lookup_from(&[("SKYWATCH_MAX_CACHE_ENTRIES", " 500 ")]);
        let config = AppConfig::from_lookup(lookup);
        assert_eq!(config.cache.max_entries, 500);
    }
}
