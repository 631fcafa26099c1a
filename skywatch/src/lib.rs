//! Skywatch - ADS-B aircraft tracking and summary persistence
//!
//! This library ingests aircraft-position snapshots from a local ADS-B feed
//! (dump1090-fa / tar1090 `aircraft.json`), enriches them with static registry
//! data, accumulates per-aircraft state in an in-memory cache, and periodically
//! persists a consolidated summary to a durable store through a resilient
//! upload pipeline (bounded connection pool, retry with backoff, circuit
//! breaker, graceful-shutdown flush).
//!
//! # Architecture
//!
//! ```text
//! Poller ──► AircraftCache.merge() ──► FlushScheduler ──► UploadPipeline ──► Store
//!               ▲                          │  (timer)          │
//!          AircraftRegistry                │                   ├─► Notifier (alerts)
//!          (enrichment)                    └── eviction ───────┘
//! ```
//!
//! The shutdown coordinator in [`app`] intercepts termination, stops the
//! poller, and drains the cache through the same pipeline path under a hard
//! deadline.

pub mod alert;
pub mod app;
pub mod cache;
pub mod config;
pub mod feed;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod telemetry;
