//! ADS-B feed snapshot polling.
//!
//! The feed is a dump1090-fa / tar1090 style `aircraft.json` document: a
//! top-level object with an `aircraft` array, one entry per aircraft currently
//! in range. Each poll is decoded into [`Snapshot`] values that the cache
//! consumes exactly once.
//!
//! A failed poll is never fatal: the cycle is skipped, logged, and the next
//! tick retries.

mod http;

pub use http::HttpSnapshotSource;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::store::BoxFuture;

/// Errors raised while fetching or decoding the feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The HTTP request failed or returned a non-success status.
    #[error("feed request failed: {0}")]
    Http(String),

    /// The response body was not a valid aircraft.json document.
    #[error("feed decode failed: {0}")]
    Decode(String),
}

/// One aircraft's reported state at one poll instant.
///
/// Produced by a [`SnapshotSource`], consumed exactly once by
/// [`crate::cache::AircraftCache::merge`], then discarded.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// ICAO 24-bit address, uppercased. The cache key.
    pub hex: String,
    /// Callsign / flight number, trimmed.
    pub flight: Option<String>,
    /// Barometric altitude in feet.
    pub alt_baro: Option<f64>,
    /// Ground speed in knots.
    pub ground_speed: Option<f64>,
    /// True track in degrees.
    pub track: Option<f64>,
    /// Barometric rate of climb in ft/min.
    pub baro_rate: Option<f64>,
    /// Transponder squawk code.
    pub squawk: Option<String>,
    /// Emitter category (e.g. "A3").
    pub category: Option<String>,
    /// Total Mode-S messages received for this aircraft.
    pub messages: Option<u64>,
    /// Seconds since the last message was received.
    pub seen: Option<f64>,
    /// Latitude in decimal degrees.
    pub lat: Option<f64>,
    /// Longitude in decimal degrees.
    pub lon: Option<f64>,
    /// When this poll was taken.
    pub fetched_at: DateTime<Utc>,
}

/// Source of feed snapshots.
///
/// Abstracted behind a trait so tests can inject scripted polls without a
/// running receiver.
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current aircraft list.
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<Snapshot>, FeedError>>;
}

/// Raw wire format of the feed document.
#[derive(Debug, Deserialize)]
struct AircraftJson {
    #[serde(default)]
    aircraft: Vec<RawAircraft>,
}

/// One raw feed entry. Everything except `hex` is optional; receivers omit
/// fields they have no recent data for.
#[derive(Debug, Deserialize)]
struct RawAircraft {
    hex: Option<String>,
    flight: Option<String>,
    alt_baro: Option<serde_json::Value>,
    gs: Option<f64>,
    track: Option<f64>,
    baro_rate: Option<f64>,
    squawk: Option<String>,
    category: Option<String>,
    messages: Option<u64>,
    seen: Option<f64>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Decode an `aircraft.json` body into snapshots.
///
/// Entries without a usable hex identifier are discarded rather than failing
/// the whole poll. `alt_baro` may be the string `"ground"` for aircraft on
/// the ground; that is mapped to altitude 0.
pub fn decode_aircraft_json(
    body: &[u8],
    fetched_at: DateTime<Utc>,
) -> Result<Vec<Snapshot>, FeedError> {
    let document: AircraftJson =
        serde_json::from_slice(body).map_err(|e| FeedError::Decode(e.to_string()))?;

    let total = document.aircraft.len();
    let snapshots: Vec<Snapshot> = document
        .aircraft
        .into_iter()
        .filter_map(|raw| snapshot_from_raw(raw, fetched_at))
        .collect();

    if snapshots.len() < total {
        tracing::debug!(
            total,
            valid = snapshots.len(),
            "Discarded feed entries without a hex identifier"
        );
    }

    Ok(snapshots)
}

fn snapshot_from_raw(raw: RawAircraft, fetched_at: DateTime<Utc>) -> Option<Snapshot> {
    let hex = raw.hex?.trim().to_ascii_uppercase();
    if hex.is_empty() {
        return None;
    }

    Some(Snapshot {
        hex,
        flight: raw
            .flight
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty()),
        alt_baro: raw.alt_baro.and_then(altitude_from_value),
        ground_speed: raw.gs,
        track: raw.track,
        baro_rate: raw.baro_rate,
        squawk: raw.squawk,
        category: raw.category,
        messages: raw.messages,
        seen: raw.seen,
        lat: raw.lat,
        lon: raw.lon,
        fetched_at,
    })
}

fn altitude_from_value(value: serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        // dump1090 reports "ground" for aircraft on the surface
        serde_json::Value::String(s) if s == "ground" => Some(0.0),
        _ => None,
    }
}
