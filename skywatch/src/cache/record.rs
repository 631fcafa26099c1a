//! Aircraft record and flush batch types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::feed::Snapshot;
use crate::registry::AircraftInfo;

/// Accumulated state for one aircraft.
///
/// Exactly one record exists per hex identifier. Dynamic fields always hold
/// the values of the last merged snapshot (last write wins entirely);
/// enrichment fields are resolved from the registry once and cached on the
/// record.
#[derive(Clone, Debug, Serialize)]
pub struct AircraftRecord {
    /// ICAO 24-bit address. Immutable cache key.
    pub hex: String,
    /// When this aircraft was first observed.
    pub first_seen: DateTime<Utc>,
    /// When this aircraft was last observed. Monotonically non-decreasing.
    pub last_seen: DateTime<Utc>,
    /// Callsign / flight number.
    pub flight: Option<String>,
    /// Barometric altitude in feet.
    pub alt_baro: Option<f64>,
    /// Ground speed in knots.
    pub ground_speed: Option<f64>,
    /// True track in degrees.
    pub track: Option<f64>,
    /// Barometric climb rate in ft/min.
    pub baro_rate: Option<f64>,
    /// Transponder squawk code.
    pub squawk: Option<String>,
    /// Emitter category.
    pub category: Option<String>,
    /// Total Mode-S messages received.
    pub messages: Option<u64>,
    /// Seconds since the last message at poll time.
    pub seen: Option<f64>,
    /// Latitude in decimal degrees.
    pub lat: Option<f64>,
    /// Longitude in decimal degrees.
    pub lon: Option<f64>,
    /// Registration mark from the registry.
    pub registration: Option<String>,
    /// ICAO type designator from the registry.
    pub type_code: Option<String>,
    /// Long type name from the registry.
    pub type_name: Option<String>,
    /// Snapshots merged since the last drain.
    pub snapshot_count: u64,
    /// Unflushed changes since the last drain.
    #[serde(skip)]
    pub(crate) dirty: bool,
    /// Set once a registry lookup has produced enrichment data, so later
    /// merges skip the lookup.
    #[serde(skip)]
    pub(crate) enrichment_resolved: bool,
}

impl AircraftRecord {
    /// Create a record from the first snapshot for an identifier.
    pub(crate) fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut record = Self {
            hex: snapshot.hex.clone(),
            first_seen: snapshot.fetched_at,
            last_seen: snapshot.fetched_at,
            flight: None,
            alt_baro: None,
            ground_speed: None,
            track: None,
            baro_rate: None,
            squawk: None,
            category: None,
            messages: None,
            seen: None,
            lat: None,
            lon: None,
            registration: None,
            type_code: None,
            type_name: None,
            snapshot_count: 0,
            dirty: false,
            enrichment_resolved: false,
        };
        record.apply(snapshot);
        record
    }

    /// Overwrite the dynamic fields with a later snapshot's values.
    ///
    /// Last write wins entirely; a field the new snapshot omits becomes
    /// empty. `last_seen` never moves backwards.
    pub(crate) fn apply(&mut self, snapshot: Snapshot) {
        debug_assert_eq!(self.hex, snapshot.hex);

        self.flight = snapshot.flight;
        self.alt_baro = snapshot.alt_baro;
        self.ground_speed = snapshot.ground_speed;
        self.track = snapshot.track;
        self.baro_rate = snapshot.baro_rate;
        self.squawk = snapshot.squawk;
        self.category = snapshot.category;
        self.messages = snapshot.messages;
        self.seen = snapshot.seen;
        self.lat = snapshot.lat;
        self.lon = snapshot.lon;
        if snapshot.fetched_at > self.last_seen {
            self.last_seen = snapshot.fetched_at;
        }
        self.snapshot_count += 1;
        self.dirty = true;
    }

    /// Cache enrichment data on the record.
    pub(crate) fn enrich(&mut self, info: AircraftInfo) {
        self.registration = info.registration;
        self.type_code = info.type_code;
        self.type_name = info.type_name;
        self.enrichment_resolved = true;
    }

    /// Whether this record has unflushed changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// The set of records captured atomically at one drain instant.
///
/// A merge racing the drain lands either in this batch or in the next one,
/// never both and never neither.
#[derive(Clone, Debug)]
pub struct Batch {
    /// Drained records, each reflecting its state at drain time.
    pub records: Vec<AircraftRecord>,
    /// When the drain was taken.
    pub captured_at: DateTime<Utc>,
}

impl Batch {
    /// Build a batch from already-captured records.
    pub fn new(records: Vec<AircraftRecord>) -> Self {
        Self {
            records,
            captured_at: Utc::now(),
        }
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
