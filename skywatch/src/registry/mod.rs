//! Aircraft registry lookup table.
//!
//! The registry maps an ICAO hex address to static descriptive data
//! (registration mark, type code, type name) loaded from a semicolon-delimited
//! CSV export. The table is parsed once, served from memory, and reloaded
//! after a configurable TTL; a failed reload keeps serving the stale table
//! rather than dropping enrichment.
//!
//! A lookup miss is not an error. The cache records an aircraft with empty
//! enrichment fields and the merge carries on.

mod http;

pub use http::HttpRegistrySource;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::BoxFuture;

/// Store column limits the original schema imposes on enrichment fields.
const MAX_REGISTRATION_LEN: usize = 15;
const MAX_TYPE_CODE_LEN: usize = 10;
const MAX_TYPE_NAME_LEN: usize = 100;

/// Errors raised while fetching the registry source.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The CSV could not be fetched.
    #[error("registry fetch failed: {0}")]
    Fetch(String),
}

/// Static descriptive data for one airframe.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AircraftInfo {
    /// Registration mark (tail number), e.g. "N12345".
    pub registration: Option<String>,
    /// ICAO type designator, e.g. "B738".
    pub type_code: Option<String>,
    /// Long type name, e.g. "Boeing 737-800".
    pub type_name: Option<String>,
}

/// Source of the raw registry CSV text.
pub trait RegistrySource: Send + Sync {
    /// Fetch the current registry CSV body.
    fn fetch(&self) -> BoxFuture<'_, Result<String, RegistryError>>;
}

struct RegistryTable {
    entries: HashMap<String, AircraftInfo>,
    loaded_at: Option<Instant>,
}

/// TTL-refreshed registry lookup table.
pub struct AircraftRegistry {
    source: Box<dyn RegistrySource>,
    ttl: Duration,
    table: RwLock<RegistryTable>,
}

impl AircraftRegistry {
    /// Create an empty registry backed by the given source.
    ///
    /// The first [`AircraftRegistry::refresh_if_stale`] call performs the
    /// initial load.
    pub fn new(source: Box<dyn RegistrySource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            table: RwLock::new(RegistryTable {
                entries: HashMap::new(),
                loaded_at: None,
            }),
        }
    }

    /// Look up an aircraft by hex address. Case-insensitive; a miss returns
    /// `None` and is not an error.
    pub fn lookup(&self, hex: &str) -> Option<AircraftInfo> {
        if hex.is_empty() {
            return None;
        }
        self.table
            .read()
            .entries
            .get(&hex.to_ascii_uppercase())
            .cloned()
    }

    /// Number of airframes currently in the table.
    pub fn len(&self) -> usize {
        self.table.read().entries.len()
    }

    /// Whether the table has never been loaded or is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Age of the current table, if it has been loaded.
    pub fn age(&self) -> Option<Duration> {
        self.table.read().loaded_at.map(|t| t.elapsed())
    }

    /// Reload the table when it has never loaded or its TTL has elapsed.
    ///
    /// A failed or empty reload keeps the existing table in place.
    pub async fn refresh_if_stale(&self) {
        let needs_refresh = {
            let table = self.table.read();
            match table.loaded_at {
                None => true,
                Some(loaded_at) => loaded_at.elapsed() >= self.ttl || table.entries.is_empty(),
            }
        };
        if !needs_refresh {
            return;
        }

        match self.source.fetch().await {
            Ok(body) => {
                let entries = parse_registry_csv(&body);
                if entries.is_empty() {
                    warn!("Registry reload produced no entries, keeping existing table");
                    return;
                }
                info!(airframes = entries.len(), "Aircraft registry loaded");
                let mut table = self.table.write();
                table.entries = entries;
                table.loaded_at = Some(Instant::now());
            }
            Err(e) => {
                warn!(error = %e, "Registry reload failed, keeping existing table");
            }
        }
    }
}

/// Parse the semicolon-delimited registry CSV.
///
/// Expected columns: `hex;registration;type_code;<unused>;type_name`.
/// Rows with fewer than five columns or a malformed hex address are skipped.
pub fn parse_registry_csv(body: &str) -> HashMap<String, AircraftInfo> {
    let mut entries = HashMap::new();
    let mut skipped = 0usize;

    for line in body.lines() {
        let fields: Vec<&str> = line.split(';').map(str::trim).collect();
        if fields.len() < 5 || fields[0].is_empty() {
            skipped += 1;
            continue;
        }

        let hex = fields[0].to_ascii_uppercase();
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            skipped += 1;
            continue;
        }

        entries.insert(
            hex,
            AircraftInfo {
                registration: clamped_field(fields[1], MAX_REGISTRATION_LEN),
                type_code: clamped_field(fields[2], MAX_TYPE_CODE_LEN),
                type_name: clamped_field(fields[4], MAX_TYPE_NAME_LEN),
            },
        );
    }

    if skipped > 0 {
        debug!(skipped, loaded = entries.len(), "Skipped malformed registry rows");
    }
    entries
}

/// Empty fields become `None`; over-long fields are truncated to the store's
/// column limit.
///
/// The limit is in bytes, but the cut must land on a character boundary:
/// registry exports carry non-ASCII names, and `String::truncate` panics
/// mid-character.
fn clamped_field(raw: &str, max_len: usize) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let mut value = raw.to_string();
    if value.len() > max_len {
        let mut cut = max_len;
        while !value.is_char_boundary(cut) {
            cut -= 1;
        }
        value.truncate(cut);
    }
    Some(value)
}
