//! In-memory aircraft state cache.
//!
//! The cache is the one shared mutable structure in the system. It is backed
//! by a sharded concurrent map (`dashmap`), so merges for different
//! identifiers do not block each other while merge and drain for the same
//! identifier serialize on the entry. Neither ever observes a partially
//! updated record.
//!
//! Mutation goes exclusively through [`AircraftCache::merge`]; extraction
//! through the drain and eviction operations. No external code mutates record
//! fields directly.

mod record;

pub use record::{AircraftRecord, Batch};

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::config::CacheConfig;
use crate::feed::Snapshot;
use crate::registry::AircraftRegistry;

/// Point-in-time cache statistics for the dashboard.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheStats {
    /// Aircraft currently tracked.
    pub tracked: usize,
    /// Records with unflushed changes.
    pub dirty: usize,
    /// Entry count beyond which an early flush is requested.
    pub capacity: usize,
    /// Snapshots merged since startup.
    pub merges: u64,
    /// Records created since startup.
    pub records_created: u64,
    /// Stale records evicted since startup.
    pub evictions: u64,
}

/// Keyed mapping from hex identifier to accumulated aircraft state.
pub struct AircraftCache {
    records: DashMap<String, AircraftRecord>,
    max_entries: usize,
    merges: AtomicU64,
    records_created: AtomicU64,
    evictions: AtomicU64,
}

impl AircraftCache {
    /// Create an empty cache.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            records: DashMap::new(),
            max_entries: config.max_entries,
            merges: AtomicU64::new(0),
            records_created: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Merge one snapshot into the cache. Never fails.
    ///
    /// An unseen identifier creates a record with
    /// `first_seen == last_seen == ` the snapshot's poll time. A known
    /// identifier has its dynamic fields overwritten wholesale (last write
    /// wins). Enrichment is looked up until it resolves, then cached on the
    /// record; a miss leaves the fields empty and is not an error.
    pub fn merge(&self, snapshot: Snapshot, registry: &AircraftRegistry) {
        let hex = snapshot.hex.clone();
        self.merges.fetch_add(1, Ordering::Relaxed);

        match self.records.entry(hex.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                record.apply(snapshot);
                if !record.enrichment_resolved {
                    if let Some(info) = registry.lookup(&hex) {
                        record.enrich(info);
                    }
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let mut record = AircraftRecord::from_snapshot(snapshot);
                if let Some(info) = registry.lookup(&hex) {
                    record.enrich(info);
                }
                self.records_created.fetch_add(1, Ordering::Relaxed);
                vacant.insert(record);
            }
        }
    }

    /// Atomically collect and clear all dirty records.
    ///
    /// Each drained record carries its snapshot count since the previous
    /// drain; the live record's count resets so the next drain reports only
    /// what arrived in between.
    pub fn drain_dirty(&self) -> Batch {
        let mut drained = Vec::new();
        for mut entry in self.records.iter_mut() {
            if entry.dirty {
                drained.push(entry.clone());
                entry.dirty = false;
                entry.snapshot_count = 0;
            }
        }
        Batch::new(drained)
    }

    /// Collect every record regardless of dirty state, clearing flags.
    ///
    /// Used by the shutdown coordinator so records merged after the last
    /// scheduled flush are covered too.
    pub fn drain_all(&self) -> Batch {
        let mut drained = Vec::new();
        for mut entry in self.records.iter_mut() {
            drained.push(entry.clone());
            entry.dirty = false;
            entry.snapshot_count = 0;
        }
        Batch::new(drained)
    }

    /// Re-mark a failed batch's records dirty so the next scheduled flush
    /// retries them.
    ///
    /// Snapshot counts from the failed batch are added back so no merges go
    /// unaccounted. A record that disappeared in between is reinstated from
    /// the batch copy.
    pub fn restore_dirty(&self, batch: &Batch) {
        for record in &batch.records {
            match self.records.entry(record.hex.clone()) {
                dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                    let live = occupied.get_mut();
                    live.dirty = true;
                    live.snapshot_count += record.snapshot_count;
                }
                dashmap::mapref::entry::Entry::Vacant(vacant) => {
                    let mut restored = record.clone();
                    restored.dirty = true;
                    vacant.insert(restored);
                }
            }
        }
    }

    /// Records whose `last_seen` is older than `stale_after`.
    ///
    /// This only captures candidates; removal happens in
    /// [`AircraftCache::remove_flushed`] after the records have been
    /// persisted, so eviction is flush-then-remove and never data loss.
    pub fn stale_records(&self, stale_after: std::time::Duration) -> Vec<AircraftRecord> {
        let cutoff = match ChronoDuration::from_std(stale_after) {
            Ok(d) => Utc::now() - d,
            Err(_) => return Vec::new(),
        };
        self.stale_records_before(cutoff)
    }

    /// Records last seen strictly before `cutoff`.
    pub fn stale_records_before(&self, cutoff: DateTime<Utc>) -> Vec<AircraftRecord> {
        self.records
            .iter()
            .filter(|entry| entry.last_seen < cutoff)
            .map(|entry| entry.clone())
            .collect()
    }

    /// Remove records that were flushed for eviction.
    ///
    /// A record that was merged again since its batch copy was taken (its
    /// `last_seen` moved) is no longer stale and stays in the cache. Returns
    /// the number of records removed.
    pub fn remove_flushed(&self, flushed: &[AircraftRecord]) -> usize {
        let mut removed = 0;
        for record in flushed {
            let was_removed = self
                .records
                .remove_if(&record.hex, |_, live| live.last_seen <= record.last_seen)
                .is_some();
            if was_removed {
                removed += 1;
            }
        }
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "Evicted stale aircraft after flush");
        }
        removed
    }

    /// Number of aircraft currently tracked.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the cache holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records with unflushed changes.
    pub fn dirty_count(&self) -> usize {
        self.records.iter().filter(|entry| entry.dirty).count()
    }

    /// Whether the entry count has reached the pressure threshold.
    pub fn over_capacity(&self) -> bool {
        self.max_entries > 0 && self.records.len() >= self.max_entries
    }

    /// Point-in-time statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            tracked: self.len(),
            dirty: self.dirty_count(),
            capacity: self.max_entries,
            merges: self.merges.load(Ordering::Relaxed),
            records_created: self.records_created.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Fetch a copy of one record, if present.
    pub fn get(&self, hex: &str) -> Option<AircraftRecord> {
        self.records.get(hex).map(|entry| entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistrySource;
    use crate::store::BoxFuture;
    use std::sync::Arc;
    use std::time::Duration;

    struct EmptySource;

    impl RegistrySource for EmptySource {
        fn fetch(&self) -> BoxFuture<'_, Result<String, crate::registry::RegistryError>> {
            Box::pin(async { Ok(String::new()) })
        }
    }

    fn empty_registry() -> AircraftRegistry {
        AircraftRegistry::new(Box::new(EmptySource), Duration::from_secs(3600))
    }

    async fn loaded_registry(csv: &str) -> AircraftRegistry {
        struct Source(String);
        impl RegistrySource for Source {
            fn fetch(&self) -> BoxFuture<'_, Result<String, crate::registry::RegistryError>> {
                let body = self.0.clone();
                Box::pin(async move { Ok(body) })
            }
        }
        let registry =
            AircraftRegistry::new(Box::new(Source(csv.to_string())), Duration::from_secs(3600));
        registry.refresh_if_stale().await;
        registry
    }

    fn snapshot(hex: &str, alt: f64) -> Snapshot {
        Snapshot {
            hex: hex.to_string(),
            flight: Some("UAL123".to_string()),
            alt_baro: Some(alt),
            ground_speed: Some(450.0),
            track: Some(270.0),
            baro_rate: None,
            squawk: Some("2200".to_string()),
            category: None,
            messages: Some(100),
            seen: Some(0.5),
            lat: Some(47.6),
            lon: Some(-122.3),
            fetched_at: Utc::now(),
        }
    }

    fn cache() -> AircraftCache {
        AircraftCache::new(&CacheConfig::default())
    }

    #[test]
    fn test_merge_creates_record_on_first_sighting() {
        let cache = cache();
        let registry = empty_registry();
        let snap = snapshot("A1B2C3", 30000.0);
        let at = snap.fetched_at;

        cache.merge(snap, &registry);

        let record = cache.get("A1B2C3").unwrap();
        assert_eq!(record.first_seen, at);
        assert_eq!(record.last_seen, at);
        assert_eq!(record.alt_baro, Some(30000.0));
        assert_eq!(record.snapshot_count, 1);
        assert!(record.is_dirty());
    }

    #[test]
    fn test_merge_last_write_wins_entirely() {
        let cache = cache();
        let registry = empty_registry();

        cache.merge(snapshot("A1B2C3", 30000.0), &registry);
        let mut second = snapshot("A1B2C3", 31000.0);
        // The second snapshot omits fields the first carried
        second.flight = None;
        second.lat = None;
        cache.merge(second, &registry);

        let record = cache.get("A1B2C3").unwrap();
        assert_eq!(record.alt_baro, Some(31000.0));
        assert!(record.flight.is_none());
        assert!(record.lat.is_none());
        assert_eq!(record.snapshot_count, 2);
    }

    #[test]
    fn test_merge_preserves_first_seen() {
        let cache = cache();
        let registry = empty_registry();

        let first = snapshot("A1B2C3", 30000.0);
        let first_at = first.fetched_at;
        cache.merge(first, &registry);
        cache.merge(snapshot("A1B2C3", 31000.0), &registry);

        let record = cache.get("A1B2C3").unwrap();
        assert_eq!(record.first_seen, first_at);
        assert!(record.last_seen >= first_at);
    }

    #[test]
    fn test_last_seen_never_moves_backwards() {
        let cache = cache();
        let registry = empty_registry();

        let mut newer = snapshot("A1B2C3", 30000.0);
        newer.fetched_at = Utc::now();
        let mut older = snapshot("A1B2C3", 29000.0);
        older.fetched_at = newer.fetched_at - ChronoDuration::seconds(30);

        cache.merge(newer.clone(), &registry);
        cache.merge(older, &registry);

        let record = cache.get("A1B2C3").unwrap();
        assert_eq!(record.last_seen, newer.fetched_at);
        // The dynamic fields still took the later merge's values
        assert_eq!(record.alt_baro, Some(29000.0));
    }

    #[tokio::test]
    async fn test_merge_enriches_from_registry_once() {
        let registry = loaded_registry("a1b2c3;N12345;B738;L2J;Boeing 737-800\n").await;
        let cache = cache();

        cache.merge(snapshot("A1B2C3", 30000.0), &registry);
        let record = cache.get("A1B2C3").unwrap();
        assert_eq!(record.registration.as_deref(), Some("N12345"));
        assert_eq!(record.type_code.as_deref(), Some("B738"));
        assert_eq!(record.type_name.as_deref(), Some("Boeing 737-800"));
    }

    #[test]
    fn test_merge_with_registry_miss_leaves_enrichment_empty() {
        let cache = cache();
        let registry = empty_registry();

        cache.merge(snapshot("A1B2C3", 30000.0), &registry);
        let record = cache.get("A1B2C3").unwrap();
        assert!(record.registration.is_none());
        assert!(record.type_code.is_none());
    }

    #[test]
    fn test_drain_dirty_collects_and_clears() {
        let cache = cache();
        let registry = empty_registry();
        cache.merge(snapshot("A1B2C3", 30000.0), &registry);
        cache.merge(snapshot("A1B2C3", 31000.0), &registry);

        let batch = cache.drain_dirty();
        assert_eq!(batch.len(), 1);
        let drained = &batch.records[0];
        assert_eq!(drained.hex, "A1B2C3");
        assert_eq!(drained.alt_baro, Some(31000.0));
        assert_eq!(drained.snapshot_count, 2);

        // The live record is clean with a reset counter
        let live = cache.get("A1B2C3").unwrap();
        assert!(!live.is_dirty());
        assert_eq!(live.snapshot_count, 0);
    }

    #[test]
    fn test_drain_dirty_is_idempotent() {
        let cache = cache();
        let registry = empty_registry();
        cache.merge(snapshot("A1B2C3", 30000.0), &registry);

        assert_eq!(cache.drain_dirty().len(), 1);
        assert!(cache.drain_dirty().is_empty());
    }

    #[test]
    fn test_merge_after_drain_is_dirty_again() {
        let cache = cache();
        let registry = empty_registry();
        cache.merge(snapshot("A1B2C3", 30000.0), &registry);
        cache.drain_dirty();

        cache.merge(snapshot("A1B2C3", 32000.0), &registry);
        let batch = cache.drain_dirty();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.records[0].alt_baro, Some(32000.0));
        assert_eq!(batch.records[0].snapshot_count, 1);
    }

    #[test]
    fn test_drain_all_includes_clean_records() {
        let cache = cache();
        let registry = empty_registry();
        cache.merge(snapshot("A1B2C3", 30000.0), &registry);
        cache.merge(snapshot("4CA123", 12000.0), &registry);
        cache.drain_dirty();
        cache.merge(snapshot("A1B2C3", 31000.0), &registry);

        let batch = cache.drain_all();
        assert_eq!(batch.len(), 2);
        assert_eq!(cache.dirty_count(), 0);
    }

    #[test]
    fn test_restore_dirty_re_marks_failed_batch() {
        let cache = cache();
        let registry = empty_registry();
        cache.merge(snapshot("A1B2C3", 30000.0), &registry);
        cache.merge(snapshot("A1B2C3", 31000.0), &registry);

        let batch = cache.drain_dirty();
        assert_eq!(cache.dirty_count(), 0);

        cache.restore_dirty(&batch);
        let record = cache.get("A1B2C3").unwrap();
        assert!(record.is_dirty());
        // The failed batch's merges are accounted again
        assert_eq!(record.snapshot_count, 2);
    }

    #[test]
    fn test_restore_dirty_accumulates_with_new_merges() {
        let cache = cache();
        let registry = empty_registry();
        cache.merge(snapshot("A1B2C3", 30000.0), &registry);
        let batch = cache.drain_dirty();

        // A merge arrives while the flush is failing
        cache.merge(snapshot("A1B2C3", 32000.0), &registry);
        cache.restore_dirty(&batch);

        let record = cache.get("A1B2C3").unwrap();
        assert_eq!(record.snapshot_count, 2);
        // The in-flight merge's fields are preserved, not the batch copy's
        assert_eq!(record.alt_baro, Some(32000.0));
    }

    #[test]
    fn test_restore_dirty_reinstates_missing_record() {
        let cache = cache();
        let registry = empty_registry();
        cache.merge(snapshot("A1B2C3", 30000.0), &registry);
        let batch = cache.drain_dirty();
        cache.remove_flushed(&batch.records);
        assert!(cache.is_empty());

        cache.restore_dirty(&batch);
        assert!(cache.get("A1B2C3").unwrap().is_dirty());
    }

    #[test]
    fn test_stale_records_and_removal() {
        let cache = cache();
        let registry = empty_registry();

        let mut old = snapshot("A1B2C3", 30000.0);
        old.fetched_at = Utc::now() - ChronoDuration::hours(2);
        cache.merge(old, &registry);
        cache.merge(snapshot("4CA123", 12000.0), &registry);

        let stale = cache.stale_records(Duration::from_secs(3600));
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].hex, "A1B2C3");

        let removed = cache.remove_flushed(&stale);
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("A1B2C3").is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_remove_flushed_spares_recently_merged() {
        let cache = cache();
        let registry = empty_registry();

        let mut old = snapshot("A1B2C3", 30000.0);
        old.fetched_at = Utc::now() - ChronoDuration::hours(2);
        cache.merge(old, &registry);
        let stale = cache.stale_records(Duration::from_secs(3600));
        assert_eq!(stale.len(), 1);

        // Aircraft reappears between capture and removal
        cache.merge(snapshot("A1B2C3", 15000.0), &registry);

        let removed = cache.remove_flushed(&stale);
        assert_eq!(removed, 0);
        assert!(cache.get("A1B2C3").is_some());
    }

    #[test]
    fn test_over_capacity() {
        let cache = AircraftCache::new(&CacheConfig {
            stale_after: Duration::from_secs(3600),
            max_entries: 2,
        });
        let registry = empty_registry();
        assert!(!cache.over_capacity());

        cache.merge(snapshot("A1B2C3", 30000.0), &registry);
        cache.merge(snapshot("4CA123", 12000.0), &registry);
        assert!(cache.over_capacity());
    }

    #[test]
    fn test_stats() {
        let cache = cache();
        let registry = empty_registry();
        cache.merge(snapshot("A1B2C3", 30000.0), &registry);
        cache.merge(snapshot("A1B2C3", 31000.0), &registry);
        cache.merge(snapshot("4CA123", 12000.0), &registry);

        let stats = cache.stats();
        assert_eq!(stats.tracked, 2);
        assert_eq!(stats.dirty, 2);
        assert_eq!(stats.merges, 3);
        assert_eq!(stats.records_created, 2);
        assert_eq!(stats.evictions, 0);
    }

    #[test]
    fn test_concurrent_merges_distinct_keys() {
        let cache = Arc::new(cache());
        let registry = Arc::new(empty_registry());
        let mut handles = Vec::new();

        for i in 0..8 {
            let cache = Arc::clone(&cache);
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for n in 0..50 {
                    let hex = format!("{:06X}", i * 1000 + n % 10);
                    cache.merge(snapshot(&hex, 1000.0 * n as f64), &registry);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.stats().merges, 400);
        assert_eq!(cache.len(), 80);
    }
}
