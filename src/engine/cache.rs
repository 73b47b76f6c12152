//! TTL-bounded cache of per-city live snapshots.
//!
//! Expired entries are never served: `get` treats them as absent, and
//! `prune_expired` removes them in place. The cache is single-writer; callers that
//! share it across tasks wrap it in a lock.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::CitySnapshot;

/// Default lifetime of a cached snapshot.
pub const DEFAULT_SNAPSHOT_TTL_SECS: i64 = 30 * 60;

/// Source of "now" for validity checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub snapshot: CitySnapshot,
    pub cached_at: DateTime<Utc>,
}

pub struct SnapshotCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

fn cache_key(city_id: &str) -> String {
    city_id.trim().to_ascii_lowercase()
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    fn is_valid(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.cached_at <= self.ttl
    }

    /// Stores snapshots stamped with the current time. Snapshots without a city
    /// identifier are rejected. Returns the number stored.
    pub fn store<I>(&mut self, snapshots: I) -> usize
    where
        I: IntoIterator<Item = CitySnapshot>,
    {
        let now = self.clock.now();
        let mut stored = 0;
        for snapshot in snapshots {
            let key = cache_key(&snapshot.city_id);
            if key.is_empty() {
                warn!("Refusing to cache a snapshot without a city identifier");
                continue;
            }
            self.entries.insert(
                key,
                CacheEntry {
                    snapshot,
                    cached_at: now,
                },
            );
            stored += 1;
        }
        debug!("Cached {} snapshot(s)", stored);
        stored
    }

    /// Valid snapshots for the requested ids, in request order. Missing and
    /// expired entries are silently skipped; a city requested twice is returned once.
    pub fn get<S: AsRef<str>>(&self, city_ids: &[S]) -> Vec<CitySnapshot> {
        let now = self.clock.now();
        let mut keys: Vec<String> = Vec::with_capacity(city_ids.len());
        for id in city_ids {
            let key = cache_key(id.as_ref());
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys.iter()
            .filter_map(|key| self.entries.get(key))
            .filter(|entry| self.is_valid(entry, now))
            .map(|entry| entry.snapshot.clone())
            .collect()
    }

    /// Removes one city's entry. Returns whether anything was removed.
    pub fn clear(&mut self, city_id: &str) -> bool {
        self.entries.remove(&cache_key(city_id)).is_some()
    }

    /// Drops every entry. Returns the number removed.
    pub fn clear_all(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    /// Removes every stale entry in one pass. Returns the number removed.
    pub fn prune_expired(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.cached_at <= ttl);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Pruned {} expired snapshot(s)", removed);
        }
        removed
    }

    /// Number of stored entries, including ones that have expired but were not pruned.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_SNAPSHOT_TTL_SECS))
    }
}

/// Manually advanced clock for simulated time in tests.
#[cfg(test)]
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<std::sync::Mutex<DateTime<Utc>>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(std::sync::Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AqiLevel;
    use chrono::TimeZone;

    fn snapshot(city_id: &str, aqi: u16) -> CitySnapshot {
        CitySnapshot {
            city_id: city_id.to_string(),
            city_name: city_id.to_uppercase(),
            aqi,
            dominant_pollutant: None,
            level: AqiLevel::from_aqi(aqi as f64),
            readings: Vec::new(),
            observed_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn cache_with_clock() -> (SnapshotCache, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
        let cache = SnapshotCache::with_clock(Duration::minutes(30), Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn test_entry_survives_until_ttl() {
        let (mut cache, clock) = cache_with_clock();
        cache.store(vec![snapshot("delhi", 180)]);

        clock.advance(Duration::minutes(29));
        assert_eq!(cache.get(&["delhi"]).len(), 1);

        clock.advance(Duration::minutes(1));
        assert_eq!(cache.get(&["delhi"]).len(), 1, "exactly ttl old is still valid");

        clock.advance(Duration::seconds(1));
        assert!(cache.get(&["delhi"]).is_empty());
    }

    #[test]
    fn test_get_filters_missing_and_preserves_order() {
        let (mut cache, _clock) = cache_with_clock();
        cache.store(vec![snapshot("pune", 90), snapshot("delhi", 200)]);
        let hits = cache.get(&["DELHI", "unknown", "pune"]);
        let ids: Vec<&str> = hits.iter().map(|s| s.city_id.as_str()).collect();
        assert_eq!(ids, vec!["delhi", "pune"]);
    }

    #[test]
    fn test_snapshots_without_id_are_rejected() {
        let (mut cache, _clock) = cache_with_clock();
        let stored = cache.store(vec![snapshot("", 50), snapshot("   ", 60), snapshot("patna", 170)]);
        assert_eq!(stored, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_duplicate_ids_return_one_snapshot() {
        let (mut cache, _clock) = cache_with_clock();
        cache.store(vec![snapshot("delhi", 200), snapshot("pune", 90)]);
        let hits = cache.get(&["delhi", "Delhi", " DELHI ", "pune", "delhi"]);
        let ids: Vec<&str> = hits.iter().map(|s| s.city_id.as_str()).collect();
        assert_eq!(ids, vec!["delhi", "pune"]);
    }

    #[test]
    fn test_clear_removes_single_entry() {
        let (mut cache, _clock) = cache_with_clock();
        cache.store(vec![snapshot("pune", 90), snapshot("delhi", 200)]);
        assert!(cache.clear("pune"));
        assert!(!cache.clear("pune"));
        assert_eq!(cache.get(&["pune", "delhi"]).len(), 1);
    }

    #[test]
    fn test_prune_is_idempotent() {
        let (mut cache, clock) = cache_with_clock();
        cache.store(vec![snapshot("old", 100)]);
        clock.advance(Duration::minutes(20));
        cache.store(vec![snapshot("fresh", 120)]);
        clock.advance(Duration::minutes(15));

        assert_eq!(cache.prune_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.prune_expired(), 0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&["fresh"]).len(), 1);
    }

    #[test]
    fn test_restoring_refreshes_timestamp() {
        let (mut cache, clock) = cache_with_clock();
        cache.store(vec![snapshot("delhi", 150)]);
        clock.advance(Duration::minutes(25));
        cache.store(vec![snapshot("delhi", 160)]);
        clock.advance(Duration::minutes(25));
        let hits = cache.get(&["delhi"]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].aqi, 160);
    }
}
