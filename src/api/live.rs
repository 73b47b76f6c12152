//! Live per-city metrics backed by the snapshot cache.
//!
//! Valid cached snapshots are served without a remote call. Only the cities that
//! miss the cache are requested remotely, and only remote snapshots are cached:
//! synthesized ones are cheap to rebuild and must not mask a recovered backend.

use chrono::Utc;
use serde_json::json;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

use super::service::{DataSource, QueryResult};
use super::supabase::{RemoteBackend, RPC_LIVE_CITY_SNAPSHOTS};
use crate::engine::{live, CityCatalog, SnapshotCache};
use crate::error::AppError;
use crate::models::{City, CitySnapshot};

pub struct LiveMetrics<B> {
    backend: Option<Arc<B>>,
    catalog: Arc<CityCatalog>,
    cache: RwLock<SnapshotCache>,
}

impl<B: RemoteBackend> LiveMetrics<B> {
    pub fn new(backend: Option<Arc<B>>, catalog: Arc<CityCatalog>, cache: SnapshotCache) -> Self {
        Self {
            backend,
            catalog,
            cache: RwLock::new(cache),
        }
    }

    /// Current snapshots for the cohort, in cohort order.
    pub async fn fetch_live_snapshots<S: AsRef<str>>(
        &self,
        city_ids: &[S],
    ) -> QueryResult<Vec<CitySnapshot>> {
        let cohort = self.catalog.resolve_cohort(city_ids);
        let ids: Vec<&str> = cohort.iter().map(|c| c.id.as_str()).collect();

        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ids);
        let missing: Vec<&City> = cohort
            .iter()
            .copied()
            .filter(|c| !cached.iter().any(|s| s.city_id.eq_ignore_ascii_case(&c.id)))
            .collect();
        debug!(
            "Live snapshots: {} cached, {} to fetch",
            cached.len(),
            missing.len()
        );

        let mut error = None;
        let mut fetched: Vec<CitySnapshot> = Vec::new();
        if !missing.is_empty() {
            if let Some(backend) = &self.backend {
                match self.fetch_remote(backend, &missing).await {
                    Ok(snapshots) => {
                        let stored = self
                            .cache
                            .write()
                            .unwrap_or_else(PoisonError::into_inner)
                            .store(snapshots.iter().cloned());
                        info!("Cached {} live snapshot(s) from remote", stored);
                        fetched = snapshots;
                    },
                    Err(e) => {
                        warn!("Live snapshot fetch failed: {}", e);
                        error = Some(e);
                    },
                }
            }
        }

        let now = Utc::now();
        let mut synthesized = 0usize;
        let data: Vec<CitySnapshot> = cohort
            .iter()
            .map(|city| {
                cached
                    .iter()
                    .chain(fetched.iter())
                    .find(|s| s.city_id.eq_ignore_ascii_case(&city.id))
                    .cloned()
                    .unwrap_or_else(|| {
                        synthesized += 1;
                        live::synthesize_live_snapshot(city, now)
                    })
            })
            .collect();

        let source = if synthesized > 0 {
            info!("Synthesized {} live snapshot(s)", synthesized);
            DataSource::Fallback
        } else {
            DataSource::Remote
        };
        QueryResult {
            data,
            error,
            source,
        }
    }

    async fn fetch_remote(
        &self,
        backend: &B,
        cities: &[&City],
    ) -> Result<Vec<CitySnapshot>, AppError> {
        let ids: Vec<&str> = cities.iter().map(|c| c.id.as_str()).collect();
        let payload = backend
            .call_rpc(RPC_LIVE_CITY_SNAPSHOTS, json!({ "city_ids": ids }))
            .await?;
        match payload {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    /// Drops one city's cached snapshot so the next fetch goes remote.
    pub fn invalidate(&self, city_id: &str) -> bool {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear(city_id)
    }

    /// Removes expired snapshots. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .prune_expired()
    }

    pub fn clear_cache(&self) -> usize {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear_all()
    }

    pub fn cached_entries(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
