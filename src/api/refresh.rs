//! Explicit refresh with memoized request keys.
//!
//! A caller passes the effective request key on every refresh; the fetch only runs
//! when that key differs from the last one (or after `invalidate`).

use std::future::Future;
use tracing::debug;

#[derive(Debug)]
pub struct RefreshController<K, T> {
    last_key: Option<K>,
    last_value: Option<T>,
    fetches: usize,
}

impl<K, T> Default for RefreshController<K, T> {
    fn default() -> Self {
        Self {
            last_key: None,
            last_value: None,
            fetches: 0,
        }
    }
}

impl<K, T> RefreshController<K, T>
where
    K: PartialEq + Clone + std::fmt::Debug,
    T: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized value when `key` matches the previous request,
    /// otherwise runs `fetch(key)` and remembers the result.
    pub async fn refresh<F, Fut>(&mut self, key: K, fetch: F) -> T
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = T>,
    {
        if let (Some(last), Some(value)) = (&self.last_key, &self.last_value) {
            if *last == key {
                debug!("Request key {:?} unchanged; reusing last result", key);
                return value.clone();
            }
        }

        debug!("Request key changed to {:?}; fetching", key);
        let value = fetch(key.clone()).await;
        self.fetches += 1;
        self.last_key = Some(key);
        self.last_value = Some(value.clone());
        value
    }

    /// Forces the next `refresh` to fetch even if the key is unchanged.
    pub fn invalidate(&mut self) {
        self.last_key = None;
        self.last_value = None;
    }

    pub fn current(&self) -> Option<&T> {
        self.last_value.as_ref()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::service::{AnalyticsService, CityAnalysisParams, DataSource, OverviewParams};
    use crate::api::test_support::StubBackend;
    use crate::engine::{AnalysisDispatcher, CityCatalog, DispatcherConfig};
    use crate::models::Window;
    use std::sync::Arc;

    fn service() -> AnalyticsService<StubBackend> {
        let catalog = Arc::new(CityCatalog::load());
        let dispatcher = AnalysisDispatcher::new(catalog.clone(), DispatcherConfig::default());
        AnalyticsService::new(Some(Arc::new(StubBackend::new())), catalog, dispatcher)
    }

    #[tokio::test]
    async fn test_same_key_does_not_refetch() {
        let mut controller: RefreshController<u8, u8> = RefreshController::new();
        assert_eq!(controller.refresh(1, |k| async move { k * 10 }).await, 10);
        assert_eq!(controller.refresh(1, |_| async { 99 }).await, 10);
        assert_eq!(controller.fetch_count(), 1);

        assert_eq!(controller.refresh(2, |k| async move { k * 10 }).await, 20);
        assert_eq!(controller.fetch_count(), 2);
        assert_eq!(controller.current(), Some(&20));
    }

    #[tokio::test]
    async fn test_invalidate_forces_fetch() {
        let mut controller: RefreshController<&str, usize> = RefreshController::new();
        controller.refresh("24h", |_| async { 1 }).await;
        controller.invalidate();
        assert!(controller.current().is_none());
        assert_eq!(controller.refresh("24h", |_| async { 2 }).await, 2);
        assert_eq!(controller.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_window_change_refetches_city_analysis() {
        let service = &service();
        let mut controller = RefreshController::new();

        let first = controller
            .refresh(
                CityAnalysisParams::new(" Delhi", Window::Hours24).normalized(),
                |p| async move { service.fetch_city_analysis(&p).await },
            )
            .await;
        assert_eq!(first.data.trend_series.len(), 24);

        controller
            .refresh(
                CityAnalysisParams::new("delhi", Window::Hours24).normalized(),
                |p| async move { service.fetch_city_analysis(&p).await },
            )
            .await;
        assert_eq!(controller.fetch_count(), 1);

        let second = controller
            .refresh(
                CityAnalysisParams::new("delhi", Window::Days30).normalized(),
                |p| async move { service.fetch_city_analysis(&p).await },
            )
            .await;
        assert_eq!(second.data.trend_series.len(), 30);
        assert_eq!(second.source, DataSource::Fallback);
        assert_eq!(controller.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_equivalent_cohorts_share_a_key() {
        let service = &service();
        let mut controller = RefreshController::new();

        controller
            .refresh(
                OverviewParams::new(&["Pune", "delhi"], Window::Days7).normalized(),
                |p| async move { service.fetch_multi_city_overview(&p).await },
            )
            .await;
        let again = controller
            .refresh(
                OverviewParams::new(&["pune", " DELHI", "pune"], Window::Days7).normalized(),
                |p| async move { service.fetch_multi_city_overview(&p).await },
            )
            .await;
        assert_eq!(controller.fetch_count(), 1);
        assert_eq!(again.data.matrix.len(), 2);
    }
}
