//! Public analytics queries with remote-first, local-fallback semantics.
//!
//! Each query tries the remote backend. A failed call, an empty answer, or a payload
//! that does not match the expected shape is replaced by local synthesis and tagged
//! `fallback`; the remote error (if any) stays attached for soft warnings.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use super::supabase::{RemoteBackend, RPC_CITY_ANALYSIS, RPC_CITY_FORECAST, RPC_MULTI_CITY_OVERVIEW};
use crate::engine::{overview, AnalysisDispatcher, CityCatalog};
use crate::error::AppError;
use crate::models::{AnalysisSnapshot, CityForecastSummary, MultiCityOverview, Window};

/// Where a query result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    #[serde(rename = "supabase")]
    Remote,
    #[serde(rename = "fallback")]
    Fallback,
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Remote => "supabase",
            DataSource::Fallback => "fallback",
        }
    }
}

/// `{data, error, source}` envelope returned by every public query.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub data: T,
    /// Present only when a remote attempt was made and failed.
    pub error: Option<AppError>,
    pub source: DataSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CityAnalysisParams {
    pub city_id: String,
    pub window: Window,
}

impl CityAnalysisParams {
    pub fn new(city_id: &str, window: Window) -> Self {
        Self {
            city_id: city_id.to_string(),
            window,
        }
    }

    /// Effective request key: trimmed, lowercase id.
    pub fn normalized(&self) -> Self {
        Self {
            city_id: self.city_id.trim().to_ascii_lowercase(),
            window: self.window,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OverviewParams {
    pub city_ids: Vec<String>,
    pub window: Window,
}

impl OverviewParams {
    pub fn new<S: AsRef<str>>(city_ids: &[S], window: Window) -> Self {
        Self {
            city_ids: city_ids.iter().map(|s| s.as_ref().to_string()).collect(),
            window,
        }
    }

    /// Effective request key: trimmed, lowercase, blank and duplicate ids removed.
    pub fn normalized(&self) -> Self {
        let mut city_ids: Vec<String> = Vec::with_capacity(self.city_ids.len());
        for id in &self.city_ids {
            let id = id.trim().to_ascii_lowercase();
            if !id.is_empty() && !city_ids.contains(&id) {
                city_ids.push(id);
            }
        }
        Self {
            city_ids,
            window: self.window,
        }
    }
}

pub struct AnalyticsService<B> {
    backend: Option<Arc<B>>,
    catalog: Arc<CityCatalog>,
    dispatcher: AnalysisDispatcher,
}

impl<B: RemoteBackend> AnalyticsService<B> {
    pub fn new(
        backend: Option<Arc<B>>,
        catalog: Arc<CityCatalog>,
        dispatcher: AnalysisDispatcher,
    ) -> Self {
        Self {
            backend,
            catalog,
            dispatcher,
        }
    }

    /// Runs the remote call and decodes it, or substitutes `fallback()`.
    async fn remote_or_fallback<T, F, Fut>(
        &self,
        function: &str,
        params: serde_json::Value,
        fallback: F,
    ) -> QueryResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let error = match &self.backend {
            None => None,
            Some(backend) => match backend.call_rpc(function, params).await {
                Ok(Some(payload)) => match serde_json::from_value::<T>(payload) {
                    Ok(data) => {
                        info!("Using remote data from {}", function);
                        return QueryResult {
                            data,
                            error: None,
                            source: DataSource::Remote,
                        };
                    },
                    Err(e) => {
                        warn!("Remote payload from {} has an unexpected shape: {}", function, e);
                        Some(AppError::from(e))
                    },
                },
                Ok(None) => {
                    info!("Remote function {} returned no data", function);
                    None
                },
                Err(e) => {
                    warn!("Remote function {} failed: {}", function, e);
                    Some(e)
                },
            },
        };

        info!("Using local synthesis for {}", function);
        QueryResult {
            data: fallback().await,
            error,
            source: DataSource::Fallback,
        }
    }

    /// Single-city analysis (`get_city_analysis`), falling back to an off-thread build.
    pub async fn fetch_city_analysis(
        &self,
        params: &CityAnalysisParams,
    ) -> QueryResult<AnalysisSnapshot> {
        let params = params.normalized();
        let rpc_params = json!({
            "city_id": params.city_id,
            "range_window": params.window.key(),
        });
        self.remote_or_fallback(RPC_CITY_ANALYSIS, rpc_params, || {
            self.dispatcher
                .build_city_analysis(&params.city_id, params.window)
        })
        .await
    }

    /// Cohort overview (`get_multi_city_overview`). An empty cohort is sent as `null`.
    pub async fn fetch_multi_city_overview(
        &self,
        params: &OverviewParams,
    ) -> QueryResult<MultiCityOverview> {
        let params = params.normalized();
        let city_ids = if params.city_ids.is_empty() {
            serde_json::Value::Null
        } else {
            json!(params.city_ids)
        };
        let rpc_params = json!({
            "city_ids": city_ids,
            "range_window": params.window.key(),
        });
        self.remote_or_fallback(RPC_MULTI_CITY_OVERVIEW, rpc_params, || async {
            overview::build_multi_city_overview(
                &self.catalog,
                &params.city_ids,
                params.window,
                chrono::Utc::now(),
            )
        })
        .await
    }

    /// Trend plus forecast for one city (`get_city_forecast`).
    pub async fn fetch_city_forecast_summary(
        &self,
        params: &CityAnalysisParams,
    ) -> QueryResult<CityForecastSummary> {
        let params = params.normalized();
        let rpc_params = json!({
            "city_id": params.city_id,
            "range_window": params.window.key(),
        });
        self.remote_or_fallback(RPC_CITY_FORECAST, rpc_params, || async {
            let snapshot = self
                .dispatcher
                .build_city_analysis(&params.city_id, params.window)
                .await;
            CityForecastSummary::from(snapshot)
        })
        .await
    }
}
