//! Provides a client for the remote analytics backend (Supabase PostgREST RPC).
//!
//! The backend is treated as an opaque RPC service: each logical call is a
//! `POST /rest/v1/rpc/{function}` with a JSON parameter object, answering with a JSON
//! payload, `null`, or an error body.

use crate::error::{AppError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info};

pub const RPC_CITY_ANALYSIS: &str = "get_city_analysis";
pub const RPC_MULTI_CITY_OVERVIEW: &str = "get_multi_city_overview";
pub const RPC_CITY_FORECAST: &str = "get_city_forecast";
pub const RPC_LIVE_CITY_SNAPSHOTS: &str = "get_live_city_snapshots";

/// The remote query service consumed by the analytics layer.
pub trait RemoteBackend: Send + Sync {
    /// Invokes a remote function. `Ok(None)` means the call succeeded without data.
    fn call_rpc(
        &self,
        function: &str,
        params: serde_json::Value,
    ) -> impl Future<Output = Result<Option<serde_json::Value>>> + Send;
}

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    message: Option<String>,
    hint: Option<String>,
}

/// An asynchronous client for the Supabase RPC endpoint.
pub struct SupabaseClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl SupabaseClient {
    /// Creates a new `SupabaseClient` for the project at `base_url`.
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }
}

impl RemoteBackend for SupabaseClient {
    async fn call_rpc(
        &self,
        function: &str,
        params: serde_json::Value,
    ) -> Result<Option<serde_json::Value>> {
        info!("Calling remote function {}", function);
        debug!("Remote params for {}: {}", function, params);

        let response = self
            .client
            .post(self.rpc_url(function))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&params)
            .send()
            .await
            .map_err(|e| {
                error!("Error calling remote function {}: {}", function, e);
                AppError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<RemoteErrorBody>(&body)
                .ok()
                .and_then(|b| match (b.message, b.hint) {
                    (Some(m), Some(h)) => Some(format!("{} ({})", m, h)),
                    (m, _) => m,
                })
                .unwrap_or_else(|| format!("HTTP {}", status));
            error!(
                "Remote function {} failed with status {}: {}",
                function, status, message
            );
            return Err(AppError::Remote {
                function: function.to_string(),
                message,
            });
        }

        let body = response.text().await.map_err(|e| {
            error!("Error reading response body from {}: {}", function, e);
            AppError::from(e)
        })?;
        if body.trim().is_empty() {
            debug!("Remote function {} returned an empty body", function);
            return Ok(None);
        }

        let payload: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            error!("Error parsing response JSON from {}: {}", function, e);
            AppError::from(e)
        })?;
        if payload.is_null() {
            debug!("Remote function {} returned null", function);
            return Ok(None);
        }
        Ok(Some(payload))
    }
}
