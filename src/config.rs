//! Runtime configuration read from the environment (and `.env`, if present).

use crate::engine::cache::DEFAULT_SNAPSHOT_TTL_SECS;
use crate::engine::dispatcher::DEFAULT_DISPATCH_TIMEOUT;
use crate::engine::DispatcherConfig;
use crate::error::{AppError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;

/// Credentials for the remote analytics backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// `None` when either credential is missing: every query is then served locally.
    pub remote: Option<RemoteConfig>,
    pub remote_timeout: Duration,
    pub snapshot_ttl: chrono::Duration,
    pub dispatch_timeout: Duration,
    pub dispatch_offthread: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote: None,
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
            snapshot_ttl: chrono::Duration::seconds(DEFAULT_SNAPSHOT_TTL_SECS),
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            dispatch_offthread: true,
        }
    }
}

impl AppConfig {
    /// Loads `.env` and reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let remote = match (non_empty_var("SUPABASE_URL"), non_empty_var("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(RemoteConfig { url, anon_key }),
            (None, None) => {
                info!("No remote backend configured; using local synthesis only");
                None
            },
            _ => {
                warn!("Only one of SUPABASE_URL / SUPABASE_ANON_KEY is set; remote backend disabled");
                None
            },
        };

        let defaults = Self::default();
        Ok(Self {
            remote,
            remote_timeout: parse_var::<u64>("REMOTE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.remote_timeout),
            snapshot_ttl: parse_var::<u64>("SNAPSHOT_CACHE_TTL_SECS")?
                .map(snapshot_ttl)
                .transpose()?
                .unwrap_or(defaults.snapshot_ttl),
            dispatch_timeout: parse_var::<u64>("DISPATCH_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.dispatch_timeout),
            dispatch_offthread: parse_var::<bool>("DISPATCH_OFFTHREAD")?
                .unwrap_or(defaults.dispatch_offthread),
        })
    }

    pub fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            offthread: self.dispatch_offthread,
            timeout: self.dispatch_timeout,
        }
    }
}

/// Rejects lifetimes `chrono::Duration` cannot represent.
fn snapshot_ttl(secs: u64) -> Result<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| {
            AppError::Config(format!("SNAPSHOT_CACHE_TTL_SECS={} is out of range", secs))
        })
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(key) {
        None => Ok(None),
        Some(raw) => raw
            .to_ascii_lowercase()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: [&str; 6] = [
        "SUPABASE_URL",
        "SUPABASE_ANON_KEY",
        "SNAPSHOT_CACHE_TTL_SECS",
        "DISPATCH_TIMEOUT_MS",
        "DISPATCH_OFFTHREAD",
        "REMOTE_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_environment() {
        clear_env();
        let config = AppConfig::from_env().unwrap();
        assert!(config.remote.is_none());
        assert_eq!(config.snapshot_ttl, chrono::Duration::seconds(1800));
        assert_eq!(config.dispatch_timeout, Duration::from_millis(5000));
        assert!(config.dispatch_offthread);
        assert_eq!(config.remote_timeout, Duration::from_secs(10));
    }

    #[test]
    #[serial]
    fn test_overrides_are_applied() {
        clear_env();
        env::set_var("SUPABASE_URL", "https://example.supabase.co");
        env::set_var("SUPABASE_ANON_KEY", "anon");
        env::set_var("SNAPSHOT_CACHE_TTL_SECS", "60");
        env::set_var("DISPATCH_TIMEOUT_MS", "250");
        env::set_var("DISPATCH_OFFTHREAD", "FALSE");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(
            config.remote,
            Some(RemoteConfig {
                url: "https://example.supabase.co".to_string(),
                anon_key: "anon".to_string(),
            })
        );
        assert_eq!(config.snapshot_ttl, chrono::Duration::seconds(60));
        let dispatcher = config.dispatcher();
        assert!(!dispatcher.offthread);
        assert_eq!(dispatcher.timeout, Duration::from_millis(250));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_half_configured_remote_is_disabled() {
        clear_env();
        env::set_var("SUPABASE_URL", "https://example.supabase.co");
        assert!(AppConfig::from_env().unwrap().remote.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_malformed_value_is_config_error() {
        clear_env();
        env::set_var("DISPATCH_TIMEOUT_MS", "soon");
        assert!(matches!(AppConfig::from_env(), Err(AppError::Config(_))));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_negative_snapshot_ttl_is_config_error() {
        clear_env();
        env::set_var("SNAPSHOT_CACHE_TTL_SECS", "-5");
        assert!(matches!(AppConfig::from_env(), Err(AppError::Config(_))));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_oversized_snapshot_ttl_is_config_error() {
        clear_env();
        env::set_var("SNAPSHOT_CACHE_TTL_SECS", i64::MAX.to_string());
        assert!(matches!(AppConfig::from_env(), Err(AppError::Config(_))));
        env::set_var("SNAPSHOT_CACHE_TTL_SECS", u64::MAX.to_string());
        assert!(matches!(AppConfig::from_env(), Err(AppError::Config(_))));
        clear_env();
    }
}
