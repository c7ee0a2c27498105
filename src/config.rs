//! Cache configuration.

use serde::Deserialize;
use std::env;

use crate::error::ConfigError;
use crate::utils::parse_base_url;

/// Public Rick and Morty API root.
pub const DEFAULT_BASE_URL: &str = "https://rickandmortyapi.com/api";

/// Configuration for evicting unobserved slots after settlements.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EvictionConfig {
    /// Provide a number between 0 and 1 to calculate whether eviction should run
    /// after each settlement.
    ///
    /// - `1.0` -> run eviction after every settlement
    /// - `0.5` -> run eviction after every 2nd settlement (on average)
    /// - `0.0` -> only evict on explicit `evict_stale` calls
    pub frequency: f64,

    /// Remove unobserved slots until the table holds at most this many.
    pub max_entries: usize,

    /// Unobserved slots last touched longer ago than this are removed.
    pub max_age_ms: i64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        EvictionConfig {
            frequency: 0.1,
            max_entries: 1_000,
            max_age_ms: 300_000,
        }
    }
}

/// Configuration for `ResourceCache`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root URL entity and relative reference keys are resolved against.
    pub base_url: String,

    /// Freshness window in milliseconds. Younger entries are served without a
    /// fetch; older ones are served and revalidated in the background.
    pub ttl_ms: i64,

    /// Per-request timeout used by the default HTTP fetcher.
    pub request_timeout_ms: u64,

    /// `None` disables eviction entirely.
    pub eviction: Option<EvictionConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            ttl_ms: 60_000,
            request_timeout_ms: 10_000,
            eviction: Some(EvictionConfig::default()),
        }
    }
}

impl CacheConfig {
    /// Defaults overridden by `SWR_QUERY_BASE_URL`, `SWR_QUERY_TTL_MS` and
    /// `SWR_QUERY_TIMEOUT_MS` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = CacheConfig::default();
        if let Ok(base_url) = env::var("SWR_QUERY_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(ttl_ms) = parse_env("SWR_QUERY_TTL_MS")? {
            config.ttl_ms = ttl_ms;
        }
        if let Some(timeout_ms) = parse_env("SWR_QUERY_TIMEOUT_MS")? {
            config.request_timeout_ms = timeout_ms;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if parse_base_url(&self.base_url).is_none() {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.ttl_ms < 0 {
            return Err(ConfigError::InvalidTtl(self.ttl_ms));
        }
        Ok(())
    }
}

fn parse_env<T>(var: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Env {
                var: var.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
