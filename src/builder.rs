//! Builder API for creating `ResourceCache` instances.
//!
//! The cache is constructed explicitly and handed to its consumers; there is no
//! process-global instance.

use std::sync::Arc;

use crate::cache::ResourceCache;
use crate::config::{CacheConfig, EvictionConfig};
use crate::error::ConfigError;
use crate::fetcher::Fetcher;
use crate::fetchers::HttpFetcher;

/// Builder for `ResourceCache`.
///
/// # Example
///
/// ```ignore
/// use swr_query::{ResourceCache, MemoryFetcher};
/// use std::sync::Arc;
///
/// let cache = ResourceCache::builder()
///     .base_url("https://rickandmortyapi.com/api")
///     .ttl_ms(30_000)
///     .build()?;
///
/// // Or over a fake origin
/// let fake = Arc::new(MemoryFetcher::new(Duration::ZERO));
/// let cache = ResourceCache::builder().fetcher(fake).build()?;
/// ```
pub struct ResourceCacheBuilder {
    config: CacheConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
}

impl ResourceCacheBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        ResourceCacheBuilder {
            config: CacheConfig::default(),
            fetcher: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.config.ttl_ms = ttl_ms;
        self
    }

    pub fn request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.request_timeout_ms = timeout_ms;
        self
    }

    /// `None` disables eviction after settlements.
    pub fn eviction(mut self, eviction: Option<EvictionConfig>) -> Self {
        self.config.eviction = eviction;
        self
    }

    /// Use a custom fetcher instead of the default HTTP one.
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Validate the configuration and build the cache.
    pub fn build(self) -> Result<ResourceCache, ConfigError> {
        self.config.validate()?;
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(&self.config)?),
        };
        Ok(ResourceCache::new(fetcher, self.config))
    }
}

impl Default for ResourceCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}
