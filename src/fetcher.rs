use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;

/// A fetcher is the network boundary of the cache: it turns a URL into a JSON
/// document or a classified failure.
///
/// The cache guarantees that at most one `fetch` per key is attached at a time;
/// implementations need not deduplicate.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// A name for tracing.
    ///
    /// # Example
    /// - "http"
    /// - "memory"
    fn name(&self) -> &'static str;

    /// Issue a GET for `url`.
    ///
    /// Non-2xx responses and malformed bodies must be reported as errors, never
    /// as `Ok` values.
    async fn fetch(&self, url: &str) -> Result<Value, FetchError>;
}
