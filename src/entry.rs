use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::error::FetchError;
use crate::key::ResourceKey;

/// A fetched JSON document, shared between every reader of an entry.
pub type Resource = Arc<Value>;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    /// Nothing requested yet, or invalidated.
    Idle,
    /// A fetch is in flight and no settled data is being served.
    Pending,
    /// Last attached fetch succeeded.
    Resolved,
    /// Last attached fetch failed.
    Failed,
}

/// A cache entry: the latest known response for a key and its freshness state.
///
/// Invariants maintained by the cache:
/// - `Resolved` implies `value.is_some()` and `error.is_none()`.
/// - `Failed` implies `error.is_some()`; `value` keeps the last successful
///   payload if there was one.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: ResourceKey,
    pub status: EntryStatus,
    pub value: Option<Resource>,
    pub error: Option<FetchError>,

    /// Unix timestamp in milliseconds of the last successful settlement.
    pub fetched_at: Option<i64>,

    /// Unix timestamp in milliseconds of the last settlement of any outcome.
    pub updated_at: Option<i64>,
}

impl CacheEntry {
    /// An entry nothing has been requested for.
    pub fn idle(key: ResourceKey) -> Self {
        CacheEntry {
            key,
            status: EntryStatus::Idle,
            value: None,
            error: None,
            fetched_at: None,
            updated_at: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.status, EntryStatus::Resolved | EntryStatus::Failed)
    }

    /// Check if the last settlement happened less than `ttl_ms` ago.
    pub fn is_fresh(&self, now_ms: i64, ttl_ms: i64) -> bool {
        self.updated_at.is_some_and(|at| now_ms - at < ttl_ms)
    }

    /// Move into `Pending`, keeping the last value around.
    pub(crate) fn begin(&mut self) {
        self.status = EntryStatus::Pending;
        self.error = None;
    }

    pub(crate) fn resolve(&mut self, value: Resource, now_ms: i64) {
        self.status = EntryStatus::Resolved;
        self.value = Some(value);
        self.error = None;
        self.fetched_at = Some(now_ms);
        self.updated_at = Some(now_ms);
    }

    pub(crate) fn fail(&mut self, error: FetchError, now_ms: i64) {
        self.status = EntryStatus::Failed;
        self.error = Some(error);
        self.updated_at = Some(now_ms);
    }

    pub(crate) fn reset(&mut self) {
        self.status = EntryStatus::Idle;
        self.error = None;
    }

    /// Decode the payload into a typed model.
    ///
    /// Returns `Ok(None)` if the entry holds no value.
    pub fn decode<T>(&self) -> Result<Option<T>, FetchError>
    where
        T: DeserializeOwned,
    {
        match &self.value {
            Some(value) => decode_resource(&self.key.to_string(), value).map(Some),
            None => Ok(None),
        }
    }
}

/// Decode a shared JSON document, reporting shape mismatches as `Decode` errors.
pub fn decode_resource<T>(origin: &str, value: &Value) -> Result<T, FetchError>
where
    T: DeserializeOwned,
{
    T::deserialize(value).map_err(|e| FetchError::decode(origin, e.to_string()))
}
