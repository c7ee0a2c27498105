use futures::FutureExt;
use reqwest::Url;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::builder::ResourceCacheBuilder;
use crate::config::{CacheConfig, EvictionConfig};
use crate::entry::{CacheEntry, EntryStatus};
use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::key::ResourceKey;
use crate::utils::{now_ms, rand_simple};

/// One cache slot. The watch sender owns the current entry and fans every
/// change out to the subscriptions created from it.
struct Slot {
    tx: watch::Sender<CacheEntry>,
    touched_at: i64,
    /// Last operation committed to the entry, of either outcome.
    settled_by: Option<u64>,
}

impl Slot {
    fn new(key: ResourceKey, now: i64) -> Self {
        let (tx, _) = watch::channel(CacheEntry::idle(key));
        Slot {
            tx,
            touched_at: now,
            settled_by: None,
        }
    }

    fn is_observed(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

#[derive(Default)]
struct Table {
    slots: HashMap<ResourceKey, Slot>,
    /// At most one attached operation per key. Presence here is what makes a
    /// second `ensure` attach instead of fetching again. Operation ids grow
    /// monotonically, so a larger id was started later.
    in_flight: HashMap<ResourceKey, u64>,
    next_op: u64,
}

impl Table {
    fn start(&mut self, key: &ResourceKey) -> u64 {
        let op = self.next_op;
        self.next_op += 1;
        self.in_flight.insert(key.clone(), op);
        op
    }

    /// Remove unobserved, idle slots that are too old or beyond capacity.
    fn evict(&mut self, config: &EvictionConfig, now: i64) -> usize {
        let Table {
            slots, in_flight, ..
        } = self;
        let evictable = |key: &ResourceKey, slot: &Slot| {
            !slot.is_observed() && !in_flight.contains_key(key)
        };

        let before = slots.len();
        slots.retain(|key, slot| {
            !(evictable(key, &*slot) && now - slot.touched_at >= config.max_age_ms)
        });

        if slots.len() > config.max_entries {
            let mut candidates: Vec<(ResourceKey, i64)> = slots
                .iter()
                .filter(|&(key, slot)| evictable(key, slot))
                .map(|(key, slot)| (key.clone(), slot.touched_at))
                .collect();
            candidates.sort_by_key(|(_, touched_at)| *touched_at);

            let excess = slots.len() - config.max_entries;
            for (key, _) in candidates.into_iter().take(excess) {
                slots.remove(&key);
            }
        }

        before - slots.len()
    }
}

struct Shared {
    fetcher: Arc<dyn Fetcher>,
    config: CacheConfig,
    table: Mutex<Table>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Commit the outcome of an operation.
    ///
    /// Attached operations always commit. A detached operation (its key was
    /// invalidated while it ran) commits unless an operation started after it
    /// has settled the entry since. A detached failure also yields to a newer
    /// operation still in flight, which will settle the entry itself.
    fn settle(&self, key: &ResourceKey, op: u64, result: Result<Value, FetchError>) {
        let now = now_ms();
        let mut table = self.lock();

        let attached = table.in_flight.get(key) == Some(&op);
        if attached {
            table.in_flight.remove(key);
        }

        let newer_in_flight = table.in_flight.get(key).is_some_and(|&running| running > op);
        let Some(slot) = table.slots.get_mut(key) else {
            tracing::debug!(key = %key, op, "slot evicted before settlement, dropping result");
            return;
        };
        let superseded = !attached && slot.settled_by.is_some_and(|by| by > op);

        match result {
            Ok(_) if superseded => {
                tracing::debug!(key = %key, op, "dropping detached result older than cached data");
            }
            Ok(value) => {
                slot.touched_at = now;
                slot.settled_by = Some(op);
                slot.tx.send_modify(|entry| entry.resolve(Arc::new(value), now));
                tracing::debug!(key = %key, op, attached, "fetch resolved");
            }
            Err(error) if superseded || newer_in_flight => {
                tracing::debug!(key = %key, op, error = %error, "dropping failure of detached fetch");
            }
            Err(error) => {
                tracing::warn!(key = %key, op, attached, error = %error, "fetch failed");
                slot.touched_at = now;
                slot.settled_by = Some(op);
                slot.tx.send_modify(|entry| entry.fail(error, now));
            }
        }

        if let Some(eviction) = &self.config.eviction {
            let should_evict = if eviction.frequency <= 0.0 {
                false
            } else if eviction.frequency >= 1.0 {
                true
            } else {
                rand_simple() < eviction.frequency
            };
            if should_evict {
                let evicted = table.evict(eviction, now);
                if evicted > 0 {
                    tracing::trace!(evicted, remaining = table.slots.len(), "evicted cache slots");
                }
            }
        }
    }
}

/// What `ensure` decided to do for a key.
enum Plan {
    /// Serve what is cached, or attach to the running operation.
    Serve,
    /// Move to `Pending` and fetch.
    Fetch,
    /// Keep serving the stale value and fetch in the background.
    Revalidate,
}

/// Process-wide resource cache with request deduplication and
/// stale-while-revalidate freshness.
///
/// `ResourceCache` is a cheap handle; clones share the same table. Operations
/// that start fetches spawn tokio tasks and must run inside a Tokio runtime.
///
/// # Example
/// ```ignore
/// let cache = ResourceCache::builder().ttl_ms(30_000).build()?;
///
/// let mut rick = cache.ensure(&ResourceKey::character(1u64));
/// let entry = rick.settled().await;
/// ```
#[derive(Clone)]
pub struct ResourceCache {
    shared: Arc<Shared>,
}

impl ResourceCache {
    /// Create a cache over `fetcher`. Most callers go through [`ResourceCache::builder`].
    pub fn new(fetcher: Arc<dyn Fetcher>, config: CacheConfig) -> Self {
        ResourceCache {
            shared: Arc::new(Shared {
                fetcher,
                config,
                table: Mutex::new(Table::default()),
            }),
        }
    }

    pub fn builder() -> ResourceCacheBuilder {
        ResourceCacheBuilder::new()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    /// URL a fetch for `key` targets.
    pub fn url_for(&self, key: &ResourceKey) -> Result<Url, FetchError> {
        key.to_url(&self.shared.config.base_url)
    }

    /// Synchronous read of the current state. Never triggers a fetch.
    ///
    /// Unknown keys read as `Idle`.
    pub fn get(&self, key: &ResourceKey) -> CacheEntry {
        let table = self.shared.lock();
        table
            .slots
            .get(key)
            .map(|slot| slot.tx.borrow().clone())
            .unwrap_or_else(|| CacheEntry::idle(key.clone()))
    }

    /// Make sure `key` is loaded or loading and subscribe to its transitions.
    ///
    /// - missing or `Idle`: move to `Pending` and start exactly one fetch
    /// - an operation already attached: join it, no new fetch
    /// - settled within the TTL: serve from cache
    /// - `Resolved` past the TTL: serve the cached value, revalidate in the background
    /// - `Failed` past the TTL: move to `Pending` and retry
    pub fn ensure(&self, key: &ResourceKey) -> Subscription {
        let now = now_ms();
        let ttl_ms = self.shared.config.ttl_ms;

        let (rx, op) = {
            let mut table = self.shared.lock();
            let attached = table.in_flight.contains_key(key);
            let slot = table
                .slots
                .entry(key.clone())
                .or_insert_with(|| Slot::new(key.clone(), now));
            slot.touched_at = now;
            let rx = slot.tx.subscribe();

            let plan = {
                let entry = slot.tx.borrow();
                match entry.status {
                    _ if attached => Plan::Serve,
                    EntryStatus::Idle | EntryStatus::Pending => Plan::Fetch,
                    _ if entry.is_fresh(now, ttl_ms) => Plan::Serve,
                    EntryStatus::Resolved => Plan::Revalidate,
                    EntryStatus::Failed => Plan::Fetch,
                }
            };

            let op = match plan {
                Plan::Serve => None,
                Plan::Fetch => {
                    slot.tx.send_modify(|entry| entry.begin());
                    Some(table.start(key))
                }
                Plan::Revalidate => {
                    tracing::debug!(key = %key, "serving stale entry, revalidating");
                    Some(table.start(key))
                }
            };
            (rx, op)
        };

        if let Some(op) = op {
            self.spawn_fetch(key.clone(), op);
        }

        Subscription {
            key: key.clone(),
            rx,
        }
    }

    /// Mark `key` as `Idle` and detach it from its in-flight operation.
    ///
    /// The outstanding request is not cancelled; the next `ensure` starts a
    /// fresh one. The cached value is kept until a new settlement replaces it.
    pub fn invalidate(&self, key: &ResourceKey) {
        let mut table = self.shared.lock();
        let detached = table.in_flight.remove(key);
        if let Some(slot) = table.slots.get_mut(key) {
            slot.tx.send_modify(|entry| entry.reset());
        }
        tracing::debug!(key = %key, detached = detached.is_some(), "invalidated");
    }

    /// Invalidate and immediately ensure `key` again.
    pub fn refetch(&self, key: &ResourceKey) -> Subscription {
        self.invalidate(key);
        self.ensure(key)
    }

    /// Whether an attached operation is running for `key`.
    pub fn is_in_flight(&self, key: &ResourceKey) -> bool {
        self.shared.lock().in_flight.contains_key(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.shared.lock().in_flight.len()
    }

    /// Number of slots currently held.
    pub fn len(&self) -> usize {
        self.shared.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run an eviction pass now and return how many slots were removed.
    ///
    /// Uses the configured eviction limits, or the defaults when eviction is
    /// disabled in the config.
    pub fn evict_stale(&self) -> usize {
        let config = self.shared.config.eviction.clone().unwrap_or_default();
        self.shared.lock().evict(&config, now_ms())
    }

    fn spawn_fetch(&self, key: ResourceKey, op: u64) {
        let shared = Arc::clone(&self.shared);

        tokio::spawn(async move {
            let result = match key.to_url(&shared.config.base_url) {
                Ok(url) => {
                    tracing::debug!(key = %key, url = %url, op, fetcher = shared.fetcher.name(), "fetch started");
                    AssertUnwindSafe(shared.fetcher.fetch(url.as_str()))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| {
                            Err(FetchError::network(url.as_str(), None, "fetcher panicked"))
                        })
                }
                Err(error) => Err(error),
            };

            // Completion always reaches the shared entry, subscribers or not.
            shared.settle(&key, op, result);
        });
    }
}

/// Live handle on one cache entry.
///
/// Holding a subscription keeps the slot from being evicted.
pub struct Subscription {
    key: ResourceKey,
    rx: watch::Receiver<CacheEntry>,
}

impl Subscription {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Current entry; marks it as seen for `changed`.
    pub fn current(&mut self) -> CacheEntry {
        self.rx.borrow_and_update().clone()
    }

    /// Current entry without marking it as seen.
    pub fn peek(&self) -> CacheEntry {
        self.rx.borrow().clone()
    }

    /// Wait for the next transition. Returns `false` if the slot is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the entry is `Resolved` or `Failed`.
    pub async fn settled(&mut self) -> CacheEntry {
        let settled = self
            .rx
            .wait_for(CacheEntry::is_settled)
            .await
            .map(|entry| entry.clone());
        settled.unwrap_or_else(|_| self.rx.borrow().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fetchers::MemoryFetcher;
    use serde_json::json;
    use std::time::Duration;

    const BASE: &str = "https://api.test";

    fn cache_with(fetcher: Arc<MemoryFetcher>, ttl_ms: i64) -> ResourceCache {
        let config = CacheConfig {
            base_url: BASE.to_string(),
            ttl_ms,
            eviction: None,
            ..CacheConfig::default()
        };
        ResourceCache::new(fetcher, config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_ensure_issues_one_fetch() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::from_millis(100)));
        fetcher.insert(format!("{}/character/1", BASE), json!({"name": "Rick"}));
        let cache = cache_with(fetcher.clone(), 60_000);
        let key = ResourceKey::character(1u64);

        let mut subs: Vec<Subscription> = (0..10).map(|_| cache.ensure(&key)).collect();
        assert_eq!(cache.get(&key).status, EntryStatus::Pending);
        assert_eq!(cache.in_flight_count(), 1);

        for sub in subs.iter_mut() {
            let entry = sub.settled().await;
            assert_eq!(entry.status, EntryStatus::Resolved);
            assert_eq!(entry.value.as_deref(), Some(&json!({"name": "Rick"})));
        }

        let url = format!("{}/character/1", BASE);
        assert_eq!(fetcher.calls(&url), 1);
        assert_eq!(fetcher.max_in_flight(&url), 1);
        assert!(!cache.is_in_flight(&key));
    }

    #[tokio::test]
    async fn test_get_never_fetches() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::ZERO));
        let cache = cache_with(fetcher.clone(), 60_000);

        let entry = cache.get(&ResourceKey::character(1u64));
        assert_eq!(entry.status, EntryStatus::Idle);
        assert!(entry.value.is_none() && entry.error.is_none());
        assert_eq!(fetcher.total_calls(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_fresh_entry_is_served_without_fetch() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::ZERO));
        fetcher.insert(format!("{}/episode/1", BASE), json!({"name": "Pilot"}));
        let cache = cache_with(fetcher.clone(), 60_000);
        let key = ResourceKey::episode(1u64);

        cache.ensure(&key).settled().await;
        let mut again = cache.ensure(&key);
        assert_eq!(again.current().status, EntryStatus::Resolved);
        assert!(!cache.is_in_flight(&key));
        assert_eq!(fetcher.total_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_served_while_revalidating() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::from_millis(20)));
        let url = format!("{}/location/3", BASE);
        fetcher.insert(&url, json!({"name": "Earth"}));
        // ttl of zero makes every settled entry stale immediately
        let cache = cache_with(fetcher.clone(), 0);
        let key = ResourceKey::location(3u64);

        cache.ensure(&key).settled().await;
        fetcher.insert(&url, json!({"name": "Earth (Replacement Dimension)"}));

        let mut sub = cache.ensure(&key);
        let served = sub.current();
        assert_eq!(served.status, EntryStatus::Resolved);
        assert_eq!(served.value.as_deref(), Some(&json!({"name": "Earth"})));
        assert!(cache.is_in_flight(&key));

        // a second stale read attaches to the running revalidation
        let _other = cache.ensure(&key);
        assert!(sub.changed().await);
        let revalidated = sub.current();
        assert_eq!(
            revalidated.value.as_deref(),
            Some(&json!({"name": "Earth (Replacement Dimension)"}))
        );
        assert_eq!(fetcher.calls(&url), 2);
    }

    #[tokio::test]
    async fn test_failure_is_captured_and_keeps_last_value() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::ZERO));
        let url = format!("{}/character/2", BASE);
        fetcher.insert(&url, json!({"name": "Morty"}));
        let cache = cache_with(fetcher.clone(), 0);
        let key = ResourceKey::character(2u64);

        let first = cache.ensure(&key).settled().await;
        assert_eq!(first.status, EntryStatus::Resolved);

        fetcher.fail(&url, FetchError::network(&url, Some(502), "bad gateway"));
        let mut sub = cache.ensure(&key);
        let failed = loop {
            let entry = sub.current();
            if entry.status == EntryStatus::Failed {
                break entry;
            }
            assert!(sub.changed().await);
        };
        assert_eq!(failed.error.as_ref().map(|e| e.kind()), Some(ErrorKind::Network));
        assert_eq!(failed.value.as_deref(), Some(&json!({"name": "Morty"})));
    }

    #[tokio::test]
    async fn test_failed_entry_within_ttl_is_not_retried() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::ZERO));
        let cache = cache_with(fetcher.clone(), 60_000);
        let key = ResourceKey::character(404u64);

        let entry = cache.ensure(&key).settled().await;
        assert_eq!(entry.status, EntryStatus::Failed);
        assert_eq!(entry.error.map(|e| e.kind()), Some(ErrorKind::NotFound));

        let entry = cache.ensure(&key).current();
        assert_eq!(entry.status, EntryStatus::Failed);
        assert_eq!(fetcher.total_calls(), 1);

        // explicit refetch retries
        let entry = cache.refetch(&key).settled().await;
        assert_eq!(entry.status, EntryStatus::Failed);
        assert_eq!(fetcher.total_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_without_subscribers_updates_entry() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::from_millis(50)));
        fetcher.insert(format!("{}/episode/2", BASE), json!({"name": "Lawnmower Dog"}));
        let cache = cache_with(fetcher.clone(), 60_000);
        let key = ResourceKey::episode(2u64);

        drop(cache.ensure(&key));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let entry = cache.get(&key);
        assert_eq!(entry.status, EntryStatus::Resolved);
        assert!(entry.fetched_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_detaches_and_commits_useful_result() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::from_millis(50)));
        fetcher.insert(format!("{}/character/1", BASE), json!({"name": "Rick"}));
        let cache = cache_with(fetcher.clone(), 60_000);
        let key = ResourceKey::character(1u64);

        let _sub = cache.ensure(&key);
        cache.invalidate(&key);
        assert_eq!(cache.get(&key).status, EntryStatus::Idle);
        assert!(!cache.is_in_flight(&key));

        tokio::time::sleep(Duration::from_millis(100)).await;
        let entry = cache.get(&key);
        assert_eq!(entry.status, EntryStatus::Resolved);
        assert_eq!(entry.value.as_deref(), Some(&json!({"name": "Rick"})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_result_never_overwrites_newer_data() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::ZERO));
        let url = format!("{}/character/1", BASE);
        fetcher.insert_with_latency(&url, json!({"name": "old"}), Duration::from_millis(100));
        let cache = cache_with(fetcher.clone(), 60_000);
        let key = ResourceKey::character(1u64);

        let _first = cache.ensure(&key);
        cache.invalidate(&key);

        fetcher.insert_with_latency(&url, json!({"name": "new"}), Duration::from_millis(10));
        let entry = cache.ensure(&key).settled().await;
        assert_eq!(entry.value.as_deref(), Some(&json!({"name": "new"})));

        tokio::time::sleep(Duration::from_millis(200)).await;
        let entry = cache.get(&key);
        assert_eq!(entry.status, EntryStatus::Resolved);
        assert_eq!(entry.value.as_deref(), Some(&json!({"name": "new"})));
        assert_eq!(fetcher.calls(&url), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_failure_settles_and_keeps_value() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::ZERO));
        let url = format!("{}/character/9", BASE);
        fetcher.insert(&url, json!({"name": "Squanchy"}));
        let cache = cache_with(fetcher.clone(), 60_000);
        let key = ResourceKey::character(9u64);
        cache.ensure(&key).settled().await;

        fetcher.fail_with_latency(
            &url,
            FetchError::network(&url, None, "connection reset"),
            Duration::from_millis(50),
        );
        let mut sub = cache.refetch(&key);
        cache.invalidate(&key);
        assert_eq!(sub.current().status, EntryStatus::Idle);

        let entry = tokio::time::timeout(Duration::from_secs(5), sub.settled())
            .await
            .expect("detached failure should settle the entry");
        assert_eq!(entry.status, EntryStatus::Failed);
        assert_eq!(entry.error.as_ref().map(|e| e.kind()), Some(ErrorKind::Network));
        assert_eq!(entry.value.as_deref(), Some(&json!({"name": "Squanchy"})));
        assert!(!cache.is_in_flight(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_failure_yields_to_newer_fetch() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::ZERO));
        let url = format!("{}/character/9", BASE);
        fetcher.fail_with_latency(
            &url,
            FetchError::network(&url, None, "connection reset"),
            Duration::from_millis(50),
        );
        let cache = cache_with(fetcher.clone(), 60_000);
        let key = ResourceKey::character(9u64);

        let _first = cache.ensure(&key);
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.invalidate(&key);
        fetcher.insert_with_latency(&url, json!({"name": "Squanchy"}), Duration::from_millis(100));
        let mut second = cache.ensure(&key);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let entry = cache.get(&key);
        assert_eq!(entry.status, EntryStatus::Pending);
        assert!(entry.error.is_none());

        let entry = second.settled().await;
        assert_eq!(entry.status, EntryStatus::Resolved);
        assert_eq!(entry.value.as_deref(), Some(&json!({"name": "Squanchy"})));
        assert_eq!(fetcher.calls(&url), 2);
    }

    #[tokio::test]
    async fn test_evict_skips_observed_slots() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::ZERO));
        for id in 1..=3u64 {
            fetcher.insert(format!("{}/episode/{}", BASE, id), json!({"id": id}));
        }
        let config = CacheConfig {
            base_url: BASE.to_string(),
            eviction: Some(EvictionConfig {
                frequency: 0.0,
                max_entries: 10,
                max_age_ms: 0,
            }),
            ..CacheConfig::default()
        };
        let cache = ResourceCache::new(fetcher, config);

        let mut kept = cache.ensure(&ResourceKey::episode(1u64));
        kept.settled().await;
        cache.ensure(&ResourceKey::episode(2u64)).settled().await;
        cache.ensure(&ResourceKey::episode(3u64)).settled().await;
        assert_eq!(cache.len(), 3);

        assert_eq!(cache.evict_stale(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(&ResourceKey::episode(1u64)).status,
            EntryStatus::Resolved
        );
        assert_eq!(
            cache.get(&ResourceKey::episode(2u64)).status,
            EntryStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_evict_over_capacity_keeps_newest() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::ZERO));
        for id in 1..=3u64 {
            fetcher.insert(format!("{}/episode/{}", BASE, id), json!({"id": id}));
        }
        let config = CacheConfig {
            base_url: BASE.to_string(),
            eviction: Some(EvictionConfig {
                frequency: 0.0,
                max_entries: 1,
                max_age_ms: i64::MAX,
            }),
            ..CacheConfig::default()
        };
        let cache = ResourceCache::new(fetcher, config);

        for id in 1..=3u64 {
            cache.ensure(&ResourceKey::episode(id)).settled().await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(cache.len(), 3);

        assert_eq!(cache.evict_stale(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(&ResourceKey::episode(3u64)).status,
            EntryStatus::Resolved
        );
    }

    #[tokio::test]
    async fn test_settlement_evicts_when_frequency_is_one() {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::ZERO));
        for id in 1..=2u64 {
            fetcher.insert(format!("{}/episode/{}", BASE, id), json!({"id": id}));
        }
        let config = CacheConfig {
            base_url: BASE.to_string(),
            eviction: Some(EvictionConfig {
                frequency: 1.0,
                max_entries: 10,
                max_age_ms: 0,
            }),
            ..CacheConfig::default()
        };
        let cache = ResourceCache::new(fetcher, config);

        cache.ensure(&ResourceKey::episode(1u64)).settled().await;
        assert_eq!(cache.len(), 1);

        let mut kept = cache.ensure(&ResourceKey::episode(2u64));
        kept.settled().await;
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(&ResourceKey::episode(1u64)).status,
            EntryStatus::Idle
        );
        assert_eq!(kept.current().status, EntryStatus::Resolved);
    }
}
