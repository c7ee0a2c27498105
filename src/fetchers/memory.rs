use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::FetchError;
use crate::fetcher::Fetcher;

#[derive(Clone)]
struct Route {
    response: Result<Value, FetchError>,
    latency: Option<Duration>,
}

#[derive(Default)]
struct Gauges {
    calls: HashMap<String, usize>,
    in_flight: HashMap<String, usize>,
    max_in_flight: HashMap<String, usize>,
}

/// In-process origin serving canned responses by URL.
///
/// Useful as a fake API in tests, demos and benchmarks. It records how often
/// each URL was fetched and the highest number of concurrent fetches observed
/// per URL. Unknown URLs answer with `FetchError::NotFound`.
pub struct MemoryFetcher {
    routes: Mutex<HashMap<String, Route>>,
    latency: Duration,
    gauges: Mutex<Gauges>,
    total_calls: AtomicUsize,
}

impl MemoryFetcher {
    /// Create an empty fetcher whose responses settle after `latency`.
    pub fn new(latency: Duration) -> Self {
        MemoryFetcher {
            routes: Mutex::new(HashMap::new()),
            latency,
            gauges: Mutex::new(Gauges::default()),
            total_calls: AtomicUsize::new(0),
        }
    }

    /// Serve `value` for `url`, replacing any previous route.
    pub fn insert(&self, url: impl Into<String>, value: Value) {
        self.route(url.into(), Ok(value), None);
    }

    /// Serve `value` for `url` after a route-specific latency.
    pub fn insert_with_latency(&self, url: impl Into<String>, value: Value, latency: Duration) {
        self.route(url.into(), Ok(value), Some(latency));
    }

    /// Fail every fetch of `url` with `error`.
    pub fn fail(&self, url: impl Into<String>, error: FetchError) {
        self.route(url.into(), Err(error), None);
    }

    /// Fail fetches of `url` with `error` after a route-specific latency.
    pub fn fail_with_latency(&self, url: impl Into<String>, error: FetchError, latency: Duration) {
        self.route(url.into(), Err(error), Some(latency));
    }

    pub fn remove(&self, url: &str) {
        lock(&self.routes).remove(url);
    }

    /// Number of fetches issued for `url`.
    pub fn calls(&self, url: &str) -> usize {
        lock(&self.gauges).calls.get(url).copied().unwrap_or(0)
    }

    /// Number of fetches issued for any url.
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous fetches seen for `url`.
    pub fn max_in_flight(&self, url: &str) -> usize {
        lock(&self.gauges).max_in_flight.get(url).copied().unwrap_or(0)
    }

    pub fn reset_counts(&self) {
        *lock(&self.gauges) = Gauges::default();
        self.total_calls.store(0, Ordering::SeqCst);
    }

    fn route(&self, url: String, response: Result<Value, FetchError>, latency: Option<Duration>) {
        lock(&self.routes).insert(url, Route { response, latency });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut gauges = lock(&self.gauges);
            *gauges.calls.entry(url.to_string()).or_default() += 1;
            let current = {
                let in_flight = gauges.in_flight.entry(url.to_string()).or_default();
                *in_flight += 1;
                *in_flight
            };
            let max = gauges.max_in_flight.entry(url.to_string()).or_default();
            *max = (*max).max(current);
        }

        // Snapshot the route at request time, like a server answering with the
        // state it had when the request arrived.
        let route = lock(&self.routes).get(url).cloned();
        let latency = route
            .as_ref()
            .and_then(|r| r.latency)
            .unwrap_or(self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if let Some(in_flight) = lock(&self.gauges).in_flight.get_mut(url) {
            *in_flight = in_flight.saturating_sub(1);
        }

        match route {
            Some(route) => route.response,
            None => Err(FetchError::not_found(url)),
        }
    }
}
