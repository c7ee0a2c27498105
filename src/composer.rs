//! Dependent query composition.
//!
//! A composed view follows one primary entry and, once it resolves, the
//! secondary entries its reference fields point at. Secondary fetches go
//! through the same `ResourceCache`, so they share its deduplication and
//! freshness rules.

use futures::FutureExt;
use futures::future::{BoxFuture, select_all};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;

use crate::cache::{ResourceCache, Subscription};
use crate::entry::{CacheEntry, EntryStatus, Resource, decode_resource};
use crate::error::FetchError;
use crate::key::ResourceKey;
use crate::rules::{Reference, ReferenceRules};

/// Status of one reference field in a composed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldStatus {
    /// The primary does not reference anything for this field.
    Absent,
    Pending,
    Resolved,
    Failed,
}

/// Overall state of a composed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewState {
    /// The primary has not settled yet.
    Loading,
    /// The primary failed; no secondary data is derived.
    PrimaryError,
    /// The primary resolved and at least one field is still pending.
    PartiallyLoaded,
    /// The primary resolved and every field has settled or is absent. Failed
    /// fields are reported per field.
    Ready,
}

/// Folded state of a sequence-valued reference field.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEntry {
    /// Referenced keys in reference order.
    pub keys: Vec<ResourceKey>,
    /// `Failed` if any key failed, else `Pending` until every key resolved.
    pub status: EntryStatus,
    /// Resolved values in the order of `keys`.
    pub value: Option<Vec<Resource>>,
    /// Error of the first failed key in reference order.
    pub error: Option<FetchError>,
}

impl SequenceEntry {
    fn fold<F>(keys: Vec<ResourceKey>, lookup: F) -> Self
    where
        F: Fn(&ResourceKey) -> CacheEntry,
    {
        let mut values = Vec::with_capacity(keys.len());
        let mut unsettled = false;
        let mut error = None;

        for key in &keys {
            let entry = lookup(key);
            match (entry.status, entry.value) {
                (EntryStatus::Failed, _) => {
                    error = entry.error;
                    break;
                }
                (EntryStatus::Resolved, Some(value)) => values.push(value),
                _ => unsettled = true,
            }
        }

        let (status, value) = if error.is_some() {
            (EntryStatus::Failed, None)
        } else if unsettled {
            (EntryStatus::Pending, None)
        } else {
            (EntryStatus::Resolved, Some(values))
        };

        SequenceEntry {
            keys,
            status,
            value,
            error,
        }
    }
}

/// Composed state of one reference field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEntry {
    Absent,
    Single(CacheEntry),
    Sequence(SequenceEntry),
}

impl FieldEntry {
    pub fn status(&self) -> FieldStatus {
        let status = match self {
            FieldEntry::Absent => return FieldStatus::Absent,
            FieldEntry::Single(entry) => entry.status,
            FieldEntry::Sequence(entry) => entry.status,
        };
        match status {
            EntryStatus::Resolved => FieldStatus::Resolved,
            EntryStatus::Failed => FieldStatus::Failed,
            EntryStatus::Idle | EntryStatus::Pending => FieldStatus::Pending,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FieldEntry::Absent => None,
            FieldEntry::Single(entry) => entry.error.as_ref(),
            FieldEntry::Sequence(entry) => entry.error.as_ref(),
        }
    }
}

/// What a consumer observes for one primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedView {
    pub key: ResourceKey,
    pub primary: CacheEntry,
    /// One entry per declared reference field, keyed by field name.
    pub secondary: BTreeMap<String, FieldEntry>,
}

impl ComposedView {
    fn build<F>(
        key: ResourceKey,
        primary: CacheEntry,
        derived: &BTreeMap<String, Reference>,
        lookup: F,
    ) -> Self
    where
        F: Fn(&ResourceKey) -> CacheEntry,
    {
        let secondary = derived
            .iter()
            .map(|(name, reference)| {
                let field = match reference {
                    Reference::Absent => FieldEntry::Absent,
                    Reference::One(key) => FieldEntry::Single(lookup(key)),
                    Reference::Many(keys) => {
                        FieldEntry::Sequence(SequenceEntry::fold(keys.clone(), &lookup))
                    }
                };
                (name.clone(), field)
            })
            .collect();

        ComposedView {
            key,
            primary,
            secondary,
        }
    }

    pub fn state(&self) -> ViewState {
        match self.primary.status {
            EntryStatus::Failed => ViewState::PrimaryError,
            EntryStatus::Idle | EntryStatus::Pending => ViewState::Loading,
            EntryStatus::Resolved => {
                let pending = self
                    .secondary
                    .values()
                    .any(|field| field.status() == FieldStatus::Pending);
                if pending {
                    ViewState::PartiallyLoaded
                } else {
                    ViewState::Ready
                }
            }
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldEntry> {
        self.secondary.get(name)
    }

    pub fn field_status(&self, name: &str) -> Option<FieldStatus> {
        self.field(name).map(FieldEntry::status)
    }

    /// Whether any reference field failed.
    pub fn has_field_errors(&self) -> bool {
        self.secondary
            .values()
            .any(|field| field.status() == FieldStatus::Failed)
    }

    pub fn primary_as<T>(&self) -> Result<Option<T>, FetchError>
    where
        T: DeserializeOwned,
    {
        self.primary.decode()
    }

    /// Decode a single-valued field. `Ok(None)` unless the field holds a value.
    pub fn single_as<T>(&self, name: &str) -> Result<Option<T>, FetchError>
    where
        T: DeserializeOwned,
    {
        match self.field(name) {
            Some(FieldEntry::Single(entry)) => entry.decode(),
            _ => Ok(None),
        }
    }

    /// Decode a resolved sequence field, keeping reference order.
    pub fn sequence_as<T>(&self, name: &str) -> Result<Option<Vec<T>>, FetchError>
    where
        T: DeserializeOwned,
    {
        let Some(FieldEntry::Sequence(entry)) = self.field(name) else {
            return Ok(None);
        };
        let Some(values) = &entry.value else {
            return Ok(None);
        };
        entry
            .keys
            .iter()
            .zip(values)
            .map(|(key, value)| decode_resource(&key.to_string(), value))
            .collect::<Result<Vec<T>, _>>()
            .map(Some)
    }
}

/// Composes primary entities with the secondary resources they reference.
#[derive(Clone)]
pub struct Composer {
    cache: ResourceCache,
    rules: Arc<ReferenceRules>,
}

impl Composer {
    pub fn new(cache: ResourceCache, rules: ReferenceRules) -> Self {
        Composer {
            cache,
            rules: Arc::new(rules),
        }
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn rules(&self) -> &ReferenceRules {
        &self.rules
    }

    /// Start following `key` and everything it references.
    ///
    /// The primary is ensured immediately. A background task keeps the view
    /// current until the last clone of the returned subscription is dropped.
    pub fn compose_for(&self, key: ResourceKey) -> ComposedSubscription {
        let mut driver = Driver::new(self.cache.clone(), Arc::clone(&self.rules), key);
        let (tx, rx) = watch::channel(driver.step());
        tokio::spawn(driver.run(tx));
        ComposedSubscription { rx }
    }

    /// Compute the view for `key` from what is cached right now, without
    /// issuing any fetch.
    pub fn snapshot(&self, key: &ResourceKey) -> ComposedView {
        let primary = self.cache.get(key);
        let derived = match (&primary.status, &primary.value) {
            (EntryStatus::Resolved, Some(value)) => self.rules.derive(key, value),
            _ => BTreeMap::new(),
        };
        ComposedView::build(key.clone(), primary, &derived, |k| self.cache.get(k))
    }
}

/// Owns the subscriptions behind one composed view.
struct Driver {
    cache: ResourceCache,
    rules: Arc<ReferenceRules>,
    key: ResourceKey,
    primary: Subscription,
    /// Last derivation from a resolved primary.
    derived: BTreeMap<String, Reference>,
    secondaries: HashMap<ResourceKey, Subscription>,
    /// Primary payload `derived` was computed from. Every settlement stores a
    /// new allocation, so pointer identity tells settlements apart.
    derived_from: Option<Resource>,
}

impl Driver {
    fn new(cache: ResourceCache, rules: Arc<ReferenceRules>, key: ResourceKey) -> Self {
        let primary = cache.ensure(&key);
        Driver {
            cache,
            rules,
            key,
            primary,
            derived: BTreeMap::new(),
            secondaries: HashMap::new(),
            derived_from: None,
        }
    }

    /// Bring subscriptions in line with the current primary and build the view.
    fn step(&mut self) -> ComposedView {
        let mut primary = self.primary.current();
        if primary.status == EntryStatus::Idle {
            self.primary = self.cache.ensure(&self.key);
            primary = self.primary.current();
        }

        match (&primary.status, &primary.value) {
            (EntryStatus::Resolved, Some(value)) => {
                let settled_again = !self
                    .derived_from
                    .as_ref()
                    .is_some_and(|from| Arc::ptr_eq(from, value));
                let derived = self.rules.derive(&self.key, value);
                if settled_again || derived != self.derived {
                    self.resubscribe(&derived, settled_again);
                    self.derived = derived;
                    self.derived_from = Some(Arc::clone(value));
                }
            }
            (EntryStatus::Failed, _) => {
                self.derived.clear();
                self.secondaries.clear();
                self.derived_from = None;
            }
            _ => {}
        }

        // no secondary fetch while the primary is unsettled
        if primary.status == EntryStatus::Resolved {
            for (key, sub) in self.secondaries.iter_mut() {
                if sub.peek().status == EntryStatus::Idle {
                    *sub = self.cache.ensure(key);
                }
            }
        }

        let seen: HashMap<ResourceKey, CacheEntry> = self
            .secondaries
            .iter_mut()
            .map(|(key, sub)| (key.clone(), sub.current()))
            .collect();

        ComposedView::build(self.key.clone(), primary, &self.derived, |key| {
            seen.get(key)
                .cloned()
                .unwrap_or_else(|| self.cache.get(key))
        })
    }

    /// Drop subscriptions no longer referenced and ensure the new ones. After a
    /// fresh primary settlement every referenced key is ensured again, so stale
    /// secondaries revalidate along with it.
    fn resubscribe(&mut self, derived: &BTreeMap<String, Reference>, refresh: bool) {
        let wanted: HashSet<&ResourceKey> = derived.values().flat_map(Reference::keys).collect();
        let before = self.secondaries.len();
        self.secondaries.retain(|key, _| wanted.contains(key));
        let dropped = before - self.secondaries.len();

        for key in wanted {
            if refresh || !self.secondaries.contains_key(key) {
                self.secondaries.insert(key.clone(), self.cache.ensure(key));
            }
        }

        tracing::debug!(
            key = %self.key,
            fields = derived.len(),
            secondaries = self.secondaries.len(),
            dropped,
            "derived secondary references"
        );
    }

    async fn run(mut self, tx: watch::Sender<ComposedView>) {
        loop {
            let alive = {
                let mut waits: Vec<BoxFuture<'_, bool>> =
                    Vec::with_capacity(self.secondaries.len() + 1);
                waits.push(self.primary.changed().boxed());
                for sub in self.secondaries.values_mut() {
                    waits.push(sub.changed().boxed());
                }

                tokio::select! {
                    _ = tx.closed() => {
                        tracing::trace!(key = %self.key, "composed view dropped");
                        return;
                    }
                    (alive, _, _) = select_all(waits) => alive,
                }
            };
            if !alive {
                tracing::debug!(key = %self.key, "cache slot closed, stopping composition");
                return;
            }

            let view = self.step();
            tx.send_if_modified(|current| {
                if *current == view {
                    return false;
                }
                *current = view;
                true
            });
        }
    }
}

/// Reactive handle on a composed view. Clones share the same view; the
/// composition stops once every clone is dropped.
#[derive(Clone)]
pub struct ComposedSubscription {
    rx: watch::Receiver<ComposedView>,
}

impl ComposedSubscription {
    /// Current view; marks it as seen for `changed`.
    pub fn current(&mut self) -> ComposedView {
        self.rx.borrow_and_update().clone()
    }

    pub fn peek(&self) -> ComposedView {
        self.rx.borrow().clone()
    }

    /// Wait for the next view. Returns `false` if composition stopped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the view satisfies `predicate`.
    pub async fn wait_for<F>(&mut self, predicate: F) -> ComposedView
    where
        F: FnMut(&ComposedView) -> bool,
    {
        let view = self
            .rx
            .wait_for(predicate)
            .await
            .map(|view| view.clone());
        view.unwrap_or_else(|_| self.rx.borrow().clone())
    }

    /// Wait until nothing is pending: `Ready` or `PrimaryError`.
    pub async fn settled(&mut self) -> ComposedView {
        self.wait_for(|view| matches!(view.state(), ViewState::Ready | ViewState::PrimaryError))
            .await
    }
}
