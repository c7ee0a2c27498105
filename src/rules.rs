//! Reference-field declarations: which secondary resources a primary entity
//! points at, and how to find them in its payload.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::key::{ResourceKey, ResourceKind};

/// Result of running an extractor over a primary payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Nothing to fetch for this field on this entity. Not an error.
    Absent,
    One(ResourceKey),
    /// Ordered; the composed value keeps this order.
    Many(Vec<ResourceKey>),
}

impl Reference {
    /// Every key this reference needs, in order, duplicates included.
    pub fn keys(&self) -> &[ResourceKey] {
        match self {
            Reference::Absent => &[],
            Reference::One(key) => std::slice::from_ref(key),
            Reference::Many(keys) => keys,
        }
    }
}

type Extractor = dyn Fn(&Value) -> Reference + Send + Sync;

/// A declared reference field: an extractor from primary payload to keys.
#[derive(Clone)]
pub struct ReferenceField {
    extract: Arc<Extractor>,
}

impl ReferenceField {
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&Value) -> Reference + Send + Sync + 'static,
    {
        ReferenceField {
            extract: Arc::new(extract),
        }
    }

    /// A single URL found at a JSON pointer, e.g. `/location/url`.
    ///
    /// Missing, null, non-string or empty values extract to `Absent`.
    pub fn url_at(pointer: &'static str) -> Self {
        ReferenceField::new(move |primary| match primary.pointer(pointer) {
            Some(Value::String(url)) if !url.is_empty() => {
                Reference::One(ResourceKey::url(url.clone()))
            }
            _ => Reference::Absent,
        })
    }

    /// An array of URLs found at a JSON pointer, e.g. `/episode`.
    ///
    /// Missing or null extracts to `Absent`; an empty array to an empty
    /// `Many`. Empty or non-string items are skipped.
    pub fn urls_at(pointer: &'static str) -> Self {
        ReferenceField::new(move |primary| match primary.pointer(pointer) {
            Some(Value::Array(items)) => Reference::Many(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|url| !url.is_empty())
                    .map(ResourceKey::url)
                    .collect(),
            ),
            _ => Reference::Absent,
        })
    }

    /// Extract from a typed model. A payload that does not decode as `T`
    /// extracts to `Absent`.
    pub fn typed<T, F>(extract: F) -> Self
    where
        T: DeserializeOwned,
        F: Fn(&T) -> Reference + Send + Sync + 'static,
    {
        ReferenceField::new(move |primary| match T::deserialize(primary) {
            Ok(model) => extract(&model),
            Err(e) => {
                tracing::debug!(error = %e, "primary payload does not match reference model");
                Reference::Absent
            }
        })
    }

    pub fn extract(&self, primary: &Value) -> Reference {
        (self.extract)(primary)
    }
}

impl fmt::Debug for ReferenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReferenceField(..)")
    }
}

/// Reference fields declared per primary entity kind.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRules {
    kinds: HashMap<ResourceKind, BTreeMap<String, ReferenceField>>,
}

impl ReferenceRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fields the character detail view composes: its current location and
    /// the episodes it appears in.
    pub fn standard() -> Self {
        ReferenceRules::new()
            .with(
                ResourceKind::Character,
                "location",
                ReferenceField::url_at("/location/url"),
            )
            .with(
                ResourceKind::Character,
                "episode",
                ReferenceField::urls_at("/episode"),
            )
    }

    /// Declare `field` for entities of `kind`, replacing a previous declaration.
    pub fn with(mut self, kind: ResourceKind, field: impl Into<String>, rule: ReferenceField) -> Self {
        self.kinds.entry(kind).or_default().insert(field.into(), rule);
        self
    }

    /// Fields declared for the kind of `key`. URL keys carry no kind and so
    /// declare nothing.
    pub fn fields_for(&self, key: &ResourceKey) -> Option<&BTreeMap<String, ReferenceField>> {
        key.kind().and_then(|kind| self.kinds.get(&kind))
    }

    /// Run every declared extractor for `key` over `primary`.
    pub fn derive(&self, key: &ResourceKey, primary: &Value) -> BTreeMap<String, Reference> {
        self.fields_for(key)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(name, field)| (name.clone(), field.extract(primary)))
                    .collect()
            })
            .unwrap_or_default()
    }
}
