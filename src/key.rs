//! Resource identities used to index the cache.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::FetchError;
use crate::utils::parse_base_url;

/// The kinds of entity the API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Character,
    Location,
    Episode,
}

impl ResourceKind {
    /// Path segment of this kind below the API root.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Character => "character",
            ResourceKind::Location => "location",
            ResourceKind::Episode => "episode",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of an entity within its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Number(u64),
    Text(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Number(n) => write!(f, "{}", n),
            Identifier::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Identifier {
    fn from(value: u64) -> Self {
        Identifier::Number(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Text(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::Text(value)
    }
}

/// Identifies a fetchable resource.
///
/// Two keys are equal iff their variant and contents match exactly; a URL key
/// never equals an entity key even when both resolve to the same address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKey {
    /// A single entity addressed by kind and identifier.
    Entity { kind: ResourceKind, id: Identifier },
    /// A filtered list of entities of one kind.
    Listing {
        kind: ResourceKind,
        params: BTreeMap<String, String>,
    },
    /// A resource addressed by a reference URL, absolute or relative to the base.
    Url(String),
}

impl ResourceKey {
    pub fn entity(kind: ResourceKind, id: impl Into<Identifier>) -> Self {
        ResourceKey::Entity {
            kind,
            id: id.into(),
        }
    }

    pub fn character(id: impl Into<Identifier>) -> Self {
        Self::entity(ResourceKind::Character, id)
    }

    pub fn location(id: impl Into<Identifier>) -> Self {
        Self::entity(ResourceKind::Location, id)
    }

    pub fn episode(id: impl Into<Identifier>) -> Self {
        Self::entity(ResourceKind::Episode, id)
    }

    pub fn url(url: impl Into<String>) -> Self {
        ResourceKey::Url(url.into())
    }

    pub fn listing<K, V>(kind: ResourceKind, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        ResourceKey::Listing {
            kind,
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The entity kind, if the key carries one. URL keys do not.
    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            ResourceKey::Entity { kind, .. } | ResourceKey::Listing { kind, .. } => Some(*kind),
            ResourceKey::Url(_) => None,
        }
    }

    /// Resolve this key to the URL a fetch should target.
    ///
    /// Entity and listing keys live below the base path. Reference URLs
    /// resolve like links in a document: absolute ones (any scheme case) are
    /// kept, `//host/..` takes the base scheme, `/path` replaces the base path
    /// and `path` extends it.
    pub fn to_url(&self, base_url: &str) -> Result<Url, FetchError> {
        let base = parse_base_url(base_url)
            .ok_or_else(|| FetchError::network(base_url, None, "invalid base url"))?;

        let resolved = match self {
            ResourceKey::Entity { kind, id } => {
                let mut url = base;
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments
                        .pop_if_empty()
                        .push(kind.as_str())
                        .push(&id.to_string());
                }
                Ok(url)
            }
            ResourceKey::Listing { kind, params } => {
                base.join(&format!("{}/", kind.as_str())).map(|mut url| {
                    if !params.is_empty() {
                        let mut query = url.query_pairs_mut();
                        for (k, v) in params {
                            query.append_pair(k, v);
                        }
                    }
                    url
                })
            }
            ResourceKey::Url(url) => base.join(url.trim()),
        };

        // only reference urls come from payloads, so a bad one is a malformed payload
        resolved.map_err(|e| FetchError::decode(self.to_string(), format!("unresolvable url: {}", e)))
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Entity { kind, id } => write!(f, "{}:{}", kind, id),
            ResourceKey::Listing { kind, params } => {
                write!(f, "{}?", kind)?;
                for (i, (k, v)) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str("&")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                Ok(())
            }
            ResourceKey::Url(url) => f.write_str(url),
        }
    }
}
