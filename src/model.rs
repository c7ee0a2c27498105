//! Typed models of the API payloads.
//!
//! Every field defaults when missing so partial payloads still decode; the
//! cache itself stores raw JSON and only the consumer edge decodes.

use serde::{Deserialize, Serialize};

/// A `{ name, url }` pair the API uses for origins and locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Character {
    pub id: u64,
    pub name: String,
    pub status: String,
    pub species: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub gender: String,
    pub origin: NamedLink,
    pub location: NamedLink,
    pub image: String,
    /// Episode URLs in airing order.
    pub episode: Vec<String>,
    pub url: String,
    pub created: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub dimension: String,
    /// Character URLs.
    pub residents: Vec<String>,
    pub url: String,
    pub created: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Episode {
    pub id: u64,
    pub name: String,
    pub air_date: String,
    /// Episode code, e.g. `S01E01`.
    pub episode: String,
    pub characters: Vec<String>,
    pub url: String,
    pub created: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageInfo {
    pub count: u64,
    pub pages: u64,
    pub next: Option<String>,
    pub prev: Option<String>,
}

/// One page of a listing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub info: PageInfo,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}
