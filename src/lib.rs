//! swr-query - A stale-while-revalidate resource cache with dependent queries
//!
//! This library provides:
//! - Keyed caching of remote JSON resources with stale-while-revalidate
//!   semantics and a single TTL
//! - Deduplication of concurrent origin loads (at most one fetch per key)
//! - Dependent query composition: a primary entity plus the secondary
//!   resources its reference fields point at, with per-field status
//! - Typed models and filters for the Rick and Morty API
//!
//! # Example
//!
//! ```ignore
//! use swr_query::{CharacterDetail, Composer, DetailState, ReferenceRules, ResourceCache, ResourceKey};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = ResourceCache::builder()
//!         .base_url("https://rickandmortyapi.com/api")
//!         .ttl_ms(60_000)
//!         .build()?;
//!
//!     let composer = Composer::new(cache, ReferenceRules::standard());
//!     let mut rick = composer.compose_for(ResourceKey::character(1u64));
//!
//!     // Loading -> PartiallyLoaded -> Ready
//!     let view = rick.settled().await;
//!     if let DetailState::Ready(detail) = CharacterDetail::from_view(&view) {
//!         println!("{} lives on {:?}", detail.name, detail.location);
//!     }
//!     Ok(())
//! }
//! ```

mod builder;
mod cache;
mod composer;
mod config;
mod detail;
mod entry;
mod error;
mod fetcher;
pub mod fetchers;
mod filter;
mod key;
mod model;
mod rules;
mod utils;

// Re-export public API
pub use builder::ResourceCacheBuilder;
pub use cache::{ResourceCache, Subscription};
pub use composer::{
    ComposedSubscription, ComposedView, Composer, FieldEntry, FieldStatus, SequenceEntry,
    ViewState,
};
pub use config::{CacheConfig, DEFAULT_BASE_URL, EvictionConfig};
pub use detail::{CharacterDetail, DetailState, LocationSummary};
pub use entry::{CacheEntry, EntryStatus, Resource};
pub use error::{ConfigError, ErrorKind, FetchError};
pub use fetcher::Fetcher;
pub use fetchers::{HttpFetcher, MemoryFetcher};
pub use filter::{CharacterFilter, Gender, Species, Status};
pub use key::{Identifier, ResourceKey, ResourceKind};
pub use model::{Character, Episode, Location, NamedLink, Page, PageInfo};
pub use rules::{Reference, ReferenceField, ReferenceRules};
