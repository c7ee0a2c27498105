//! Render-ready projection of a composed character view.

use serde::Serialize;

use crate::composer::{ComposedView, ViewState};
use crate::model::{Character, Episode, Location};

/// What the character detail screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum DetailState {
    Loading,
    Error(String),
    Ready(CharacterDetail),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationSummary {
    pub name: String,
    pub dimension: String,
    pub resident_count: usize,
}

impl From<Location> for LocationSummary {
    fn from(location: Location) -> Self {
        LocationSummary {
            name: location.name,
            dimension: location.dimension,
            resident_count: location.residents.len(),
        }
    }
}

/// A character with its location and episodes resolved as far as they are.
///
/// Secondary failures stay scoped to their field: a failed episode fetch sets
/// `episode_error` and leaves the rest of the detail intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterDetail {
    pub name: String,
    pub status: String,
    pub species: String,
    pub gender: String,
    pub image: String,
    pub origin: String,
    pub location_name: String,
    /// Fetched current location, once resolved.
    pub location: Option<LocationSummary>,
    /// Episode names in airing order; empty until every episode resolved.
    pub episode_names: Vec<String>,
    pub location_error: Option<String>,
    pub episode_error: Option<String>,
}

impl CharacterDetail {
    /// Project a view composed with the standard reference rules.
    ///
    /// A primary that still holds a value while revalidating is shown as
    /// `Ready`; only a view with no character payload at all is `Loading`.
    pub fn from_view(view: &ComposedView) -> DetailState {
        if view.state() == ViewState::PrimaryError {
            let message = view
                .primary
                .error
                .as_ref()
                .map(|e| e.message())
                .unwrap_or_else(|| "failed to load character".to_string());
            return DetailState::Error(message);
        }

        let character = match view.primary_as::<Character>() {
            Ok(Some(character)) => character,
            Ok(None) => return DetailState::Loading,
            Err(e) => return DetailState::Error(e.message()),
        };

        let field_error = |name: &str| view.field(name).and_then(|f| f.error()).map(|e| e.message());

        let mut location_error = field_error("location");
        let location = match view.single_as::<Location>("location") {
            Ok(location) => location.map(LocationSummary::from),
            Err(e) => {
                location_error.get_or_insert(e.message());
                None
            }
        };

        let mut episode_error = field_error("episode");
        let episode_names = match view.sequence_as::<Episode>("episode") {
            Ok(episodes) => episodes
                .unwrap_or_default()
                .into_iter()
                .map(|episode| episode.name)
                .collect(),
            Err(e) => {
                episode_error.get_or_insert(e.message());
                Vec::new()
            }
        };

        DetailState::Ready(CharacterDetail {
            name: character.name,
            status: character.status,
            species: character.species,
            gender: character.gender,
            image: character.image,
            origin: character.origin.name,
            location_name: character.location.name,
            location,
            episode_names,
            location_error,
            episode_error,
        })
    }
}
