//! Filters for the character list.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::key::{ResourceKey, ResourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Alive,
    Dead,
    Unknown,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Alive, Status::Dead, Status::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Alive => "Alive",
            Status::Dead => "Dead",
            Status::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    Genderless,
    Unknown,
}

impl Gender {
    pub const ALL: [Gender; 4] = [
        Gender::Female,
        Gender::Male,
        Gender::Genderless,
        Gender::Unknown,
    ];

    /// Query value. The API spells the unknown gender in lowercase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
            Gender::Genderless => "Genderless",
            Gender::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Human,
    Alien,
    Humanoid,
    Poopybutthole,
    MythologicalCreature,
    Unknown,
    Animal,
    Disease,
    Robot,
    Cronenberg,
    Planet,
}

impl Species {
    pub const ALL: [Species; 11] = [
        Species::Human,
        Species::Alien,
        Species::Humanoid,
        Species::Poopybutthole,
        Species::MythologicalCreature,
        Species::Unknown,
        Species::Animal,
        Species::Disease,
        Species::Robot,
        Species::Cronenberg,
        Species::Planet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Human => "Human",
            Species::Alien => "Alien",
            Species::Humanoid => "Humanoid",
            Species::Poopybutthole => "Poopybutthole",
            Species::MythologicalCreature => "Mythological Creature",
            Species::Unknown => "Unknown",
            Species::Animal => "Animal",
            Species::Disease => "Disease",
            Species::Robot => "Robot",
            Species::Cronenberg => "Cronenberg",
            Species::Planet => "Planet",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Status, Gender, Species);

/// Filter for the character list. Unset options are left out of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterFilter {
    pub name: Option<String>,
    pub status: Option<Status>,
    pub gender: Option<Gender>,
    pub species: Option<Species>,
}

impl CharacterFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = (!name.trim().is_empty()).then_some(name);
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn species(mut self, species: Species) -> Self {
        self.species = Some(species);
        self
    }

    /// Query parameters for the set options.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(name) = &self.name {
            params.push(("name", name.clone()));
        }
        if let Some(status) = self.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(gender) = self.gender {
            params.push(("gender", gender.as_str().to_string()));
        }
        if let Some(species) = self.species {
            params.push(("species", species.as_str().to_string()));
        }
        params
    }

    /// Cache key of the filtered character list. Equal filters share a key.
    pub fn to_key(&self) -> ResourceKey {
        ResourceKey::listing(ResourceKind::Character, self.params())
    }
}
