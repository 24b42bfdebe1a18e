//! The closed set of replicated entity kinds.
//!
//! Every per-kind decision in the pipeline (which query to run, which index to
//! write, which watermark key to advance) is a lookup on [`EntityKind`] rather
//! than a separate implementation per kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the content types replicated from the catalog database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Movie,
    Genre,
    Person,
}

impl EntityKind {
    /// All kinds, in the order a run cycle processes them.
    pub const ALL: [EntityKind; 3] = [EntityKind::Movie, EntityKind::Genre, EntityKind::Person];

    /// Name of the search index holding documents of this kind.
    pub fn index_name(&self) -> &'static str {
        match self {
            EntityKind::Movie => "movies",
            EntityKind::Genre => "genres",
            EntityKind::Person => "persons",
        }
    }

    /// Key under which the watermark for this kind is stored.
    ///
    /// Keys are distinct per kind, so kinds never contend on watermark state.
    pub fn watermark_key(&self) -> &'static str {
        self.index_name()
    }

    /// Short lowercase name used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Movie => "movie",
            EntityKind::Genre => "genre",
            EntityKind::Person => "person",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown entity kind: {0}")]
pub struct ParseEntityKindError(pub String);

impl FromStr for EntityKind {
    type Err = ParseEntityKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "movies" => Ok(EntityKind::Movie),
            "genre" | "genres" => Ok(EntityKind::Genre),
            "person" | "persons" => Ok(EntityKind::Person),
            other => Err(ParseEntityKindError(other.to_string())),
        }
    }
}
