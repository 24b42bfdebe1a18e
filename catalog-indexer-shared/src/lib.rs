//! # Catalog Indexer Shared
//!
//! This crate defines shared data structures and types used across the catalog indexer.
//! It includes the closed set of replicated entity kinds and the documents written
//! into the search index for each of them.

pub mod types;

pub use types::catalog_document::{
    CatalogDocument, GenreDocument, MovieDocument, PersonDocument, RelatedEntity,
};
pub use types::entity_kind::{EntityKind, ParseEntityKindError};
