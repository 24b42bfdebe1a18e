//! This module defines the core data structures and types used across the catalog indexer.
//! It re-exports the entity kind registry and the index document types.

pub mod catalog_document;
pub mod entity_kind;

pub use catalog_document::{
    CatalogDocument, GenreDocument, MovieDocument, PersonDocument, RelatedEntity,
};
pub use entity_kind::EntityKind;
