//! # Catalog Indexer Repository
//!
//! This crate provides traits and implementations for the three stores the
//! catalog indexer talks to: the PostgreSQL catalog it extracts from, the
//! OpenSearch cluster it loads into, and the Redis instance that keeps the
//! per-kind watermarks.

pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod postgres;
pub mod redis;
pub mod types;

pub use crate::errors::{SearchIndexError, SourceError, WatermarkError};
pub use crate::interfaces::{
    BatchStream, SearchIndexProvider, SourceRepository, WatermarkRepository,
};
pub use crate::opensearch::{index_definition, OpenSearchProvider};
pub use crate::postgres::PostgresSourceRepository;
pub use crate::redis::RedisWatermarkRepository;
pub use crate::types::{
    BatchOperationResult, BatchOperationSummary, ExtractedBatch, GenreRow, IndexDefinition, Json,
    MovieRow, PersonRow,
};
