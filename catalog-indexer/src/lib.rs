//! # Catalog Indexer
//!
//! Keeps the movie, genre and person search indices in step with the catalog
//! database without reprocessing unchanged rows on every run.
//!
//! ## Architecture
//!
//! The indexer follows the Extract-Transform-Load pattern, once per kind:
//!
//! 1. **Extract**: Streams rows changed since the kind's watermark from PostgreSQL
//! 2. **Processor**: Transforms rows into search documents
//! 3. **Loader**: Upserts documents into OpenSearch
//! 4. **Orchestrator**: Advances the watermark after each loaded batch and
//!    repeats the cycle on a fixed interval
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`backoff`]: Retry with exponential backoff for transient failures
//! - [`processor`]: Transforms rows into documents
//! - [`loader`]: Indexes documents into OpenSearch
//! - [`orchestrator`]: Coordinates the pipelines
//! - [`errors`]: Error types for the indexer

pub mod backoff;
pub mod config;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;

pub use config::{Dependencies, Settings};
pub use errors::IngestError;

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
