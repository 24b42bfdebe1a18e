//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use catalog_indexer_shared::CatalogDocument;

use crate::errors::SearchIndexError;
use crate::types::{BatchOperationSummary, IndexDefinition};

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// Implementations are shared behind an `Arc` by the loader, which is what
/// allows a mock provider to stand in for the real backend in tests.
///
/// # Note on Document Writes
///
/// There is no separate create or partial update: every write replaces the
/// whole document stored under the entity id, creating it when absent. Writing
/// the same documents twice leaves the index in the same state as writing them once.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the index exists, creating it with the given settings and mappings if absent.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the index was created by this call
    /// * `Ok(false)` - If the index already existed
    /// * `Err(SearchIndexError)` - If the backend is unreachable or creation fails
    async fn ensure_index(&self, definition: &IndexDefinition) -> Result<bool, SearchIndexError>;

    /// Upsert documents into an index with a single bulk request.
    ///
    /// Each document is written under its own id with full replacement semantics.
    ///
    /// # Arguments
    ///
    /// * `index` - Target index name
    /// * `documents` - Documents to write
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Per-document outcome, including partial failures
    /// * `Err(SearchIndexError)` - If the bulk request fails as a whole
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[CatalogDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError>;
}
