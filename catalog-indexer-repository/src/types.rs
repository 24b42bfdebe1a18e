//! Row, batch and result types exchanged with the repositories.

use catalog_indexer_shared::{EntityKind, RelatedEntity};
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

pub use sqlx::types::Json;

use crate::errors::SearchIndexError;

/// A film-work row joined with its genres and people.
///
/// Aggregate columns are `None` when the database returned `NULL` for them;
/// turning those into empty lists is left to the transformer.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MovieRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub imdb_rating: Option<f64>,
    pub created: Option<DateTime<Utc>>,
    pub modified: DateTime<Utc>,
    pub genres_name: Option<Vec<String>>,
    pub actors_names: Option<Vec<String>>,
    pub writers_names: Option<Vec<String>>,
    pub directors_names: Option<Vec<String>>,
    pub genres: Option<Json<Vec<RelatedEntity>>>,
    pub directors: Option<Json<Vec<RelatedEntity>>>,
    pub actors: Option<Json<Vec<RelatedEntity>>>,
    pub writers: Option<Json<Vec<RelatedEntity>>>,
}

/// A genre row.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct GenreRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub modified: DateTime<Utc>,
}

/// A person row.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PersonRow {
    pub id: Uuid,
    pub full_name: String,
    pub modified: DateTime<Utc>,
}

/// One fetched chunk of rows from a single extraction query.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedBatch {
    Movies(Vec<MovieRow>),
    Genres(Vec<GenreRow>),
    Persons(Vec<PersonRow>),
}

impl ExtractedBatch {
    pub fn kind(&self) -> EntityKind {
        match self {
            ExtractedBatch::Movies(_) => EntityKind::Movie,
            ExtractedBatch::Genres(_) => EntityKind::Genre,
            ExtractedBatch::Persons(_) => EntityKind::Person,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ExtractedBatch::Movies(rows) => rows.len(),
            ExtractedBatch::Genres(rows) => rows.len(),
            ExtractedBatch::Persons(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Settings and mappings an index is created with.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    /// Index name (e.g. "movies").
    pub name: String,
    /// The `settings` object, including analysis configuration.
    pub settings: Value,
    /// The `mappings` object.
    pub mappings: Value,
}

/// Result of a batch operation for a single document.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The document id (the entity UUID).
    pub document_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchIndexError>,
}

impl BatchOperationResult {
    pub fn succeeded(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(document_id: impl Into<String>, error: SearchIndexError) -> Self {
        Self {
            document_id: document_id.into(),
            success: false,
            error: Some(error),
        }
    }

    /// Whether this document failed in a way that is worth re-sending.
    pub fn is_retryable_failure(&self) -> bool {
        !self.success && self.error.as_ref().is_some_and(|e| e.is_transient())
    }
}

/// Summary of a bulk operation containing aggregate statistics and individual results.
///
/// A bulk request can succeed as a whole while individual documents are
/// rejected; callers inspect `results` to see which ones.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationSummary {
    /// Total number of documents in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each document.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Build a summary from per-document results.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Failed results, in request order.
    pub fn failures(&self) -> impl Iterator<Item = &BatchOperationResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let summary = BatchOperationSummary::from_results(vec![
            BatchOperationResult::succeeded("a"),
            BatchOperationResult::failed("b", SearchIndexError::document_rejected(429, "busy")),
            BatchOperationResult::failed("c", SearchIndexError::document_rejected(400, "bad")),
        ]);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);

        let retryable: Vec<_> = summary
            .failures()
            .filter(|r| r.is_retryable_failure())
            .map(|r| r.document_id.as_str())
            .collect();
        assert_eq!(retryable, vec!["b"]);
    }

    #[test]
    fn test_batch_kind_and_len() {
        let batch = ExtractedBatch::Persons(vec![PersonRow {
            id: Uuid::new_v4(),
            full_name: "Carl Meyer".to_string(),
            modified: Utc::now(),
        }]);
        assert_eq!(batch.kind(), EntityKind::Person);
        assert_eq!(batch.len(), 1);
        assert!(!batch.is_empty());
        assert!(ExtractedBatch::Genres(vec![]).is_empty());
    }
}
