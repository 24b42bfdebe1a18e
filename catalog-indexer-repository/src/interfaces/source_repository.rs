use catalog_indexer_shared::EntityKind;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::errors::SourceError;
use crate::types::ExtractedBatch;

/// Stream of batches produced by one extraction.
pub type BatchStream = BoxStream<'static, Result<ExtractedBatch, SourceError>>;

/// Trait for reading changed rows from the catalog database.
///
/// An extraction selects every row of `kind` whose own `modified` timestamp, or
/// that of any joined relation, is strictly greater than `since`, and yields
/// them in chunks of at most `batch_size` rows. Nothing changed means an empty
/// stream, not an error.
pub trait SourceRepository: Send + Sync {
    fn extract(&self, kind: EntityKind, since: DateTime<Utc>, batch_size: usize) -> BatchStream;
}
