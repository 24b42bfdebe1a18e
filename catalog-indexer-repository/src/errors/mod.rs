//! Error types for the catalog indexer repository.
//!
//! One error type per external store. Each answers `is_transient()` so callers
//! can decide whether an operation is worth retrying.

mod search_index_error;
mod source_error;
mod watermark_error;

pub use search_index_error::SearchIndexError;
pub use source_error::SourceError;
pub use watermark_error::WatermarkError;
