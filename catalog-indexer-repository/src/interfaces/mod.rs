//! Interface definitions for the external stores.
//!
//! Each trait hides one collaborator of the pipeline (the catalog database, the
//! search index and the watermark store) so implementations can be swapped and
//! mocked in tests.

mod search_index_provider;
mod source_repository;
mod watermark_repository;

pub use search_index_provider::SearchIndexProvider;
pub use source_repository::{BatchStream, SourceRepository};
pub use watermark_repository::WatermarkRepository;
