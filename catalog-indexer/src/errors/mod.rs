//! Error types for the catalog indexer pipeline.

use catalog_indexer_repository::{SearchIndexError, SourceError, WatermarkError};
use thiserror::Error;

/// Errors that can occur while running a kind's pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Error reading from the catalog database.
    #[error("Extract error: {0}")]
    ExtractError(#[from] SourceError),

    /// Error from the loader component.
    #[error("Loader error: {0}")]
    LoaderError(#[from] SearchIndexError),

    /// Error reading or writing a watermark.
    #[error("Watermark error: {0}")]
    WatermarkError(#[from] WatermarkError),
}

impl IngestError {
    /// Whether the failure is infrastructural and the pipeline should be retried.
    ///
    /// Connection failures against any of the three stores are transient;
    /// malformed queries, rejected index definitions and the like are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ExtractError(e) => e.is_transient(),
            Self::LoaderError(e) => e.is_transient(),
            Self::WatermarkError(e) => e.is_transient(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(IngestError::from(SourceError::connection("refused")).is_transient());
        assert!(!IngestError::from(SourceError::QueryError("syntax".into())).is_transient());
        assert!(IngestError::from(SearchIndexError::http_status(503, "")).is_transient());
        assert!(!IngestError::from(SearchIndexError::index_creation("bad mapping")).is_transient());
        assert!(IngestError::from(WatermarkError::ConnectionError("reset".into())).is_transient());
        assert!(!IngestError::from(WatermarkError::CommandError("WRONGTYPE".into())).is_transient());
    }
}
