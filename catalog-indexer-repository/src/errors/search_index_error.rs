//! Search index error types.
//!
//! This module defines the unified error type for all search index operations,
//! covering both whole-request failures and per-document bulk rejections.

use thiserror::Error;

/// HTTP statuses the index store uses for overload or temporary unavailability.
const RETRYABLE_STATUSES: [u16; 4] = [429, 502, 503, 504];

/// Unified errors from search index operations.
///
/// Used by the `SearchIndexProvider` trait for every index operation.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Failed to reach the search index backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The backend answered with a non-success status.
    #[error("Request failed with status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Failed to create the search index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// A single document inside a bulk request was rejected.
    #[error("Document rejected with status {status}: {reason}")]
    DocumentRejected { status: u16, reason: String },

    /// Failed to parse response from search index backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the search index backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchIndexError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an error for a non-success HTTP status.
    pub fn http_status(status: u16, msg: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            message: msg.into(),
        }
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a per-document rejection.
    pub fn document_rejected(status: u16, reason: impl Into<String>) -> Self {
        Self::DocumentRejected {
            status,
            reason: reason.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Connection failures and overload statuses are transient; mapping
    /// conflicts, malformed documents and serialization bugs are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) => true,
            Self::HttpStatus { status, .. } | Self::DocumentRejected { status, .. } => {
                RETRYABLE_STATUSES.contains(status)
            }
            Self::IndexCreationError(_)
            | Self::ParseError(_)
            | Self::SerializationError(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_are_transient() {
        assert!(SearchIndexError::connection("refused").is_transient());
    }

    #[test]
    fn test_status_classification() {
        assert!(SearchIndexError::http_status(503, "unavailable").is_transient());
        assert!(SearchIndexError::document_rejected(429, "es_rejected_execution").is_transient());
        assert!(!SearchIndexError::http_status(400, "bad request").is_transient());
        assert!(!SearchIndexError::document_rejected(400, "mapper_parsing_exception").is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(!SearchIndexError::index_creation("invalid mapping").is_transient());
        assert!(!SearchIndexError::serialization("bad float").is_transient());
        assert!(!SearchIndexError::parse("not json").is_transient());
    }
}
