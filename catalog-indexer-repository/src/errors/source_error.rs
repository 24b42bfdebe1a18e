//! Error types for the relational source store.

use thiserror::Error;

/// SQLSTATE codes that signal a lost or refused connection rather than a bad query.
const CONNECTION_SQLSTATES: [&str; 3] = ["57P01", "57P02", "57P03"];

/// Represents errors that can occur while extracting rows from the catalog database.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The database could not be reached or dropped the connection.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The query was rejected or failed while executing.
    #[error("Query error: {0}")]
    QueryError(String),

    /// A returned row did not match the expected shape.
    #[error("Decode error: {0}")]
    DecodeError(String),
}

impl SourceError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Whether retrying the extraction may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

impl From<sqlx::Error> for SourceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::ConnectionError(err.to_string()),
            sqlx::Error::Database(db_err) => {
                let is_connection = db_err
                    .code()
                    .map(|code| code.starts_with("08") || CONNECTION_SQLSTATES.contains(&&*code))
                    .unwrap_or(false);
                if is_connection {
                    Self::ConnectionError(err.to_string())
                } else {
                    Self::QueryError(err.to_string())
                }
            }
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::TypeNotFound { .. } => Self::DecodeError(err.to_string()),
            _ => Self::QueryError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_is_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = SourceError::from(sqlx::Error::Io(io));
        assert!(matches!(err, SourceError::ConnectionError(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(SourceError::from(sqlx::Error::PoolTimedOut).is_transient());
    }

    #[test]
    fn test_column_not_found_is_permanent() {
        let err = SourceError::from(sqlx::Error::ColumnNotFound("imdb_rating".to_string()));
        assert!(matches!(err, SourceError::DecodeError(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_row_not_found_is_query_error() {
        let err = SourceError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, SourceError::QueryError(_)));
        assert!(!err.is_transient());
    }
}
