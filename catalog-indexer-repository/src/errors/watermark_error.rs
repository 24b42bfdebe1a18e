use thiserror::Error;

#[derive(Debug, Error)]
/// Represents errors that can occur within the watermark repository.
pub enum WatermarkError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Command error: {0}")]
    CommandError(String),
}

impl WatermarkError {
    /// Whether retrying the read or write may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

impl From<redis::RedisError> for WatermarkError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            Self::ConnectionError(err.to_string())
        } else {
            Self::CommandError(err.to_string())
        }
    }
}
