use chrono::{DateTime, Utc};

use crate::errors::WatermarkError;

/// Trait for interacting with the watermark store.
///
/// Holds one timestamp per key marking how far a kind has been replicated.
/// Setting a key overwrites the previous value and is safe to repeat.
#[async_trait::async_trait]
pub trait WatermarkRepository: Send + Sync {
    /// Returns the stored watermark, or `None` if the kind has never completed a batch.
    async fn get_watermark(&self, key: &str) -> Result<Option<DateTime<Utc>>, WatermarkError>;
    async fn set_watermark(&self, key: &str, value: DateTime<Utc>) -> Result<(), WatermarkError>;
}
