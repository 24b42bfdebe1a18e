//! Redis implementation of the watermark repository.
//!
//! Each kind's watermark lives in a hash keyed by the kind's index name, under
//! the `updated` field, as an RFC 3339 timestamp.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::errors::WatermarkError;
use crate::interfaces::WatermarkRepository;

/// Hash field holding the watermark.
pub const WATERMARK_FIELD: &str = "updated";

/// Redis-backed watermark repository.
///
/// The connection manager reconnects on its own and is cheap to clone, so a
/// single repository is shared by every kind.
#[derive(Clone)]
pub struct RedisWatermarkRepository {
    conn: ConnectionManager,
}

impl RedisWatermarkRepository {
    /// Connects to Redis at `url` (e.g. "redis://localhost:6379/0").
    pub async fn new(url: &str) -> Result<Self, WatermarkError> {
        let client = redis::Client::open(url)
            .map_err(|e| WatermarkError::ConnectionError(e.to_string()))?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl WatermarkRepository for RedisWatermarkRepository {
    async fn get_watermark(&self, key: &str) -> Result<Option<DateTime<Utc>>, WatermarkError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(key, WATERMARK_FIELD).await?;

        let Some(raw) = raw else {
            debug!(key = %key, "No watermark stored");
            return Ok(None);
        };

        match parse_watermark(&raw) {
            Some(value) => Ok(Some(value)),
            None => {
                warn!(key = %key, value = %raw, "Ignoring unparseable watermark");
                Ok(None)
            }
        }
    }

    async fn set_watermark(&self, key: &str, value: DateTime<Utc>) -> Result<(), WatermarkError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(key, WATERMARK_FIELD, format_watermark(value)).await?;
        debug!(key = %key, watermark = %value, "Stored watermark");
        Ok(())
    }
}

/// Renders a watermark the way it is stored.
pub fn format_watermark(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored watermark.
///
/// Accepts RFC 3339 as well as the `YYYY-MM-DD HH:MM:SS[.ffffff][+HH:MM]`
/// form older writers left behind; values without an offset are read as UTC.
pub fn parse_watermark(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.with_timezone(&Utc));
    }
    if let Ok(value) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(value.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|value| value.and_utc())
}
