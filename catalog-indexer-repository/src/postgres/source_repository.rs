//! PostgreSQL implementation of the source repository.
//!
//! Streams changed catalog rows in fixed-size chunks so large result sets are
//! never held in memory at once.

use std::str::FromStr;

use async_stream::try_stream;
use catalog_indexer_shared::EntityKind;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{ConnectOptions, Connection, FromRow};
use tracing::{debug, info};

use crate::errors::SourceError;
use crate::interfaces::{BatchStream, SourceRepository};
use crate::postgres::queries::{query_for, watermark_params};
use crate::types::{ExtractedBatch, GenreRow, MovieRow, PersonRow};

/// PostgreSQL-backed source repository.
///
/// Holds connection options only. Each extraction opens its own connection,
/// runs its query once and closes the connection when the stream finishes or
/// is dropped.
#[derive(Clone)]
pub struct PostgresSourceRepository {
    options: PgConnectOptions,
}

impl PostgresSourceRepository {
    /// Creates a repository from a `postgres://` URL.
    ///
    /// # Returns
    ///
    /// * `Ok(PostgresSourceRepository)` - Ready-to-use repository instance
    /// * `Err(SourceError)` - If the URL cannot be parsed
    pub fn new(url: &str) -> Result<Self, SourceError> {
        let options =
            PgConnectOptions::from_str(url).map_err(|e| SourceError::connection(e.to_string()))?;
        Ok(Self::with_options(options))
    }

    /// Creates a repository from individual connection parameters.
    pub fn from_params(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        database: &str,
    ) -> Self {
        Self::with_options(
            PgConnectOptions::new()
                .host(host)
                .port(port)
                .username(username)
                .password(password)
                .database(database),
        )
    }

    pub fn with_options(options: PgConnectOptions) -> Self {
        Self { options }
    }

    fn stream_rows<R>(
        &self,
        kind: EntityKind,
        since: DateTime<Utc>,
        batch_size: usize,
        wrap: fn(Vec<R>) -> ExtractedBatch,
    ) -> BatchStream
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static,
    {
        let options = self.options.clone();
        let sql = query_for(kind);
        let params = watermark_params(kind);
        let batch_size = batch_size.max(1);

        try_stream! {
            let mut conn = options.connect().await.map_err(SourceError::from)?;
            debug!(kind = %kind, since = %since, "Running extraction query");

            let mut extracted = 0usize;
            {
                let mut query = sqlx::query_as::<_, R>(sql);
                for _ in 0..params {
                    query = query.bind(since);
                }
                let mut rows = query.fetch(&mut conn);

                let mut chunk = Vec::with_capacity(batch_size);
                while let Some(row) = rows.try_next().await.map_err(SourceError::from)? {
                    chunk.push(row);
                    if chunk.len() == batch_size {
                        extracted += chunk.len();
                        info!(index = kind.index_name(), rows = chunk.len(), "Extracted {} {}", chunk.len(), kind.index_name());
                        yield wrap(std::mem::replace(&mut chunk, Vec::with_capacity(batch_size)));
                    }
                }
                if !chunk.is_empty() {
                    extracted += chunk.len();
                    info!(index = kind.index_name(), rows = chunk.len(), "Extracted {} {}", chunk.len(), kind.index_name());
                    yield wrap(chunk);
                }
            }

            if extracted == 0 {
                info!(index = kind.index_name(), "No changes in {} detected", kind.index_name());
            } else {
                debug!(index = kind.index_name(), rows = extracted, "Extraction finished");
            }

            // Closing is best effort; the rows are already delivered.
            let _ = conn.close().await;
        }
        .boxed()
    }
}

impl SourceRepository for PostgresSourceRepository {
    fn extract(&self, kind: EntityKind, since: DateTime<Utc>, batch_size: usize) -> BatchStream {
        match kind {
            EntityKind::Movie => {
                self.stream_rows::<MovieRow>(kind, since, batch_size, ExtractedBatch::Movies)
            }
            EntityKind::Genre => {
                self.stream_rows::<GenreRow>(kind, since, batch_size, ExtractedBatch::Genres)
            }
            EntityKind::Person => {
                self.stream_rows::<PersonRow>(kind, since, batch_size, ExtractedBatch::Persons)
            }
        }
    }
}
