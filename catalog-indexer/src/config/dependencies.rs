//! Dependency initialization and wiring for the catalog indexer.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::settings::{ConnectionMode, DatabaseSettings, Settings};
use crate::loader::SearchLoader;
use crate::orchestrator::Orchestrator;
use crate::processor::CatalogProcessor;
use crate::IndexingError;
use catalog_indexer_repository::{
    OpenSearchProvider, PostgresSourceRepository, RedisWatermarkRepository,
};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from the given settings.
    ///
    /// Only the watermark store is contacted here; the database and the search
    /// server are reached lazily by the first cycle, under the backoff policy.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If a URL is malformed, or Redis is unreachable in fail-fast mode
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            kinds = ?settings.kinds,
            batch_size = settings.batch_size,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            "Initializing dependencies"
        );

        let source = match &settings.database {
            DatabaseSettings::Url(url) => PostgresSourceRepository::new(url).map_err(|e| {
                IndexingError::config(format!("Invalid database configuration: {}", e))
            })?,
            DatabaseSettings::Params {
                host,
                port,
                user,
                password,
                database,
            } => PostgresSourceRepository::from_params(host, *port, user, password, database),
        };

        let search_provider = OpenSearchProvider::new(&settings.opensearch_url)
            .await
            .map_err(|e| {
                IndexingError::config(format!("Failed to create OpenSearch provider: {}", e))
            })?;

        let watermarks = Self::connect_to_redis(
            &settings.redis_url,
            settings.connection_mode,
            settings.retry_interval,
        )
        .await?;

        info!("Redis connection established");

        let loader = SearchLoader::with_config(Arc::new(search_provider), settings.loader_config());

        let orchestrator = Orchestrator::with_config(
            Arc::new(source),
            Arc::new(watermarks),
            CatalogProcessor::new(),
            loader,
            settings.orchestrator_config(),
        );

        Ok(Self { orchestrator })
    }

    /// Connect to Redis with retry logic based on connection mode.
    async fn connect_to_redis(
        url: &str,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<RedisWatermarkRepository, IndexingError> {
        loop {
            match RedisWatermarkRepository::new(url).await {
                Ok(repository) => return Ok(repository),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(IndexingError::config(format!(
                            "Failed to connect to Redis: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to Redis, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }
}
