//! Environment-driven settings for the catalog indexer.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::backoff::BackoffPolicy;
use crate::loader::{LoaderConfig, DEFAULT_PARTIAL_RETRIES};
use crate::orchestrator::{OrchestratorConfig, DEFAULT_BATCH_SIZE, DEFAULT_SLEEP_INTERVAL};
use crate::IndexingError;
use catalog_indexer_shared::EntityKind;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default Redis URL.
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Default PostgreSQL host and port, used when no `DATABASE_URL` is given.
const DEFAULT_POSTGRES_HOST: &str = "localhost";
const DEFAULT_POSTGRES_PORT: u16 = 5432;

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// What to do when a store cannot be reached at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection at a fixed interval until successful.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "retry" if not set or invalid.
    fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or("retry").to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Where the catalog database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseSettings {
    /// A full `postgres://` URL.
    Url(String),
    /// Individual connection parameters.
    Params {
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    },
}

/// All runtime settings of the indexer.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub opensearch_url: String,
    pub redis_url: String,
    pub batch_size: usize,
    pub sleep_interval: Duration,
    pub kinds: Vec<EntityKind>,
    pub backoff: BackoffPolicy,
    pub partial_retries: u32,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: PostgreSQL URL; when unset `POSTGRES_DB`, `POSTGRES_USER` and
    ///   `POSTGRES_PASSWORD` are required and `POSTGRES_HOST` (default: localhost) and
    ///   `POSTGRES_PORT` (default: 5432) are used
    /// - `ELASTIC_ADDRESS` or `OPENSEARCH_URL`: search server URL (default: http://localhost:9200)
    /// - `REDIS_URL`: watermark store URL (default: redis://localhost:6379)
    /// - `BATCH_SIZE`: rows per batch (default: 100)
    /// - `ETL_SLEEP`: seconds between cycles (default: 60)
    /// - `ETL_PIPELINES`: comma-separated kinds to run (default: movie,genre,person)
    /// - `BACKOFF_START_MS`, `BACKOFF_FACTOR`, `BACKOFF_MAX_MS`: retry schedule (default: 100, 2, 10000)
    /// - `LOADER_PARTIAL_RETRIES`: re-sends of rejected documents (default: 3)
    /// - `CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `CONNECTION_RETRY_INTERVAL_SECS`: startup retry interval (default: 15)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the raw value of a variable.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database = match get("DATABASE_URL") {
            Some(url) => DatabaseSettings::Url(url),
            None => DatabaseSettings::Params {
                host: get("POSTGRES_HOST").unwrap_or_else(|| DEFAULT_POSTGRES_HOST.to_string()),
                port: parse_or(&get, "POSTGRES_PORT", DEFAULT_POSTGRES_PORT)?,
                user: required(&get, "POSTGRES_USER")?,
                password: required(&get, "POSTGRES_PASSWORD")?,
                database: required(&get, "POSTGRES_DB")?,
            },
        };

        let opensearch_url = get("ELASTIC_ADDRESS")
            .or_else(|| get("OPENSEARCH_URL"))
            .unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string());
        let redis_url = get("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        let batch_size = parse_or(&get, "BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(IndexingError::config("BATCH_SIZE must be at least 1"));
        }

        let sleep_interval = Duration::from_secs(parse_or(
            &get,
            "ETL_SLEEP",
            DEFAULT_SLEEP_INTERVAL.as_secs(),
        )?);

        let kinds = match get("ETL_PIPELINES") {
            Some(list) => parse_kinds(&list)?,
            None => EntityKind::ALL.to_vec(),
        };

        let defaults = BackoffPolicy::default();
        let backoff = BackoffPolicy::new(
            Duration::from_millis(parse_or(
                &get,
                "BACKOFF_START_MS",
                defaults.start.as_millis() as u64,
            )?),
            parse_or(&get, "BACKOFF_FACTOR", defaults.factor)?,
            Duration::from_millis(parse_or(
                &get,
                "BACKOFF_MAX_MS",
                defaults.max.as_millis() as u64,
            )?),
        );
        if backoff.factor == 0 {
            return Err(IndexingError::config("BACKOFF_FACTOR must be at least 1"));
        }

        let partial_retries = parse_or(&get, "LOADER_PARTIAL_RETRIES", DEFAULT_PARTIAL_RETRIES)?;
        let connection_mode = ConnectionMode::parse(get("CONNECTION_MODE").as_deref());
        let retry_interval = Duration::from_secs(parse_or(
            &get,
            "CONNECTION_RETRY_INTERVAL_SECS",
            DEFAULT_RETRY_INTERVAL_SECS,
        )?);

        Ok(Self {
            database,
            opensearch_url,
            redis_url,
            batch_size,
            sleep_interval,
            kinds,
            backoff,
            partial_retries,
            connection_mode,
            retry_interval,
        })
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            kinds: self.kinds.clone(),
            batch_size: self.batch_size,
            sleep_interval: self.sleep_interval,
            backoff: self.backoff,
        }
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            partial_retries: self.partial_retries,
            backoff: self.backoff,
        }
    }
}

fn required<G>(get: &G, key: &str) -> Result<String, IndexingError>
where
    G: Fn(&str) -> Option<String>,
{
    get(key).ok_or_else(|| IndexingError::config(format!("{} is not set", key)))
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, IndexingError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| IndexingError::config(format!("Invalid {} '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

/// Parse a comma-separated kind list, keeping the first occurrence of each kind.
fn parse_kinds(list: &str) -> Result<Vec<EntityKind>, IndexingError> {
    let mut kinds = Vec::new();
    for item in list.split(',').filter(|s| !s.trim().is_empty()) {
        let kind: EntityKind = item
            .parse()
            .map_err(|e| IndexingError::config(format!("Invalid ETL_PIPELINES: {}", e)))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    if kinds.is_empty() {
        return Err(IndexingError::config("ETL_PIPELINES names no pipeline"));
    }
    Ok(kinds)
}
