//! Orchestrator module for the catalog indexer.
//!
//! Runs the extract, transform and load pipeline of every configured kind,
//! then sleeps and starts over.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures::TryStreamExt;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, instrument};

use crate::backoff::{with_backoff, BackoffPolicy};
use crate::errors::IngestError;
use crate::loader::SearchLoader;
use crate::processor::CatalogProcessor;
use catalog_indexer_repository::{SourceRepository, WatermarkError, WatermarkRepository};
use catalog_indexer_shared::EntityKind;

/// Default number of rows per extracted batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default pause between two cycles.
pub const DEFAULT_SLEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Watermark assumed for a kind that has never completed a batch.
///
/// Every row of the catalog is newer than this.
pub fn beginning_of_time() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Kinds to replicate, in processing order.
    pub kinds: Vec<EntityKind>,
    /// Rows per extracted batch.
    pub batch_size: usize,
    /// Pause between two cycles.
    pub sleep_interval: Duration,
    /// Retry schedule for transient failures.
    pub backoff: BackoffPolicy,
}

/// Statistics of one kind's pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct KindRunReport {
    pub kind: EntityKind,
    /// Batches extracted and loaded.
    pub batches: usize,
    /// Documents the index accepted.
    pub documents: usize,
    /// Documents the index rejected for good.
    pub failed: usize,
    /// Watermark stored at the end of the run, `None` if the kind never had one.
    pub watermark: Option<DateTime<Utc>>,
}

impl KindRunReport {
    fn new(kind: EntityKind, watermark: Option<DateTime<Utc>>) -> Self {
        Self {
            kind,
            batches: 0,
            documents: 0,
            failed: 0,
            watermark,
        }
    }
}

/// Orchestrator that coordinates the pipeline components.
///
/// The orchestrator:
/// - Creates missing indices before every cycle
/// - Runs each kind's pipeline under the backoff policy
/// - Advances a kind's watermark only after a batch was loaded
/// - Handles shutdown signals
pub struct Orchestrator {
    source: Arc<dyn SourceRepository>,
    watermarks: Arc<dyn WatermarkRepository>,
    processor: CatalogProcessor,
    loader: SearchLoader,
    config: OrchestratorConfig,
    shutdown_tx: watch::Sender<bool>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn with_config(
        source: Arc<dyn SourceRepository>,
        watermarks: Arc<dyn WatermarkRepository>,
        processor: CatalogProcessor,
        loader: SearchLoader,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            source,
            watermarks,
            processor,
            loader,
            config,
            shutdown_tx,
        }
    }

    /// Run the orchestrator.
    ///
    /// Runs cycles separated by the configured sleep until Ctrl-C or
    /// [`Orchestrator::shutdown`]. A cycle cut short by shutdown is safe to
    /// abandon since watermarks only move after a batch is loaded. Returns an
    /// error only when a pipeline fails in a way retrying cannot fix.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), IngestError> {
        info!(
            kinds = ?self.config.kinds,
            batch_size = self.config.batch_size,
            sleep_secs = self.config.sleep_interval.as_secs(),
            "Starting catalog indexer orchestrator"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut cycles: u64 = 0;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                result = self.run_once() => {
                    result?;
                    cycles += 1;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = shutdown_rx.changed() => {
                    break;
                }
            }

            debug!(
                sleep_secs = self.config.sleep_interval.as_secs(),
                "Cycle complete, sleeping"
            );

            tokio::select! {
                _ = sleep(self.config.sleep_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = shutdown_rx.changed() => {
                    break;
                }
            }
        }

        info!(cycles = cycles, "Orchestrator shutdown complete");
        Ok(())
    }

    /// One cycle, preceded by creating any index that has gone missing.
    async fn run_once(&self) -> Result<Vec<KindRunReport>, IngestError> {
        self.loader.ensure_indices(&self.config.kinds).await?;
        self.run_cycle().await
    }

    /// Run the pipeline of every configured kind once, in order.
    ///
    /// Each kind is retried as a whole while it fails transiently. Re-running
    /// a kind is safe: its watermark only moved for batches that were loaded,
    /// and loading the same documents again overwrites them.
    pub async fn run_cycle(&self) -> Result<Vec<KindRunReport>, IngestError> {
        let mut reports = Vec::with_capacity(self.config.kinds.len());

        for &kind in &self.config.kinds {
            let operation = format!("run_kind:{}", kind);
            let report = with_backoff(
                &self.config.backoff,
                &operation,
                IngestError::is_transient,
                || self.run_kind(kind),
            )
            .await?;

            info!(
                kind = %kind,
                batches = report.batches,
                documents = report.documents,
                failed = report.failed,
                "Pipeline finished"
            );
            reports.push(report);
        }

        Ok(reports)
    }

    /// Run one kind's pipeline: extract everything changed since the stored
    /// watermark, transform and load it batch by batch.
    ///
    /// The watermark is set to the time this run started, and only after a
    /// batch was loaded. Rows changed while the run is in progress are then
    /// picked up again next cycle rather than skipped. The stored value never
    /// moves backward.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn run_kind(&self, kind: EntityKind) -> Result<KindRunReport, IngestError> {
        let started = Utc::now();
        let key = kind.watermark_key();

        let stored = with_backoff(
            &self.config.backoff,
            "get_watermark",
            WatermarkError::is_transient,
            || self.watermarks.get_watermark(key),
        )
        .await?;
        let since = stored.unwrap_or_else(beginning_of_time);
        debug!(since = %since, "Extracting changes");

        let mut report = KindRunReport::new(kind, stored);
        let mut batches = self.source.extract(kind, since, self.config.batch_size);

        while let Some(batch) = batches.try_next().await? {
            let documents = self.processor.transform(&batch);
            let loaded = self.loader.load(kind, &documents).await?;

            report.batches += 1;
            report.documents += loaded.indexed;
            report.failed += loaded.failed;

            let next = report.watermark.map_or(started, |current| current.max(started));
            with_backoff(
                &self.config.backoff,
                "set_watermark",
                WatermarkError::is_transient,
                || self.watermarks.set_watermark(key, next),
            )
            .await?;
            report.watermark = Some(next);
        }

        Ok(report)
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beginning_of_time_precedes_everything() {
        let start = beginning_of_time();
        assert_eq!(start.to_rfc3339(), "0001-01-01T00:00:00+00:00");
        assert!(start < DateTime::<Utc>::UNIX_EPOCH);
    }
}
