//! Loader module for the catalog indexer.
//!
//! Writes transformed documents into the search index of their kind.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::backoff::{with_backoff, BackoffPolicy};
use crate::errors::IngestError;
use catalog_indexer_repository::{index_definition, SearchIndexError, SearchIndexProvider};
use catalog_indexer_shared::{CatalogDocument, EntityKind};

/// Default number of times rejected documents are re-sent.
pub const DEFAULT_PARTIAL_RETRIES: u32 = 3;

/// Configuration for the search loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// How many times documents rejected with a retryable status are re-sent.
    pub partial_retries: u32,
    /// Delay schedule between re-sends and for index creation.
    pub backoff: BackoffPolicy,
}

/// Outcome of loading one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Documents handed to the loader.
    pub documents: usize,
    /// Documents the index accepted.
    pub indexed: usize,
    /// Documents that were still rejected after all re-sends.
    pub failed: usize,
}

/// Loader that indexes documents into the search engine.
///
/// The loader is responsible for:
/// - Creating missing indices with their settings and mappings
/// - Upserting each batch with a single bulk request
/// - Re-sending only the documents the index rejected with a retryable status
pub struct SearchLoader {
    provider: Arc<dyn SearchIndexProvider>,
    config: LoaderConfig,
}

impl SearchLoader {
    /// Create a new search loader.
    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: LoaderConfig) -> Self {
        Self { provider, config }
    }

    /// Make sure the index of every given kind exists.
    ///
    /// Unreachable backends are retried with backoff; a rejected index
    /// definition is returned as an error.
    #[instrument(skip(self, kinds), fields(kind_count = kinds.len()))]
    pub async fn ensure_indices(&self, kinds: &[EntityKind]) -> Result<(), IngestError> {
        for &kind in kinds {
            let definition = index_definition(kind);
            let created = with_backoff(
                &self.config.backoff,
                "ensure_index",
                SearchIndexError::is_transient,
                || self.provider.ensure_index(&definition),
            )
            .await?;

            if created {
                info!(index = %definition.name, "Index created");
            } else {
                debug!(index = %definition.name, "Index already present");
            }
        }
        Ok(())
    }

    /// Upsert a batch of documents into the index of `kind`.
    ///
    /// A failed request as a whole is returned as an error and nothing is
    /// assumed written. Individually rejected documents are re-sent while
    /// their status is retryable, up to the configured number of times; what
    /// is still rejected after that is logged and counted but does not fail
    /// the batch.
    #[instrument(skip(self, documents), fields(kind = %kind, document_count = documents.len()))]
    pub async fn load(
        &self,
        kind: EntityKind,
        documents: &[CatalogDocument],
    ) -> Result<LoadReport, IngestError> {
        let mut report = LoadReport {
            documents: documents.len(),
            ..LoadReport::default()
        };
        if documents.is_empty() {
            return Ok(report);
        }

        let index = kind.index_name();
        let mut pending: Vec<CatalogDocument> = documents.to_vec();
        let mut delays = self.config.backoff.delays();
        let mut resends: u32 = 0;

        loop {
            let summary = self.provider.bulk_upsert(index, &pending).await?;
            report.indexed += summary.succeeded;

            let mut retryable: HashSet<String> = HashSet::new();
            for result in summary.failures() {
                let retry_allowed = resends < self.config.partial_retries;
                if result.is_retryable_failure() && retry_allowed {
                    retryable.insert(result.document_id.clone());
                    continue;
                }

                report.failed += 1;
                match &result.error {
                    Some(err) => error!(
                        index = %index,
                        document_id = %result.document_id,
                        error = %err,
                        "Failed to index document"
                    ),
                    None => error!(
                        index = %index,
                        document_id = %result.document_id,
                        "Failed to index document"
                    ),
                }
            }

            if retryable.is_empty() {
                break;
            }

            resends += 1;
            let delay = delays.next().unwrap_or(self.config.backoff.max);
            warn!(
                index = %index,
                count = retryable.len(),
                attempt = resends,
                delay_ms = delay.as_millis() as u64,
                "Re-sending rejected documents"
            );
            sleep(delay).await;

            pending.retain(|doc| retryable.contains(&doc.id().to_string()));
        }

        if report.failed > 0 {
            warn!(
                index = %index,
                indexed = report.indexed,
                failed = report.failed,
                "Bulk upsert completed with some failures"
            );
        } else {
            debug!(index = %index, count = report.indexed, "Successfully indexed all documents");
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use catalog_indexer_repository::{
        BatchOperationResult, BatchOperationSummary, IndexDefinition,
    };
    use catalog_indexer_shared::GenreDocument;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    /// Mock search provider for testing.
    ///
    /// `rejections` queues per-document statuses: each bulk call pops one
    /// status for every listed document it contains and rejects it with it.
    #[derive(Default)]
    struct MockSearchProvider {
        rejections: Mutex<HashMap<Uuid, VecDeque<u16>>>,
        request_errors: Mutex<VecDeque<SearchIndexError>>,
        ensure_errors: Mutex<VecDeque<SearchIndexError>>,
        bulk_calls: Mutex<Vec<Vec<Uuid>>>,
        ensured: Mutex<Vec<String>>,
    }

    impl MockSearchProvider {
        fn reject(&self, id: Uuid, statuses: &[u16]) {
            self.rejections
                .lock()
                .unwrap()
                .insert(id, statuses.iter().copied().collect());
        }

        fn bulk_calls(&self) -> Vec<Vec<Uuid>> {
            self.bulk_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchIndexProvider for MockSearchProvider {
        async fn ensure_index(&self, definition: &IndexDefinition) -> Result<bool, SearchIndexError> {
            if let Some(err) = self.ensure_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            self.ensured.lock().unwrap().push(definition.name.clone());
            Ok(true)
        }

        async fn bulk_upsert(
            &self,
            _index: &str,
            documents: &[CatalogDocument],
        ) -> Result<BatchOperationSummary, SearchIndexError> {
            self.bulk_calls
                .lock()
                .unwrap()
                .push(documents.iter().map(|d| d.id()).collect());

            if let Some(err) = self.request_errors.lock().unwrap().pop_front() {
                return Err(err);
            }

            let mut rejections = self.rejections.lock().unwrap();
            let results = documents
                .iter()
                .map(|doc| {
                    let status = rejections.get_mut(&doc.id()).and_then(|q| q.pop_front());
                    match status {
                        Some(status) => BatchOperationResult::failed(
                            doc.id().to_string(),
                            SearchIndexError::document_rejected(status, "rejected"),
                        ),
                        None => BatchOperationResult::succeeded(doc.id().to_string()),
                    }
                })
                .collect();
            Ok(BatchOperationSummary::from_results(results))
        }
    }

    fn genre(name: &str) -> CatalogDocument {
        CatalogDocument::Genre(GenreDocument {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
        })
    }

    fn loader(provider: &Arc<MockSearchProvider>) -> SearchLoader {
        SearchLoader::with_config(
            provider.clone(),
            LoaderConfig {
                partial_retries: 2,
                backoff: BackoffPolicy::new(Duration::from_millis(10), 2, Duration::from_millis(40)),
            },
        )
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let provider = Arc::new(MockSearchProvider::default());

        let report = loader(&provider).load(EntityKind::Genre, &[]).await.unwrap();

        assert_eq!(report, LoadReport::default());
        assert!(provider.bulk_calls().is_empty());
    }

    #[tokio::test]
    async fn test_load_single_request() {
        let provider = Arc::new(MockSearchProvider::default());
        let docs = vec![genre("Drama"), genre("Comedy")];

        let report = loader(&provider).load(EntityKind::Genre, &docs).await.unwrap();

        assert_eq!(
            report,
            LoadReport {
                documents: 2,
                indexed: 2,
                failed: 0
            }
        );
        assert_eq!(provider.bulk_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_rejected_documents_are_resent() {
        let provider = Arc::new(MockSearchProvider::default());
        let docs = vec![genre("Drama"), genre("Comedy"), genre("Horror")];
        provider.reject(docs[1].id(), &[429, 503]);

        let report = loader(&provider).load(EntityKind::Genre, &docs).await.unwrap();

        assert_eq!(report.indexed, 3);
        assert_eq!(report.failed, 0);
        let calls = provider.bulk_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].len(), 3);
        assert_eq!(calls[1], vec![docs[1].id()]);
        assert_eq!(calls[2], vec![docs[1].id()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_rejection_is_not_resent() {
        let provider = Arc::new(MockSearchProvider::default());
        let docs = vec![genre("Drama"), genre("Comedy")];
        provider.reject(docs[0].id(), &[400]);

        let report = loader(&provider).load(EntityKind::Genre, &docs).await.unwrap();

        assert_eq!(report.indexed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(provider.bulk_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resends_are_bounded() {
        let provider = Arc::new(MockSearchProvider::default());
        let docs = vec![genre("Drama")];
        provider.reject(docs[0].id(), &[429, 429, 429, 429, 429]);

        let report = loader(&provider).load(EntityKind::Genre, &docs).await.unwrap();

        // One request plus two re-sends
        assert_eq!(provider.bulk_calls().len(), 3);
        assert_eq!(report.indexed, 0);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_request_failure_is_returned() {
        let provider = Arc::new(MockSearchProvider::default());
        provider
            .request_errors
            .lock()
            .unwrap()
            .push_back(SearchIndexError::connection("connection refused"));

        let err = loader(&provider)
            .load(EntityKind::Genre, &[genre("Drama")])
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::LoaderError(_)));
        assert!(err.is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_indices_retries_unreachable_backend() {
        let provider = Arc::new(MockSearchProvider::default());
        provider
            .ensure_errors
            .lock()
            .unwrap()
            .push_back(SearchIndexError::connection("connection refused"));

        loader(&provider)
            .ensure_indices(&EntityKind::ALL)
            .await
            .unwrap();

        assert_eq!(
            *provider.ensured.lock().unwrap(),
            vec!["movies", "genres", "persons"]
        );
    }

    #[tokio::test]
    async fn test_ensure_indices_rejected_definition() {
        let provider = Arc::new(MockSearchProvider::default());
        provider
            .ensure_errors
            .lock()
            .unwrap()
            .push_back(SearchIndexError::index_creation("mapper_parsing_exception"));

        let result = loader(&provider).ensure_indices(&[EntityKind::Movie]).await;

        assert!(matches!(result, Err(IngestError::LoaderError(_))));
    }
}
