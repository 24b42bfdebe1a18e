//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use catalog_indexer_shared::CatalogDocument;
use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{BatchOperationResult, BatchOperationSummary, IndexDefinition};

/// OpenSearch provider implementation.
///
/// The underlying client keeps a pooled HTTP transport, so one provider is
/// created at startup and shared by every loader.
///
/// # Example
///
/// ```ignore
/// use catalog_indexer_repository::opensearch::{index_definition, OpenSearchProvider};
/// use catalog_indexer_shared::EntityKind;
///
/// let provider = OpenSearchProvider::new("http://localhost:9200").await?;
/// provider.ensure_index(&index_definition(EntityKind::Movie)).await?;
/// let summary = provider.bulk_upsert("movies", &documents).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// No request is sent here; an unreachable server surfaces on first use.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    pub async fn new(url: &str) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch provider");

        Ok(Self { client })
    }

    /// Build the NDJSON body of a bulk request: an `index` action line followed
    /// by the full document source, for every document.
    fn bulk_body(
        index: &str,
        documents: &[CatalogDocument],
    ) -> Result<Vec<JsonBody<Value>>, SearchIndexError> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);

        for doc in documents {
            let source = serde_json::to_value(doc)
                .map_err(|e| SearchIndexError::serialization(e.to_string()))?;
            body.push(json!({"index": {"_index": index, "_id": doc.id().to_string()}}).into());
            body.push(source.into());
        }

        Ok(body)
    }

    /// A failed create keeps its status when retrying may help, and is an
    /// index creation error otherwise.
    fn creation_error(index: &str, status: u16, body: String) -> SearchIndexError {
        let err = SearchIndexError::http_status(status, body);
        if err.is_transient() {
            return err;
        }
        SearchIndexError::index_creation(format!("Creating index {} failed: {}", index, err))
    }

    /// Turn a bulk response into per-document results.
    ///
    /// Items come back in request order; an item without an `_id` falls back to
    /// the id of the document at the same position.
    fn parse_bulk_response(
        response: &Value,
        documents: &[CatalogDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let items = response
            .get("items")
            .and_then(|items| items.as_array())
            .ok_or_else(|| SearchIndexError::parse("Bulk response has no items array"))?;

        if items.len() != documents.len() {
            return Err(SearchIndexError::parse(format!(
                "Bulk response has {} items for {} documents",
                items.len(),
                documents.len()
            )));
        }

        let results = items
            .iter()
            .zip(documents)
            .map(|(item, doc)| {
                let outcome = item.get("index").unwrap_or(item);
                let document_id = outcome
                    .get("_id")
                    .and_then(|id| id.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| doc.id().to_string());
                let status = outcome
                    .get("status")
                    .and_then(|s| s.as_u64())
                    .unwrap_or(0) as u16;

                match outcome.get("error") {
                    Some(err) => {
                        let reason = err
                            .get("reason")
                            .and_then(|r| r.as_str())
                            .map(str::to_string)
                            .unwrap_or_else(|| err.to_string());
                        BatchOperationResult::failed(
                            document_id,
                            SearchIndexError::document_rejected(status, reason),
                        )
                    }
                    None => BatchOperationResult::succeeded(document_id),
                }
            })
            .collect();

        Ok(BatchOperationSummary::from_results(results))
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    /// Ensure the index exists, creating it with the given settings and mappings if absent.
    ///
    /// The server is pinged first so an unreachable backend is reported as a
    /// connection error. A concurrent creation by another process is treated
    /// as "already exists".
    async fn ensure_index(&self, definition: &IndexDefinition) -> Result<bool, SearchIndexError> {
        let ping = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;
        if !ping.status_code().is_success() {
            return Err(SearchIndexError::connection(format!(
                "Ping failed with status {}",
                ping.status_code()
            )));
        }

        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[definition.name.as_str()]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        match exists.status_code().as_u16() {
            200 => {
                debug!(index = %definition.name, "Index already exists");
                return Ok(false);
            }
            404 => {}
            status => {
                let body = exists.text().await.unwrap_or_default();
                return Err(SearchIndexError::http_status(status, body));
            }
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&definition.name))
            .body(json!({
                "settings": definition.settings,
                "mappings": definition.mappings
            }))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            info!(
                index = %definition.name,
                settings = %definition.settings,
                mappings = %definition.mappings,
                "Created index"
            );
            return Ok(true);
        }

        let error_body = response.text().await.unwrap_or_default();
        if error_body.contains("resource_already_exists_exception") {
            debug!(index = %definition.name, "Index was created concurrently");
            return Ok(false);
        }

        error!(status = %status, body = %error_body, "Index creation failed");
        Err(Self::creation_error(&definition.name, status.as_u16(), error_body))
    }

    /// Upsert documents with one `_bulk` request of `index` actions.
    ///
    /// `index` actions overwrite any existing document with the same id, so
    /// repeating a batch is harmless.
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[CatalogDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if documents.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        let body = Self::bulk_body(index, documents)?;

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::http_status(status.as_u16(), error_body));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let summary = Self::parse_bulk_response(&response_body, documents)?;
        debug!(
            index = %index,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk upsert completed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_indexer_shared::{GenreDocument, PersonDocument};
    use uuid::Uuid;

    fn person(id: &str, name: &str) -> CatalogDocument {
        CatalogDocument::Person(PersonDocument {
            id: Uuid::parse_str(id).unwrap(),
            name: name.to_string(),
        })
    }

    #[test]
    fn test_bulk_body_pairs_action_and_source() {
        let docs = vec![
            person("2e01e457-f993-4bfe-87c3-de2ef8626cc7", "Mae Questel"),
            person("448b9382-f235-478b-a013-d127f421ea4a", "Jackson Beck"),
        ];

        let body = OpenSearchProvider::bulk_body("persons", &docs).unwrap();
        assert_eq!(body.len(), 4);
    }

    #[test]
    fn test_parse_bulk_response_all_succeeded() {
        let docs = vec![CatalogDocument::Genre(GenreDocument {
            id: Uuid::parse_str("1cacff68-643e-4ddd-8f57-84b62538081a").unwrap(),
            name: "Drama".to_string(),
            description: None,
        })];
        let response = json!({
            "took": 3,
            "errors": false,
            "items": [
                {"index": {"_index": "genres", "_id": "1cacff68-643e-4ddd-8f57-84b62538081a", "status": 201}}
            ]
        });

        let summary = OpenSearchProvider::parse_bulk_response(&response, &docs).unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(
            summary.results[0].document_id,
            "1cacff68-643e-4ddd-8f57-84b62538081a"
        );
    }

    #[test]
    fn test_parse_bulk_response_partial_failure() {
        let docs = vec![
            person("2e01e457-f993-4bfe-87c3-de2ef8626cc7", "Mae Questel"),
            person("448b9382-f235-478b-a013-d127f421ea4a", "Jackson Beck"),
            person("89d4622f-5dde-4257-9401-36e3052de105", "Jack Mercer"),
        ];
        let response = json!({
            "errors": true,
            "items": [
                {"index": {"_id": "2e01e457-f993-4bfe-87c3-de2ef8626cc7", "status": 200}},
                {"index": {"_id": "448b9382-f235-478b-a013-d127f421ea4a", "status": 429,
                    "error": {"type": "es_rejected_execution_exception", "reason": "queue full"}}},
                {"index": {"status": 400,
                    "error": {"type": "strict_dynamic_mapping_exception", "reason": "unknown field"}}}
            ]
        });

        let summary = OpenSearchProvider::parse_bulk_response(&response, &docs).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);

        let retryable: Vec<_> = summary
            .failures()
            .filter(|r| r.is_retryable_failure())
            .map(|r| r.document_id.clone())
            .collect();
        assert_eq!(retryable, vec!["448b9382-f235-478b-a013-d127f421ea4a"]);

        // Missing _id falls back to the document at the same position
        assert_eq!(
            summary.results[2].document_id,
            "89d4622f-5dde-4257-9401-36e3052de105"
        );
        assert!(matches!(
            summary.results[2].error,
            Some(SearchIndexError::DocumentRejected { status: 400, .. })
        ));
    }

    #[test]
    fn test_parse_bulk_response_item_count_mismatch() {
        let docs = vec![person("2e01e457-f993-4bfe-87c3-de2ef8626cc7", "Mae Questel")];
        let response = json!({"errors": false, "items": []});

        let result = OpenSearchProvider::parse_bulk_response(&response, &docs);
        assert!(matches!(result, Err(SearchIndexError::ParseError(_))));
    }

    #[test]
    fn test_parse_bulk_response_without_items() {
        let response = json!({"error": "boom"});
        assert!(OpenSearchProvider::parse_bulk_response(&response, &[]).is_err());
    }

    #[test]
    fn test_creation_error_keeps_retryable_status() {
        let err = OpenSearchProvider::creation_error("movies", 503, "unavailable".to_string());
        assert!(matches!(
            err,
            SearchIndexError::HttpStatus { status: 503, ref message } if message == "unavailable"
        ));
        assert!(err.is_transient());

        let err = OpenSearchProvider::creation_error(
            "movies",
            400,
            "mapper_parsing_exception".to_string(),
        );
        assert!(matches!(err, SearchIndexError::IndexCreationError(_)));
        assert!(err.to_string().contains("mapper_parsing_exception"));
        assert!(!err.is_transient());
    }
}
