//! Catalog processor implementation.
//!
//! Transforms extracted rows into the documents stored in the search indices.

use tracing::{debug, instrument};

use catalog_indexer_repository::{ExtractedBatch, GenreRow, Json, MovieRow, PersonRow};
use catalog_indexer_shared::{
    CatalogDocument, GenreDocument, MovieDocument, PersonDocument, RelatedEntity,
};

/// Processor that turns extracted batches into index documents.
///
/// Transformation is pure: it reads the batch, never mutates it, and yields
/// the same documents for the same rows, so a retried batch can simply be
/// transformed again.
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogProcessor;

impl CatalogProcessor {
    /// Create a new catalog processor.
    pub fn new() -> Self {
        Self
    }

    /// Transform a batch of rows into documents, one per row, in row order.
    #[instrument(skip(self, batch), fields(kind = %batch.kind(), row_count = batch.len()))]
    pub fn transform(&self, batch: &ExtractedBatch) -> Vec<CatalogDocument> {
        let documents: Vec<CatalogDocument> = match batch {
            ExtractedBatch::Movies(rows) => rows.iter().map(|r| movie_document(r).into()).collect(),
            ExtractedBatch::Genres(rows) => rows.iter().map(|r| genre_document(r).into()).collect(),
            ExtractedBatch::Persons(rows) => {
                rows.iter().map(|r| person_document(r).into()).collect()
            }
        };

        debug!(document_count = documents.len(), "Transformed batch");
        documents
    }
}

fn names(values: &Option<Vec<String>>) -> Vec<String> {
    values.clone().unwrap_or_default()
}

fn entities(values: &Option<Json<Vec<RelatedEntity>>>) -> Vec<RelatedEntity> {
    values
        .as_ref()
        .map(|json| json.0.clone())
        .unwrap_or_default()
}

fn movie_document(row: &MovieRow) -> MovieDocument {
    MovieDocument {
        id: row.id,
        imdb_rating: row.imdb_rating,
        title: row.title.clone(),
        description: row.description.clone(),
        genres_name: names(&row.genres_name),
        directors_name: names(&row.directors_names),
        actors_names: names(&row.actors_names),
        writers_names: names(&row.writers_names),
        genres: entities(&row.genres),
        directors: entities(&row.directors),
        actors: entities(&row.actors),
        writers: entities(&row.writers),
    }
}

fn genre_document(row: &GenreRow) -> GenreDocument {
    GenreDocument {
        id: row.id,
        name: row.name.clone(),
        description: row.description.clone(),
    }
}

fn person_document(row: &PersonRow) -> PersonDocument {
    PersonDocument {
        id: row.id,
        name: row.full_name.clone(),
    }
}
