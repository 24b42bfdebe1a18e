//! Document types for the catalog search indices.
//!
//! Each struct is the exact shape written to its index. Documents are always
//! written whole, so every field is serialized, including `null` scalars;
//! list-valued fields are never `null`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An `{id, name}` pair for a genre or person linked to a movie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelatedEntity {
    pub id: Uuid,
    pub name: String,
}

impl RelatedEntity {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Document stored in the `movies` index.
///
/// The flat `*_name(s)` lists feed full-text search, the nested object lists
/// keep each person/genre id paired with its name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDocument {
    pub id: Uuid,
    pub imdb_rating: Option<f64>,
    pub title: String,
    pub description: Option<String>,
    pub genres_name: Vec<String>,
    pub directors_name: Vec<String>,
    pub actors_names: Vec<String>,
    pub writers_names: Vec<String>,
    pub genres: Vec<RelatedEntity>,
    pub directors: Vec<RelatedEntity>,
    pub actors: Vec<RelatedEntity>,
    pub writers: Vec<RelatedEntity>,
}

/// Document stored in the `genres` index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreDocument {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Document stored in the `persons` index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonDocument {
    pub id: Uuid,
    pub name: String,
}

/// A load-ready document of any kind.
///
/// Serializes as the inner document, without a tag.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CatalogDocument {
    Movie(MovieDocument),
    Genre(GenreDocument),
    Person(PersonDocument),
}

impl CatalogDocument {
    /// The entity id, used as the document id in the index.
    pub fn id(&self) -> Uuid {
        match self {
            CatalogDocument::Movie(doc) => doc.id,
            CatalogDocument::Genre(doc) => doc.id,
            CatalogDocument::Person(doc) => doc.id,
        }
    }
}

impl From<MovieDocument> for CatalogDocument {
    fn from(doc: MovieDocument) -> Self {
        CatalogDocument::Movie(doc)
    }
}

impl From<GenreDocument> for CatalogDocument {
    fn from(doc: GenreDocument) -> Self {
        CatalogDocument::Genre(doc)
    }
}

impl From<PersonDocument> for CatalogDocument {
    fn from(doc: PersonDocument) -> Self {
        CatalogDocument::Person(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_document_serializes_untagged() {
        let id = Uuid::parse_str("2e01e457-f993-4bfe-87c3-de2ef8626cc7").unwrap();
        let doc = CatalogDocument::from(PersonDocument {
            id,
            name: "Mae Questel".to_string(),
        });

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "2e01e457-f993-4bfe-87c3-de2ef8626cc7",
                "name": "Mae Questel"
            })
        );
        assert_eq!(doc.id(), id);
    }

    #[test]
    fn test_movie_document_keeps_null_scalars_and_empty_lists() {
        let doc = MovieDocument {
            id: Uuid::new_v4(),
            imdb_rating: None,
            title: "Star".to_string(),
            description: None,
            genres_name: vec![],
            directors_name: vec![],
            actors_names: vec![],
            writers_names: vec![],
            genres: vec![],
            directors: vec![],
            actors: vec![],
            writers: vec![],
        };

        let value = serde_json::to_value(CatalogDocument::from(doc)).unwrap();
        assert!(value["description"].is_null());
        assert!(value["imdb_rating"].is_null());
        assert_eq!(value["genres"], serde_json::json!([]));
        assert_eq!(value["directors_name"], serde_json::json!([]));
    }
}
