//! OpenSearch index configuration and mappings.
//!
//! This module defines the settings and per-kind mappings for the catalog indices.

use catalog_indexer_shared::EntityKind;
use serde_json::{json, Value};

use crate::types::IndexDefinition;

/// Name of the analyzer applied to every free-text field.
pub const TEXT_ANALYZER: &str = "ru_en";

/// Get the index settings shared by all catalog indices.
///
/// The configuration includes:
/// - **refresh_interval**: 1s, so loaded documents become searchable quickly
/// - **ru_en analyzer**: standard tokenizer with lowercasing, English and Russian
///   stopword removal and stemming, and English possessive stemming
pub fn get_index_settings() -> Value {
    json!({
        "refresh_interval": "1s",
        "analysis": {
            "filter": {
                "english_stop": {"type": "stop", "stopwords": "_english_"},
                "english_stemmer": {"type": "stemmer", "language": "english"},
                "english_possessive_stemmer": {"type": "stemmer", "language": "possessive_english"},
                "russian_stop": {"type": "stop", "stopwords": "_russian_"},
                "russian_stemmer": {"type": "stemmer", "language": "russian"}
            },
            "analyzer": {
                TEXT_ANALYZER: {
                    "tokenizer": "standard",
                    "filter": [
                        "lowercase",
                        "english_stop",
                        "english_stemmer",
                        "english_possessive_stemmer",
                        "russian_stop",
                        "russian_stemmer"
                    ]
                }
            }
        }
    })
}

fn text() -> Value {
    json!({"type": "text", "analyzer": TEXT_ANALYZER})
}

fn text_with_raw() -> Value {
    json!({
        "type": "text",
        "analyzer": TEXT_ANALYZER,
        "fields": {
            "raw": {"type": "keyword"}
        }
    })
}

fn keyword() -> Value {
    json!({"type": "keyword"})
}

/// Nested `{id, name}` list, so a person or genre id stays paired with its name in queries.
fn related_entities() -> Value {
    json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "id": keyword(),
            "name": text()
        }
    })
}

/// Get the mappings for the index of the given kind.
///
/// All mappings are `strict`: a document carrying an unmapped field is rejected
/// instead of silently widening the schema.
pub fn get_index_mappings(kind: EntityKind) -> Value {
    match kind {
        EntityKind::Movie => json!({
            "dynamic": "strict",
            "properties": {
                "id": keyword(),
                "imdb_rating": {"type": "float"},
                "title": text_with_raw(),
                "description": text(),
                "genres_name": keyword(),
                "directors_name": text(),
                "actors_names": text(),
                "writers_names": text(),
                "genres": related_entities(),
                "directors": related_entities(),
                "actors": related_entities(),
                "writers": related_entities()
            }
        }),
        EntityKind::Genre => json!({
            "dynamic": "strict",
            "properties": {
                "id": keyword(),
                "name": keyword(),
                "description": text()
            }
        }),
        EntityKind::Person => json!({
            "dynamic": "strict",
            "properties": {
                "id": keyword(),
                "name": text_with_raw()
            }
        }),
    }
}

/// Full definition (name, settings, mappings) of the index for `kind`.
pub fn index_definition(kind: EntityKind) -> IndexDefinition {
    IndexDefinition {
        name: kind.index_name().to_string(),
        settings: get_index_settings(),
        mappings: get_index_mappings(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_settings_structure() {
        let settings = get_index_settings();

        assert_eq!(settings["refresh_interval"], "1s");
        let filters = settings["analysis"]["analyzer"][TEXT_ANALYZER]["filter"]
            .as_array()
            .unwrap();
        assert!(filters.iter().any(|f| f == "english_stemmer"));
        assert!(filters.iter().any(|f| f == "russian_stop"));
        assert_eq!(filters[0], "lowercase");
    }

    #[test]
    fn test_movie_mappings() {
        let mappings = get_index_mappings(EntityKind::Movie);
        let props = &mappings["properties"];

        assert_eq!(mappings["dynamic"], "strict");
        assert_eq!(props["id"]["type"], "keyword");
        assert_eq!(props["title"]["analyzer"], TEXT_ANALYZER);
        assert_eq!(props["title"]["fields"]["raw"]["type"], "keyword");

        for relation in ["genres", "directors", "actors", "writers"] {
            assert_eq!(props[relation]["type"], "nested", "{relation} should be nested");
            assert_eq!(props[relation]["properties"]["id"]["type"], "keyword");
        }
    }

    #[test]
    fn test_genre_and_person_mappings() {
        let genre = get_index_mappings(EntityKind::Genre);
        assert_eq!(genre["properties"]["name"]["type"], "keyword");
        assert_eq!(genre["properties"]["description"]["type"], "text");

        let person = get_index_mappings(EntityKind::Person);
        assert_eq!(person["properties"]["name"]["fields"]["raw"]["type"], "keyword");
        assert!(person["properties"].get("full_name").is_none());
    }

    #[test]
    fn test_index_definition_names() {
        for kind in EntityKind::ALL {
            assert_eq!(index_definition(kind).name, kind.index_name());
        }
    }
}
