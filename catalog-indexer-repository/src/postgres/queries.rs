//! Change-detection queries, one per entity kind.
//!
//! Every query binds the watermark once per timestamp it compares against, so
//! the parameter count must match [`watermark_params`].

use catalog_indexer_shared::EntityKind;

/// Film works changed directly or through a linked person or genre.
///
/// The change filter only picks film ids; aggregation runs over every relation
/// of those films so each row is a complete document.
///
/// Name lists stay `NULL` when a movie has no relation of that role; object
/// lists are always a JSON array.
pub const MOVIE_QUERY: &str = r#"
SELECT
    fw.id,
    fw.title,
    fw.description,
    fw.rating AS imdb_rating,
    fw.created,
    fw.modified,
    (ARRAY_AGG(DISTINCT g.name) FILTER (WHERE g.id IS NOT NULL))::text[] AS genres_name,
    (ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'actor'))::text[] AS actors_names,
    (ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'writer'))::text[] AS writers_names,
    (ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'director'))::text[] AS directors_names,
    COALESCE(
        JSON_AGG(DISTINCT jsonb_build_object('id', g.id, 'name', g.name))
            FILTER (WHERE g.id IS NOT NULL),
        '[]'
    ) AS genres,
    COALESCE(
        JSON_AGG(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name))
            FILTER (WHERE pfw.role = 'director'),
        '[]'
    ) AS directors,
    COALESCE(
        JSON_AGG(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name))
            FILTER (WHERE pfw.role = 'actor'),
        '[]'
    ) AS actors,
    COALESCE(
        JSON_AGG(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name))
            FILTER (WHERE pfw.role = 'writer'),
        '[]'
    ) AS writers
FROM content.film_work fw
LEFT JOIN content.person_film_work pfw ON pfw.film_work_id = fw.id
LEFT JOIN content.person p ON p.id = pfw.person_id
LEFT JOIN content.genre_film_work gfw ON gfw.film_work_id = fw.id
LEFT JOIN content.genre g ON g.id = gfw.genre_id
WHERE fw.id IN (
    SELECT cfw.id
    FROM content.film_work cfw
    LEFT JOIN content.person_film_work cpfw ON cpfw.film_work_id = cfw.id
    LEFT JOIN content.person cp ON cp.id = cpfw.person_id
    LEFT JOIN content.genre_film_work cgfw ON cgfw.film_work_id = cfw.id
    LEFT JOIN content.genre cg ON cg.id = cgfw.genre_id
    WHERE cfw.modified > $1 OR cp.modified > $2 OR cg.modified > $3
)
GROUP BY fw.id
ORDER BY fw.modified DESC
"#;

pub const GENRE_QUERY: &str = r#"
SELECT id, name, description, modified
FROM content.genre
WHERE modified > $1
ORDER BY modified DESC
"#;

pub const PERSON_QUERY: &str = r#"
SELECT id, full_name, modified
FROM content.person
WHERE modified > $1
ORDER BY modified DESC
"#;

/// SQL text of the extraction query for `kind`.
pub fn query_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Movie => MOVIE_QUERY,
        EntityKind::Genre => GENRE_QUERY,
        EntityKind::Person => PERSON_QUERY,
    }
}

/// How many times the watermark is bound into the query for `kind`.
pub fn watermark_params(kind: EntityKind) -> usize {
    match kind {
        EntityKind::Movie => 3,
        EntityKind::Genre | EntityKind::Person => 1,
    }
}
