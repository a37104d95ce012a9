//! Vector search over the stored course embeddings.
//!
//! Two retrieval modes share the same post-processing: filter on course
//! metadata, dedupe by course id, cut to `top_k` and join lecture sections.
//!
//! - Document mode ranks by cosine similarity of the rendered course document.
//! - Weighted mode combines the name, description and prerequisites vectors
//!   with [`FieldWeights`] and ranks by ascending squared L2 distance, the
//!   ordering a flat L2 index would produce.

use crate::document::{course_metadata, course_record};
use crate::filter::MetadataFilter;
use crate::index;
use crate::types::{EmbeddingField, FieldWeights, ScoredCourse};
use advisor_core::AppResult;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};

/// Cosine similarity in `[-1, 1]`; 0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Squared Euclidean distance. Callers must pass equal-length slices.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Rank courses by cosine similarity of their document embedding.
pub fn rank_by_document(
    conn: &Connection,
    query: &[f32],
    filter: Option<&MetadataFilter>,
    top_k: usize,
) -> AppResult<Vec<ScoredCourse>> {
    let mut scored: Vec<(String, f32)> = index::load_embeddings(conn, EmbeddingField::Document)?
        .into_iter()
        .filter(|(_, vector)| vector.len() == query.len())
        .map(|(course_id, vector)| {
            let score = cosine_similarity(query, &vector);
            (course_id, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    finish(conn, scored, filter, top_k)
}

/// Rank courses by L2 distance between the query and their weighted field vector.
pub fn rank_by_fields(
    conn: &Connection,
    query: &[f32],
    weights: &FieldWeights,
    filter: Option<&MetadataFilter>,
    top_k: usize,
) -> AppResult<Vec<ScoredCourse>> {
    let names: HashMap<String, Vec<f32>> =
        index::load_embeddings(conn, EmbeddingField::Name)?.into_iter().collect();
    let descriptions: HashMap<String, Vec<f32>> =
        index::load_embeddings(conn, EmbeddingField::Description)?.into_iter().collect();
    let prerequisites: HashMap<String, Vec<f32>> =
        index::load_embeddings(conn, EmbeddingField::Prerequisites)?.into_iter().collect();

    let mut scored = Vec::new();
    let mut skipped = 0usize;

    for course in index::load_courses(conn)? {
        let id = &course.course_id;
        let vectors = (names.get(id), descriptions.get(id), prerequisites.get(id));
        let (Some(name), Some(description), Some(prereq)) = vectors else {
            skipped += 1;
            continue;
        };

        if [name, description, prereq].iter().any(|v| v.len() != query.len()) {
            skipped += 1;
            continue;
        }

        let combined: Vec<f32> = (0..query.len())
            .map(|i| {
                (weights.name * name[i] as f64
                    + weights.description * description[i] as f64
                    + weights.prerequisites * prereq[i] as f64) as f32
            })
            .collect();

        scored.push((course.course_id, squared_l2(query, &combined)));
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} courses without complete field embeddings", skipped);
    }

    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    finish(conn, scored, filter, top_k)
}

/// Apply the filter, dedupe and cut an already ordered candidate list.
fn finish(
    conn: &Connection,
    ranked: Vec<(String, f32)>,
    filter: Option<&MetadataFilter>,
    top_k: usize,
) -> AppResult<Vec<ScoredCourse>> {
    let mut seen = HashSet::new();
    let mut results = Vec::new();

    if top_k == 0 {
        return Ok(results);
    }

    for (course_id, score) in ranked {
        if !seen.insert(course_id.clone()) {
            continue;
        }

        let Some(course) = index::get_course(conn, &course_id)? else {
            continue;
        };
        let sections = index::sections_for_course(conn, &course_id)?;

        if let Some(filter) = filter {
            if !filter.matches(&course_metadata(&course, &sections)) {
                continue;
            }
        }

        results.push(ScoredCourse {
            course_id,
            score,
            record: course_record(&course, &sections),
        });

        if results.len() >= top_k {
            break;
        }
    }

    tracing::debug!("Retrieved {} courses", results.len());
    Ok(results)
}
