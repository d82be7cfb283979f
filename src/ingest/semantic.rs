// src/ingest/semantic.rs
//! Near-duplicate gate on embeddings.

use tracing::debug;

use crate::error::Result;
use crate::store::{NewsStore, SimilarNews};

/// Cosine similarity of two vectors. Mismatched lengths, empty input or a
/// zero vector give 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Inclusive: a similarity exactly at the threshold is a duplicate.
pub fn is_semantic_duplicate(similarity: f64, threshold: f64) -> bool {
    similarity >= threshold
}

#[derive(Debug, Clone, PartialEq)]
pub enum SemanticVerdict {
    Duplicate(SimilarNews),
    Distinct,
    /// No embedding for this item, so no check was made.
    Unchecked,
}

/// Ask the store for the nearest neighbour above `threshold`.
pub async fn check_embedding(
    store: &dyn NewsStore,
    embedding: Option<&[f32]>,
    threshold: f64,
    match_count: usize,
) -> Result<SemanticVerdict> {
    let Some(embedding) = embedding else {
        return Ok(SemanticVerdict::Unchecked);
    };
    let matches = store
        .match_similar(embedding, threshold, match_count.max(1))
        .await?;
    let nearest = matches
        .into_iter()
        .max_by(|a, b| a.similarity.total_cmp(&b.similarity));
    match nearest {
        Some(m) if is_semantic_duplicate(m.similarity, threshold) => {
            debug!(existing = %m.id, similarity = m.similarity, "semantic match");
            Ok(SemanticVerdict::Duplicate(m))
        }
        _ => Ok(SemanticVerdict::Distinct),
    }
}
