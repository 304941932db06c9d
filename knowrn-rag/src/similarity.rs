//! Vector similarity helpers shared by the stores and the MMR selector.

use std::cmp::Ordering;

use crate::document::SearchResult;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Sort by descending score, breaking ties by chunk ID so equal scores come
/// back in the same order on every run, then keep the first `top_k`.
pub(crate) fn rank_descending(results: &mut Vec<SearchResult>, top_k: usize) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    results.truncate(top_k);
}
