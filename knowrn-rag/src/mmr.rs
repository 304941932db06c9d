//! Maximal Marginal Relevance (MMR) for diversity-aware selection.
//!
//! MMR picks results one at a time, each maximizing
//! `λ × sim(query, doc) - (1 - λ) × max(sim(doc, already_selected))`.
//!
//! λ = 1.0: pure relevance (plain similarity order)
//! λ = 0.0: pure diversity

use crate::document::SearchResult;
use crate::similarity::cosine_similarity;

/// Select `k` of `candidates` by maximal marginal relevance.
///
/// `candidates` should carry their embeddings. Results keep their original
/// similarity score and come back in selection order. Ties go to the earlier
/// candidate, so with λ = 1 the input order (nearest first) is preserved.
pub fn mmr_select(
    query: &[f32],
    candidates: Vec<SearchResult>,
    k: usize,
    lambda: f32,
) -> Vec<SearchResult> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let k = k.min(candidates.len());
    let relevance: Vec<f32> =
        candidates.iter().map(|c| cosine_similarity(query, &c.chunk.embedding)).collect();

    let mut remaining: Vec<(f32, SearchResult)> = relevance.into_iter().zip(candidates).collect();
    let mut selected: Vec<SearchResult> = Vec::with_capacity(k);

    while selected.len() < k && !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (idx, (relevance, candidate)) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|s| cosine_similarity(&candidate.chunk.embedding, &s.chunk.embedding))
                .fold(f32::NEG_INFINITY, f32::max);
            let redundancy = if redundancy.is_finite() { redundancy } else { 0.0 };

            let score = lambda * relevance - (1.0 - lambda) * redundancy;
            if score > best_score {
                best_score = score;
                best_idx = idx;
            }
        }

        let (_, best) = remaining.remove(best_idx);
        selected.push(best);
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Chunk, SourceKind};

    fn candidate(id: usize, score: f32, embedding: Vec<f32>) -> SearchResult {
        let mut chunk = Chunk::new(SourceKind::Txt, "c", id, format!("text {id}"), "c.txt");
        chunk.embedding = embedding;
        SearchResult { chunk, score }
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.chunk.id.as_str()).collect()
    }

    #[test]
    fn empty_or_zero_k_selects_nothing() {
        assert!(mmr_select(&[1.0, 0.0], Vec::new(), 3, 0.5).is_empty());
        let single = vec![candidate(0, 1.0, vec![1.0, 0.0])];
        assert!(mmr_select(&[1.0, 0.0], single, 0, 0.5).is_empty());
    }

    #[test]
    fn pure_relevance_preserves_similarity_order() {
        let candidates = vec![
            candidate(0, 0.99, vec![0.9, 0.1]),
            candidate(1, 0.98, vec![0.88, 0.12]),
            candidate(2, 0.70, vec![0.5, 0.5]),
        ];
        let results = mmr_select(&[1.0, 0.0], candidates, 3, 1.0);
        assert_eq!(ids(&results), vec!["txt-c-0", "txt-c-1", "txt-c-2"]);
    }

    #[test]
    fn balanced_lambda_skips_near_duplicates() {
        let candidates = vec![
            candidate(0, 0.99, vec![0.99, 0.01, 0.0]),
            candidate(1, 0.98, vec![0.98, 0.02, 0.0]),
            candidate(2, 0.10, vec![0.0, 0.0, 1.0]),
        ];
        let results = mmr_select(&[1.0, 0.0, 0.0], candidates, 2, 0.5);
        assert_eq!(ids(&results), vec!["txt-c-0", "txt-c-2"]);
    }

    #[test]
    fn k_larger_than_pool_returns_whole_pool() {
        let candidates = vec![candidate(0, 0.9, vec![1.0, 0.0]), candidate(1, 0.8, vec![0.0, 1.0])];
        assert_eq!(mmr_select(&[1.0, 0.0], candidates, 10, 0.5).len(), 2);
    }

    #[test]
    fn original_scores_are_kept() {
        let candidates = vec![candidate(0, 0.42, vec![1.0, 0.0])];
        let results = mmr_select(&[1.0, 0.0], candidates, 1, 0.3);
        assert_eq!(results[0].score, 0.42);
    }
}
