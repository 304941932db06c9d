//! Second-stage reranking of retrieved candidates.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, warn};

use crate::document::SearchResult;
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;

/// A reranker that re-scores search results and keeps the best `top_k`.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank `results` for `query`, returning at most `top_k` of them in
    /// descending score order.
    async fn rerank(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;
}

/// A no-op reranker that keeps the retrieval order and scores.
///
/// Useful as a default when no reranking is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    async fn rerank(
        &self,
        _query: &str,
        mut results: Vec<SearchResult>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        results.truncate(top_k);
        Ok(results)
    }
}

/// Build the prompt asking the model for a 0–10 relevance score.
pub fn scoring_prompt(question: &str, content: &str) -> String {
    format!(
        "Question: {question}\n\
         Context: {content}\n\n\
         Score how relevant this context is to the question on a scale of 0 (irrelevant) \
         to 10 (very relevant).\n\
         Only return the number."
    )
}

/// Parse a model response as a relevance score.
///
/// # Errors
///
/// Returns [`RagError::ScoringParse`] unless the trimmed response is a
/// finite number.
pub fn parse_score(response: &str) -> Result<f32> {
    let trimmed = response.trim();
    match trimmed.parse::<f32>() {
        Ok(score) if score.is_finite() => Ok(score),
        _ => Err(RagError::ScoringParse { response: trimmed.to_string() }),
    }
}

/// Reranks by asking a language model to score each candidate.
///
/// One scoring call is made per candidate, at most `parallelism` at a time.
/// A response that does not parse as a number, or a call that exceeds the
/// timeout, scores 0 for that candidate only. A failing generation service
/// aborts the rerank. Candidates with equal scores keep their retrieval
/// order.
///
/// # Example
///
/// ```rust,ignore
/// use knowrn_rag::{LlmReranker, Reranker};
///
/// let reranker = LlmReranker::new(generator).with_parallelism(4);
/// let top = reranker.rerank("What instrument?", candidates, 3).await?;
/// ```
pub struct LlmReranker {
    generator: Arc<dyn TextGenerator>,
    parallelism: usize,
    timeout: Duration,
}

impl LlmReranker {
    /// Create a reranker that scores sequentially with a 60 second timeout.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator, parallelism: 1, timeout: Duration::from_secs(60) }
    }

    /// Allow up to `parallelism` scoring calls in flight.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn score(&self, question: &str, result: &SearchResult) -> Result<f32> {
        let prompt = scoring_prompt(question, &result.chunk.text);
        let response =
            match tokio::time::timeout(self.timeout, self.generator.generate(&prompt)).await {
                Ok(response) => response?,
                Err(_) => {
                    warn!(
                        chunk.id = %result.chunk.id,
                        timeout = ?self.timeout,
                        "scoring timed out, using 0"
                    );
                    return Ok(0.0);
                }
            };

        match parse_score(&response) {
            Ok(score) => {
                debug!(chunk.id = %result.chunk.id, score, "scored candidate");
                Ok(score)
            }
            Err(e) => {
                warn!(chunk.id = %result.chunk.id, error = %e, "unparseable score, using 0");
                Ok(0.0)
            }
        }
    }
}

#[async_trait]
impl Reranker for LlmReranker {
    async fn rerank(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if results.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        // `buffered` yields in input order, so scores line up with `results`.
        let futures: Vec<_> = results.iter().map(|r| self.score(query, r)).collect();
        let scores: Vec<f32> = stream::iter(futures)
            .buffered(self.parallelism)
            .try_collect()
            .await?;

        let mut rescored: Vec<SearchResult> = results
            .into_iter()
            .zip(scores)
            .map(|(result, score)| SearchResult { score, ..result })
            .collect();

        // Stable: equal scores keep retrieval order.
        rescored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        rescored.truncate(top_k);
        Ok(rescored)
    }
}
