//! Configuration for the ingestion and retrieval pipeline.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// How source text is split into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Fixed-width character windows.
    FixedSize,
    /// Paragraph → line → sentence → word splitting, hard cut as a last resort.
    #[default]
    Recursive,
}

/// How candidates are selected from the vector index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// The `k` nearest chunks, nearest first.
    Similarity {
        /// Number of chunks to return.
        k: usize,
    },
    /// Maximal marginal relevance over a pool of `fetch_k` nearest chunks.
    Mmr {
        /// Number of chunks to return.
        k: usize,
        /// Size of the candidate pool fetched before diversification.
        fetch_k: usize,
        /// Relevance/diversity balance: 1.0 is pure relevance, 0.0 pure diversity.
        lambda: f32,
    },
}

impl RetrievalStrategy {
    /// Number of chunks the strategy returns.
    pub fn k(&self) -> usize {
        match self {
            RetrievalStrategy::Similarity { k } | RetrievalStrategy::Mmr { k, .. } => *k,
        }
    }
}

impl Default for RetrievalStrategy {
    fn default() -> Self {
        RetrievalStrategy::Mmr { k: 5, fetch_k: 20, lambda: 0.5 }
    }
}

/// Configuration parameters for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Which chunker the loaders use.
    pub chunking: ChunkingStrategy,
    /// How candidates are pulled from the index.
    pub retrieval: RetrievalStrategy,
    /// Number of chunks kept after reranking. `None` skips reranking.
    pub rerank_top_k: Option<usize>,
    /// Maximum number of scoring calls in flight at once.
    pub rerank_parallelism: usize,
    /// Per-call timeout for the embedding and generation services, in seconds.
    pub request_timeout_secs: u64,
    /// Number of chunks embedded and upserted per round trip during ingestion.
    pub embed_batch_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            chunking: ChunkingStrategy::default(),
            retrieval: RetrievalStrategy::default(),
            rerank_top_k: Some(3),
            rerank_parallelism: 4,
            request_timeout_secs: 60,
            embed_batch_size: 64,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// The per-call timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - the retrieval `k` is zero, or `fetch_k < k`
    /// - the MMR `lambda` is outside `[0, 1]`
    /// - `rerank_top_k`, `rerank_parallelism` or `embed_batch_size` is zero
    pub fn validate(&self) -> Result<()> {
        validate_chunking(self.chunk_size, self.chunk_overlap)?;

        match self.retrieval {
            RetrievalStrategy::Similarity { k } => {
                if k == 0 {
                    return Err(RagError::ConfigError("k must be greater than zero".to_string()));
                }
            }
            RetrievalStrategy::Mmr { k, fetch_k, lambda } => {
                if k == 0 {
                    return Err(RagError::ConfigError("k must be greater than zero".to_string()));
                }
                if fetch_k < k {
                    return Err(RagError::ConfigError(format!(
                        "fetch_k ({fetch_k}) must not be less than k ({k})"
                    )));
                }
                if !(0.0..=1.0).contains(&lambda) {
                    return Err(RagError::ConfigError(format!(
                        "lambda ({lambda}) must be within [0, 1]"
                    )));
                }
            }
        }

        if self.rerank_top_k == Some(0) {
            return Err(RagError::ConfigError(
                "rerank_top_k must be greater than zero".to_string(),
            ));
        }
        if self.rerank_parallelism == 0 {
            return Err(RagError::ConfigError(
                "rerank_parallelism must be greater than zero".to_string(),
            ));
        }
        if self.embed_batch_size == 0 {
            return Err(RagError::ConfigError(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate a chunk size / overlap pair.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] if `chunk_size` is zero or
/// `chunk_overlap >= chunk_size`.
pub fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::ConfigError(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Choose the chunking strategy.
    pub fn chunking(mut self, strategy: ChunkingStrategy) -> Self {
        self.config.chunking = strategy;
        self
    }

    /// Choose the retrieval strategy.
    pub fn retrieval(mut self, strategy: RetrievalStrategy) -> Self {
        self.config.retrieval = strategy;
        self
    }

    /// Set how many chunks survive reranking, or `None` to disable it.
    pub fn rerank_top_k(mut self, top_k: Option<usize>) -> Self {
        self.config.rerank_top_k = top_k;
        self
    }

    /// Set the maximum number of concurrent scoring calls.
    pub fn rerank_parallelism(mut self, parallelism: usize) -> Self {
        self.config.rerank_parallelism = parallelism;
        self
    }

    /// Set the per-call service timeout in seconds.
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Set the ingestion batch size.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Where the loaders find their input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourcePaths {
    /// Tabular file with `id, topic, information` columns.
    pub csv: PathBuf,
    /// Directory of `*.pdf` files.
    pub pdf_dir: PathBuf,
    /// Directory of `*.txt` files.
    pub txt_dir: PathBuf,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            csv: PathBuf::from("rag_data.csv"),
            pdf_dir: PathBuf::from("data/pdfs"),
            txt_dir: PathBuf::from("data/txts"),
        }
    }
}

impl SourcePaths {
    /// Resolve all paths relative to `root`.
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let defaults = Self::default();
        Self {
            csv: root.join(defaults.csv),
            pdf_dir: root.join(defaults.pdf_dir),
            txt_dir: root.join(defaults.txt_dir),
        }
    }
}

/// Location and name of the persisted vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexSettings {
    /// Directory holding the on-disk index.
    pub persist_dir: PathBuf,
    /// Collection name inside the index.
    pub collection: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            persist_dir: PathBuf::from("knowrn_db"),
            collection: "Nishant_gakare_information".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.retrieval, RetrievalStrategy::Mmr { k: 5, fetch_k: 20, lambda: 0.5 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
        assert!(RagConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
    }

    #[test]
    fn fetch_k_must_cover_k() {
        let result = RagConfig::builder()
            .retrieval(RetrievalStrategy::Mmr { k: 10, fetch_k: 5, lambda: 0.5 })
            .build();
        assert!(matches!(result, Err(RagError::ConfigError(_))));
    }

    #[test]
    fn lambda_out_of_range_is_rejected() {
        let result = RagConfig::builder()
            .retrieval(RetrievalStrategy::Mmr { k: 5, fetch_k: 20, lambda: 1.5 })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn zero_rerank_top_k_is_rejected_but_none_disables() {
        assert!(RagConfig::builder().rerank_top_k(Some(0)).build().is_err());
        let config = RagConfig::builder().rerank_top_k(None).build().unwrap();
        assert_eq!(config.rerank_top_k, None);
    }

    #[test]
    fn retrieval_strategy_serializes_with_type_tag() {
        let json = serde_json::to_value(RetrievalStrategy::Similarity { k: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "similarity", "k": 3 }));
    }

    #[test]
    fn source_paths_resolve_under_root() {
        let paths = SourcePaths::under("/srv/kb");
        assert_eq!(paths.csv, PathBuf::from("/srv/kb/rag_data.csv"));
        assert_eq!(paths.pdf_dir, PathBuf::from("/srv/kb/data/pdfs"));
    }
}
