//! Application configuration assembled from defaults and `KNOWRN_*`
//! environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use knowrn_rag::{ChunkingStrategy, IndexSettings, RagConfig, RetrievalStrategy, SourcePaths};
use knowrn_rag::ollama::{DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL, DEFAULT_GENERATION_MODEL};

/// Everything the CLI needs to build a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Input locations.
    pub sources: SourcePaths,
    /// Where the index lives.
    pub index: IndexSettings,
    /// Ollama server base URL.
    pub ollama_url: String,
    /// Model used for embeddings.
    pub embedding_model: String,
    /// Model used for answers and relevance scoring.
    pub generation_model: String,
    /// Pipeline parameters.
    pub rag: RagConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources: SourcePaths::default(),
            index: IndexSettings::default(),
            ollama_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            rag: RagConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from defaults overridden by whatever `lookup`
    /// returns for each `KNOWRN_*` key.
    ///
    /// Recognized keys: `KNOWRN_CSV`, `KNOWRN_PDF_DIR`, `KNOWRN_TXT_DIR`,
    /// `KNOWRN_PERSIST_DIR`, `KNOWRN_COLLECTION`, `KNOWRN_OLLAMA_URL`,
    /// `KNOWRN_EMBEDDING_MODEL`, `KNOWRN_GENERATION_MODEL`,
    /// `KNOWRN_CHUNK_SIZE`, `KNOWRN_CHUNK_OVERLAP`, `KNOWRN_CHUNKING`
    /// (`recursive` | `fixed`), `KNOWRN_RETRIEVAL` (`mmr` | `similarity`),
    /// `KNOWRN_TOP_K`, `KNOWRN_FETCH_K`, `KNOWRN_RERANK_TOP_K` (`0` disables
    /// reranking), `KNOWRN_RERANK_PARALLELISM`, `KNOWRN_TIMEOUT_SECS`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = get("KNOWRN_CSV") {
            config.sources.csv = PathBuf::from(path);
        }
        if let Some(path) = get("KNOWRN_PDF_DIR") {
            config.sources.pdf_dir = PathBuf::from(path);
        }
        if let Some(path) = get("KNOWRN_TXT_DIR") {
            config.sources.txt_dir = PathBuf::from(path);
        }
        if let Some(path) = get("KNOWRN_PERSIST_DIR") {
            config.index.persist_dir = PathBuf::from(path);
        }
        if let Some(name) = get("KNOWRN_COLLECTION") {
            config.index.collection = name;
        }
        if let Some(url) = get("KNOWRN_OLLAMA_URL") {
            config.ollama_url = url;
        }
        if let Some(model) = get("KNOWRN_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(model) = get("KNOWRN_GENERATION_MODEL") {
            config.generation_model = model;
        }

        let rag = &mut config.rag;
        if let Some(value) = get("KNOWRN_CHUNK_SIZE") {
            rag.chunk_size = parse("KNOWRN_CHUNK_SIZE", &value)?;
        }
        if let Some(value) = get("KNOWRN_CHUNK_OVERLAP") {
            rag.chunk_overlap = parse("KNOWRN_CHUNK_OVERLAP", &value)?;
        }
        if let Some(value) = get("KNOWRN_CHUNKING") {
            rag.chunking = match value.trim().to_ascii_lowercase().as_str() {
                "recursive" => ChunkingStrategy::Recursive,
                "fixed" | "fixed_size" => ChunkingStrategy::FixedSize,
                other => bail!("KNOWRN_CHUNKING must be 'recursive' or 'fixed', got '{other}'"),
            };
        }

        let top_k = get("KNOWRN_TOP_K").map(|v| parse("KNOWRN_TOP_K", &v)).transpose()?;
        let fetch_k = get("KNOWRN_FETCH_K").map(|v| parse("KNOWRN_FETCH_K", &v)).transpose()?;
        let strategy = get("KNOWRN_RETRIEVAL").map(|v| v.trim().to_ascii_lowercase());
        rag.retrieval = match (strategy.as_deref(), rag.retrieval) {
            (Some("similarity"), current) => {
                RetrievalStrategy::Similarity { k: top_k.unwrap_or(current.k()) }
            }
            (Some("mmr") | None, RetrievalStrategy::Mmr { k, fetch_k: pool, lambda }) => {
                RetrievalStrategy::Mmr {
                    k: top_k.unwrap_or(k),
                    fetch_k: fetch_k.unwrap_or(pool),
                    lambda,
                }
            }
            (Some("mmr") | None, RetrievalStrategy::Similarity { k }) => {
                RetrievalStrategy::Similarity { k: top_k.unwrap_or(k) }
            }
            (Some(other), _) => {
                bail!("KNOWRN_RETRIEVAL must be 'mmr' or 'similarity', got '{other}'")
            }
        };

        if let Some(value) = get("KNOWRN_RERANK_TOP_K") {
            let top_k: usize = parse("KNOWRN_RERANK_TOP_K", &value)?;
            rag.rerank_top_k = (top_k > 0).then_some(top_k);
        }
        if let Some(value) = get("KNOWRN_RERANK_PARALLELISM") {
            rag.rerank_parallelism = parse("KNOWRN_RERANK_PARALLELISM", &value)?;
        }
        if let Some(value) = get("KNOWRN_TIMEOUT_SECS") {
            rag.request_timeout_secs = parse("KNOWRN_TIMEOUT_SECS", &value)?;
        }

        config.rag.validate().context("invalid pipeline configuration")?;
        Ok(config)
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.trim().parse().with_context(|| format!("{key} has invalid value '{value}'"))
}
