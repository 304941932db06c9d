//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the offline ingest run (load → chunk →
//! embed → upsert) and per-question answering (retrieve → rerank → generate)
//! over an [`EmbeddingProvider`], a [`VectorStore`] and a [`TextGenerator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use knowrn_rag::{RagConfig, RagPipeline, SledVectorStore, SourcePaths};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(SledVectorStore::open("knowrn_db")?))
//!     .generator(Arc::new(generator))
//!     .build()?;
//!
//! pipeline.create_collection().await?;
//! pipeline.ingest(&SourcePaths::default()).await?;
//! let response = pipeline.answer("What instrument does he play?").await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::chunking::chunker_for;
use crate::config::{IndexSettings, RagConfig, SourcePaths};
use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;
use crate::loader::{LoadReport, SourceLoader};
use crate::pdf::PdfLoader;
use crate::reranker::{LlmReranker, Reranker};
use crate::retriever::Retriever;
use crate::sync::IndexSynchronizer;
use crate::tabular::TabularLoader;
use crate::text::TextLoader;
use crate::vectorstore::VectorStore;

/// Answer returned when retrieval finds nothing to ground a reply in.
pub const NO_CONTEXT_ANSWER: &str = "I don't have enough information about that yet.";

/// Build the answer prompt from the assembled context.
pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a knowledgeable assistant.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\
         Answer the question using ONLY the context. If not in context, reply: \
         \"{NO_CONTEXT_ANSWER}\"\n"
    )
}

/// The answer to one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    /// The question as asked.
    pub question: String,
    /// The model's answer.
    pub answer: String,
    /// Provenance labels of the context chunks, in context order.
    pub sources: Vec<String>,
}

/// A structured failure for a question that could not be answered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryFailure {
    /// The question as asked.
    pub question: String,
    /// Error category, see [`RagError::kind`].
    pub error_kind: String,
    /// Human-readable description.
    pub message: String,
}

impl QueryFailure {
    /// Describe `error` as the failure to answer `question`.
    pub fn new(question: &str, error: &RagError) -> Self {
        Self {
            question: question.to_string(),
            error_kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Chunks loaded from each source kind in one run.
#[derive(Debug, Default)]
pub struct LoadedSources {
    /// Tabular rows.
    pub csv: LoadReport,
    /// PDF files.
    pub pdf: LoadReport,
    /// Text files.
    pub txt: LoadReport,
}

impl LoadedSources {
    /// All chunks in CSV, PDF, TXT order.
    pub fn chunks(&self) -> Vec<Chunk> {
        [&self.csv, &self.pdf, &self.txt]
            .into_iter()
            .flat_map(|report| report.chunks.iter().cloned())
            .collect()
    }

    /// Every non-fatal problem recorded while loading.
    pub fn skipped(&self) -> impl Iterator<Item = &RagError> {
        [&self.csv, &self.pdf, &self.txt].into_iter().flat_map(|report| report.skipped.iter())
    }
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct IngestReport {
    /// Chunks loaded from the CSV file.
    pub csv_chunks: usize,
    /// Chunks loaded from PDFs.
    pub pdf_chunks: usize,
    /// Chunks loaded from text files.
    pub txt_chunks: usize,
    /// Missing sources and skipped items, as messages.
    pub skipped: Vec<String>,
    /// Chunks written to the index.
    pub synced: usize,
}

impl IngestReport {
    /// Chunks loaded across all sources.
    pub fn total_chunks(&self) -> usize {
        self.csv_chunks + self.pdf_chunks + self.txt_chunks
    }
}

/// The pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`]. The vector store is passed
/// in already opened, so the same handle serves ingestion and queries.
pub struct RagPipeline {
    config: RagConfig,
    collection: String,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    generator: Arc<dyn TextGenerator>,
    retriever: Retriever,
    reranker: Option<Arc<dyn Reranker>>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// The collection this pipeline reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Create the pipeline's collection if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the vector store operation fails.
    pub async fn create_collection(&self) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(&self.collection, dimensions).await.map_err(|e| {
            error!(collection = %self.collection, error = %e, "failed to create collection");
            RagError::PipelineError(format!(
                "failed to create collection '{}': {e}",
                self.collection
            ))
        })
    }

    /// Check that the collection exists without creating it, returning
    /// the number of indexed chunks.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStoreError`] if the collection is missing
    /// or the store cannot be read.
    pub async fn ensure_collection(&self) -> Result<usize> {
        self.vector_store.count(&self.collection).await.map_err(|e| {
            error!(collection = %self.collection, error = %e, "collection unavailable");
            e
        })
    }

    /// Run the three loaders over `paths` without touching the index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the chunking parameters are invalid.
    pub async fn load_sources(&self, paths: &SourcePaths) -> Result<LoadedSources> {
        let chunker = chunker_for(&self.config)?;
        Ok(LoadedSources {
            csv: TabularLoader::new(chunker.clone()).load(&paths.csv).await,
            pdf: PdfLoader::new(chunker.clone()).load(&paths.pdf_dir).await,
            txt: TextLoader::new(chunker).load(&paths.txt_dir).await,
        })
    }

    /// Load every source and upsert the resulting chunks.
    ///
    /// Safe to re-run: unchanged sources produce the same chunk IDs and
    /// overwrite their own entries. Chunks whose source was removed stay in
    /// the index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::SyncError`] if embedding or storage fails mid-run.
    pub async fn ingest(&self, paths: &SourcePaths) -> Result<IngestReport> {
        let loaded = self.load_sources(paths).await?;
        let chunks = loaded.chunks();

        let mut report = IngestReport {
            csv_chunks: loaded.csv.chunks.len(),
            pdf_chunks: loaded.pdf.chunks.len(),
            txt_chunks: loaded.txt.chunks.len(),
            skipped: loaded.skipped().map(ToString::to_string).collect(),
            synced: 0,
        };
        info!(
            csv = report.csv_chunks,
            pdf = report.pdf_chunks,
            txt = report.txt_chunks,
            total = report.total_chunks(),
            skipped = report.skipped.len(),
            "loaded sources"
        );

        let synchronizer = IndexSynchronizer::new(
            self.embedding_provider.clone(),
            self.vector_store.clone(),
            self.collection.clone(),
        )
        .with_batch_size(self.config.embed_batch_size);

        report.synced = synchronizer.sync(&chunks).await?;
        Ok(report)
    }

    /// Retrieve context candidates for `question`, reranked when enabled.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] for a blank question, otherwise
    /// propagates embedding, store and generation failures.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        if question.trim().is_empty() {
            return Err(RagError::PipelineError("question must not be empty".to_string()));
        }

        let candidates = self.retriever.retrieve(question).await?;

        match (&self.reranker, self.config.rerank_top_k) {
            (Some(reranker), Some(top_k)) => reranker.rerank(question, candidates, top_k).await,
            _ => Ok(candidates),
        }
    }

    /// Answer `question` from the retrieved context.
    ///
    /// # Errors
    ///
    /// Propagates retrieval failures; returns [`RagError::GenerationError`]
    /// if the answer call fails or exceeds the request timeout.
    pub async fn answer(&self, question: &str) -> Result<QueryResponse> {
        let context_chunks = self.retrieve(question).await?;
        let sources: Vec<String> =
            context_chunks.iter().map(|r| r.source_label().to_string()).collect();

        if context_chunks.is_empty() {
            info!(question, "no context retrieved");
            return Ok(QueryResponse {
                question: question.to_string(),
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources,
            });
        }

        let context =
            context_chunks.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");
        let prompt = answer_prompt(&context, question);

        let timeout = self.config.request_timeout();
        let answer = tokio::time::timeout(timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| RagError::GenerationError {
                provider: "answer".to_string(),
                message: format!("timed out after {timeout:?}"),
            })??;

        info!(source_count = sources.len(), "answered question");
        Ok(QueryResponse {
            question: question.to_string(),
            answer: answer.trim().to_string(),
            sources,
        })
    }

    /// Like [`answer`](Self::answer), but turns any failure into a
    /// [`QueryFailure`] suitable for returning to a client.
    pub async fn respond(
        &self,
        question: &str,
    ) -> std::result::Result<QueryResponse, QueryFailure> {
        self.answer(question).await.map_err(|e| {
            error!(question, error = %e, "query failed");
            QueryFailure::new(question, &e)
        })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config` defaults to [`RagConfig::default`] and `collection` to the
/// default [`IndexSettings`] collection. The embedding provider, vector
/// store and generator are required. When `rerank_top_k` is set and no
/// reranker is given, an [`LlmReranker`] over the generator is used.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    collection: Option<String>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    generator: Option<Arc<dyn TextGenerator>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the collection name.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the text generator used for answers (and default reranking).
    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Override the reranker.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Build the [`RagPipeline`], validating the configuration and that all
    /// required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or
    /// the configuration is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let collection =
            self.collection.unwrap_or_else(|| IndexSettings::default().collection);
        if collection.is_empty() {
            return Err(RagError::ConfigError("collection must not be empty".to_string()));
        }
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;

        let reranker = match (self.reranker, config.rerank_top_k) {
            (Some(reranker), _) => Some(reranker),
            (None, Some(_)) => Some(Arc::new(
                LlmReranker::new(generator.clone())
                    .with_parallelism(config.rerank_parallelism)
                    .with_timeout(config.request_timeout()),
            ) as Arc<dyn Reranker>),
            (None, None) => None,
        };

        let retriever = Retriever::new(
            embedding_provider.clone(),
            vector_store.clone(),
            collection.clone(),
            config.retrieval,
        )
        .with_timeout(config.request_timeout());

        Ok(RagPipeline {
            config,
            collection,
            embedding_provider,
            vector_store,
            generator,
            retriever,
            reranker,
        })
    }
}
