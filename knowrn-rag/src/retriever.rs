//! Query-time candidate retrieval.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::config::RetrievalStrategy;
use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::mmr::mmr_select;
use crate::vectorstore::VectorStore;

/// Pulls candidate chunks for a question out of one collection.
///
/// Reads only; never writes to the store.
///
/// # Example
///
/// ```rust,ignore
/// use knowrn_rag::{RetrievalStrategy, Retriever};
///
/// let retriever = Retriever::new(embedder, store, "profile", RetrievalStrategy::default());
/// let candidates = retriever.retrieve("What instrument does he play?").await?;
/// ```
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    strategy: RetrievalStrategy,
    timeout: Option<Duration>,
}

impl Retriever {
    /// Create a retriever over `collection`.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        strategy: RetrievalStrategy,
    ) -> Self {
        Self {
            embedding_provider,
            vector_store,
            collection: collection.into(),
            strategy,
            timeout: None,
        }
    }

    /// Fail query embedding that takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The configured selection strategy.
    pub fn strategy(&self) -> RetrievalStrategy {
        self.strategy
    }

    /// Retrieve up to `k` chunks for `question` with the configured strategy.
    ///
    /// Returns fewer than `k` results when the collection is smaller.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] or [`RagError::VectorStoreError`]
    /// when the services fail.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embed_query(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during retrieval");
            e
        })?;

        let results = match self.strategy {
            RetrievalStrategy::Similarity { k } => self.search(&query_embedding, k).await?,
            RetrievalStrategy::Mmr { k, fetch_k, lambda } => {
                let pool = self.search(&query_embedding, fetch_k.max(k)).await?;
                debug!(pool = pool.len(), k, lambda, "diversifying candidate pool");
                mmr_select(&query_embedding, pool, k, lambda)
            }
        };

        debug!(collection = %self.collection, result_count = results.len(), "retrieved candidates");
        Ok(results)
    }

    async fn embed_query(&self, question: &str) -> Result<Vec<f32>> {
        let Some(timeout) = self.timeout else {
            return self.embedding_provider.embed(question).await;
        };
        tokio::time::timeout(timeout, self.embedding_provider.embed(question)).await.map_err(
            |_| RagError::EmbeddingError {
                provider: "query".to_string(),
                message: format!("timed out after {timeout:?}"),
            },
        )?
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        self.vector_store.search(&self.collection, embedding, top_k).await.map_err(|e| {
            error!(collection = %self.collection, error = %e, "vector store search failed");
            match e {
                RagError::VectorStoreError { .. } => e,
                other => RagError::VectorStoreError {
                    backend: "unknown".to_string(),
                    message: other.to_string(),
                },
            }
        })
    }
}
