//! Reconciles loaded chunks with the persisted index.
//!
//! The synchronizer embeds chunks and upserts them by their stable IDs, so
//! re-running ingestion over unchanged sources leaves the index as it was and
//! edited sources overwrite their previous entries. Entries whose source has
//! disappeared are not removed.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::document::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Embeds chunks and upserts them into one collection.
///
/// # Example
///
/// ```rust,ignore
/// use knowrn_rag::IndexSynchronizer;
///
/// let synchronizer = IndexSynchronizer::new(embedder, store, "profile");
/// let written = synchronizer.sync(&chunks).await?;
/// ```
pub struct IndexSynchronizer {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    batch_size: usize,
}

impl IndexSynchronizer {
    /// Default number of chunks embedded per request.
    pub const DEFAULT_BATCH_SIZE: usize = 64;

    /// Create a synchronizer for `collection`.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedding_provider,
            vector_store,
            collection: collection.into(),
            batch_size: Self::DEFAULT_BATCH_SIZE,
        }
    }

    /// Set how many chunks are embedded and upserted per round trip.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// The collection this synchronizer writes to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embed and upsert `chunks`, returning how many were written.
    ///
    /// An empty slice performs no index operation and returns zero. Blank
    /// chunks are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::SyncError`] carrying the number of chunks already
    /// written when the embedding service or the store fails part-way.
    pub async fn sync(&self, chunks: &[Chunk]) -> Result<usize> {
        let pending: Vec<&Chunk> = chunks.iter().filter(|c| !c.text.trim().is_empty()).collect();
        if pending.is_empty() {
            info!(collection = %self.collection, "nothing to sync");
            return Ok(0);
        }

        let total = pending.len();
        let mut synced = 0;

        for batch in pending.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();

            let embeddings = self
                .embedding_provider
                .embed_batch(&texts)
                .await
                .map_err(|e| self.abort(synced, total, e))?;

            if embeddings.len() != batch.len() {
                let e = RagError::EmbeddingError {
                    provider: "unknown".to_string(),
                    message: format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        embeddings.len()
                    ),
                };
                return Err(self.abort(synced, total, e));
            }

            let embedded: Vec<Chunk> = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| Chunk { embedding, ..(*chunk).clone() })
                .collect();

            self.vector_store
                .upsert(&self.collection, &embedded)
                .await
                .map_err(|e| self.abort(synced, total, e))?;

            synced += embedded.len();
            debug!(collection = %self.collection, synced, total, "upserted batch");
        }

        info!(collection = %self.collection, synced, "index sync complete");
        Ok(synced)
    }

    fn abort(&self, synced: usize, total: usize, cause: RagError) -> RagError {
        error!(collection = %self.collection, synced, total, error = %cause, "index sync aborted");
        RagError::SyncError { synced, total, message: cause.to_string() }
    }
}
