//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A storage backend for chunk embeddings with similarity search.
///
/// Implementations manage named collections of [`Chunk`]s keyed by chunk ID.
/// Upserting a chunk whose ID already exists replaces the stored entry.
///
/// # Example
///
/// ```rust,ignore
/// use knowrn_rag::{SledVectorStore, VectorStore};
///
/// let store = SledVectorStore::open("knowrn_db")?;
/// store.create_collection("profile", 768).await?;
/// store.upsert("profile", &chunks).await?;
/// let results = store.search("profile", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert or replace chunks by ID. Chunks must have embeddings set.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Delete chunks by their IDs from a collection.
    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()>;

    /// Search for the `top_k` most similar chunks to the given embedding.
    ///
    /// Returns at most `top_k` results ordered by descending similarity;
    /// fewer when the collection is smaller. Returned chunks carry their
    /// stored embedding.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Number of chunks stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}
