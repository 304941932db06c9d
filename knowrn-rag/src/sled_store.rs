//! Persistent vector store backed by an embedded `sled` database.
//!
//! Each collection is a sled tree named after the collection, mapping chunk
//! ID → JSON-encoded [`Chunk`] (embedding included). Search is a brute-force
//! cosine scan, which is plenty for a personal knowledge base of a few
//! thousand chunks.
//!
//! Only one process may hold the database open at a time; sled enforces this
//! with a file lock, so concurrent ingestion runs fail fast instead of
//! corrupting the index.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::similarity::{cosine_similarity, rank_descending};
use crate::vectorstore::VectorStore;

/// A [`VectorStore`] persisted under a filesystem directory.
///
/// # Example
///
/// ```rust,ignore
/// use knowrn_rag::{SledVectorStore, VectorStore};
///
/// let store = SledVectorStore::open("knowrn_db")?;
/// store.create_collection("Nishant_gakare_information", 0).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SledVectorStore {
    db: sled::Db,
}

impl SledVectorStore {
    /// Open (or create) the database in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStoreError`] if the directory cannot be
    /// created or the database is locked by another process.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| RagError::VectorStoreError {
            backend: "sled".to_string(),
            message: format!("failed to create '{}': {e}", dir.display()),
        })?;
        let db = sled::open(dir).map_err(Self::map_err)?;
        debug!(path = %dir.display(), "opened sled vector store");
        Ok(Self { db })
    }

    /// Open a throwaway database that is removed when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open().map_err(Self::map_err)?;
        Ok(Self { db })
    }

    fn map_err(e: sled::Error) -> RagError {
        RagError::VectorStoreError { backend: "sled".to_string(), message: e.to_string() }
    }

    fn exists(&self, name: &str) -> bool {
        self.db.tree_names().iter().any(|tree| tree.as_ref() == name.as_bytes())
    }

    /// Open an existing collection's tree.
    fn tree(&self, collection: &str) -> Result<sled::Tree> {
        if !self.exists(collection) {
            return Err(RagError::VectorStoreError {
                backend: "sled".to_string(),
                message: format!("collection '{collection}' does not exist"),
            });
        }
        self.db.open_tree(collection).map_err(Self::map_err)
    }

    fn decode(bytes: &[u8]) -> Result<Chunk> {
        serde_json::from_slice(bytes).map_err(|e| RagError::VectorStoreError {
            backend: "sled".to_string(),
            message: format!("corrupt chunk record: {e}"),
        })
    }
}

#[async_trait]
impl VectorStore for SledVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        if self.exists(name) {
            debug!(collection = name, "sled collection already exists, skipping creation");
            return Ok(());
        }
        self.db.open_tree(name).map_err(Self::map_err)?;
        debug!(collection = name, dimensions, "created sled collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.db.drop_tree(name).map_err(Self::map_err)?;
        debug!(collection = name, "deleted sled collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let tree = self.tree(collection)?;
        let mut batch = sled::Batch::default();
        for chunk in chunks {
            let value = serde_json::to_vec(chunk).map_err(|e| RagError::VectorStoreError {
                backend: "sled".to_string(),
                message: format!("failed to encode chunk '{}': {e}", chunk.id),
            })?;
            batch.insert(chunk.id.as_bytes(), value);
        }
        tree.apply_batch(batch).map_err(Self::map_err)?;
        tree.flush_async().await.map_err(Self::map_err)?;

        debug!(collection, count = chunks.len(), "upserted chunks to sled");
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let tree = self.tree(collection)?;
        let mut batch = sled::Batch::default();
        for id in ids {
            batch.remove(id.as_bytes());
        }
        tree.apply_batch(batch).map_err(Self::map_err)?;
        tree.flush_async().await.map_err(Self::map_err)?;

        debug!(collection, count = ids.len(), "deleted chunks from sled");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let tree = self.tree(collection)?;

        let mut scored = Vec::with_capacity(tree.len());
        for item in tree.iter() {
            let (_, value) = item.map_err(Self::map_err)?;
            let chunk = Self::decode(&value)?;
            let score = cosine_similarity(&chunk.embedding, embedding);
            scored.push(SearchResult { chunk, score });
        }

        rank_descending(&mut scored, top_k);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.tree(collection)?.len())
    }
}
