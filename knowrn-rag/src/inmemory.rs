//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. Nothing is persisted; it
//! is meant for tests and one-off runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::similarity::{cosine_similarity, rank_descending};
use crate::vectorstore::VectorStore;

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as nested `HashMap`s: collection name → chunk ID → chunk.
/// All operations are async-safe via `tokio::sync::RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, HashMap<String, Chunk>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing_collection(collection: &str) -> RagError {
    RagError::VectorStoreError {
        backend: "InMemory".to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        for chunk in chunks {
            store.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        for id in ids {
            store.remove(*id);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;

        let mut scored: Vec<SearchResult> = store
            .values()
            .map(|chunk| {
                let score = cosine_similarity(&chunk.embedding, embedding);
                SearchResult { chunk: chunk.clone(), score }
            })
            .collect();

        rank_descending(&mut scored, top_k);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;
        Ok(store.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SourceKind;

    fn chunk(id: usize, text: &str, embedding: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new(SourceKind::Txt, "notes", id, text, "notes.txt");
        chunk.embedding = embedding;
        chunk
    }

    #[tokio::test]
    async fn upsert_replaces_entries_with_same_id() {
        let store = InMemoryVectorStore::new();
        store.create_collection("kb", 2).await.unwrap();

        store.upsert("kb", &[chunk(0, "old", vec![1.0, 0.0])]).await.unwrap();
        store.upsert("kb", &[chunk(0, "new", vec![0.0, 1.0])]).await.unwrap();

        assert_eq!(store.count("kb").await.unwrap(), 1);
        let results = store.search("kb", &[0.0, 1.0], 5).await.unwrap();
        assert_eq!(results[0].chunk.text, "new");
    }

    #[tokio::test]
    async fn search_on_small_collection_returns_everything() {
        let store = InMemoryVectorStore::new();
        store.create_collection("kb", 2).await.unwrap();
        store
            .upsert("kb", &[chunk(0, "a", vec![1.0, 0.0]), chunk(1, "b", vec![0.7, 0.7])])
            .await
            .unwrap();

        let results = store.search("kb", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, "a");
        assert!(!results[0].chunk.embedding.is_empty());
    }

    #[tokio::test]
    async fn missing_collection_is_a_store_error() {
        let store = InMemoryVectorStore::new();
        let err = store.search("nope", &[1.0], 1).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
    }

    #[tokio::test]
    async fn delete_removes_ids() {
        let store = InMemoryVectorStore::new();
        store.create_collection("kb", 2).await.unwrap();
        store
            .upsert("kb", &[chunk(0, "a", vec![1.0, 0.0]), chunk(1, "b", vec![0.0, 1.0])])
            .await
            .unwrap();
        store.delete("kb", &["txt-notes-0"]).await.unwrap();
        assert_eq!(store.count("kb").await.unwrap(), 1);
    }
}
