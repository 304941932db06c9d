//! # knowrn-rag
//!
//! Ingestion and question answering over a small personal knowledge base.
//!
//! Sources (a CSV of facts, a folder of PDFs and a folder of text files) are
//! split into chunks with stable IDs, embedded, and upserted into a
//! persistent vector index. Questions are answered by retrieving candidate
//! chunks (similarity or MMR), optionally reranking them with a language
//! model, and generating an answer restricted to that context.
//!
//! ## Features
//!
//! - `ollama`: HTTP embedding and generation backends for a local Ollama
//!   server.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use knowrn_rag::{RagConfig, RagPipeline, SledVectorStore, SourcePaths};
//! use knowrn_rag::ollama::{OllamaEmbeddingProvider, OllamaGenerator};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(OllamaEmbeddingProvider::new(url, "nomic-embed-text")?))
//!     .vector_store(Arc::new(SledVectorStore::open("knowrn_db")?))
//!     .generator(Arc::new(OllamaGenerator::new(url, "phi")?))
//!     .build()?;
//!
//! pipeline.create_collection().await?;
//! pipeline.ingest(&SourcePaths::default()).await?;
//! println!("{:?}", pipeline.answer("What instrument does he play?").await?);
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod loader;
pub mod mmr;
pub mod pdf;
pub mod pipeline;
pub mod reranker;
pub mod retriever;
pub mod similarity;
pub mod sled_store;
pub mod sync;
pub mod tabular;
pub mod text;
pub mod vectorstore;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, chunker_for};
pub use config::{
    ChunkingStrategy, IndexSettings, RagConfig, RagConfigBuilder, RetrievalStrategy, SourcePaths,
};
pub use document::{Chunk, SearchResult, SourceKind};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::TextGenerator;
pub use inmemory::InMemoryVectorStore;
pub use loader::{LoadReport, SourceLoader};
pub use pdf::{PdfLoader, PdfText, extract_pdf_text, read_pdf};
pub use pipeline::{
    IngestReport, LoadedSources, QueryFailure, QueryResponse, RagPipeline, RagPipelineBuilder,
};
pub use reranker::{LlmReranker, NoOpReranker, Reranker};
pub use retriever::Retriever;
pub use sled_store::SledVectorStore;
pub use sync::IndexSynchronizer;
pub use tabular::{KnowledgeRecord, TabularLoader};
pub use text::TextLoader;
pub use vectorstore::VectorStore;
