//! Error types for the `knowrn-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::document::SourceKind;

/// Errors that can occur while ingesting or querying the knowledge base.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration validation error. Fatal, surfaced at startup.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A source location (file or directory) does not exist.
    #[error("{kind} source not found: {}", path.display())]
    SourceNotFound {
        /// The kind of source that was expected at `path`.
        kind: SourceKind,
        /// The missing location.
        path: PathBuf,
    },

    /// A single record or file within a source could not be loaded.
    #[error("failed to load {kind} item '{item}': {message}")]
    SourceItem {
        /// The kind of source the item belongs to.
        kind: SourceKind,
        /// The record key or file name of the failing item.
        item: String,
        /// A description of the failure.
        message: String,
    },

    /// The scoring model returned something that is not a number.
    #[error("could not parse relevance score from response '{response}'")]
    ScoringParse {
        /// The raw (trimmed) model response.
        response: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while calling the text generation model.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// Ingestion stopped part-way through a batch.
    #[error("index sync aborted after {synced} of {total} chunks: {message}")]
    SyncError {
        /// Number of chunks written before the failure.
        synced: usize,
        /// Number of chunks the run attempted to write.
        total: usize,
        /// A description of the underlying failure.
        message: String,
    },

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    /// Whether this error should abort the current operation.
    ///
    /// Missing sources, single bad items and unparseable scores are logged
    /// and skipped; everything else propagates to the caller.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RagError::SourceNotFound { .. }
                | RagError::SourceItem { .. }
                | RagError::ScoringParse { .. }
        )
    }

    /// A short, stable name for the error category, used in structured
    /// failure responses.
    pub fn kind(&self) -> &'static str {
        match self {
            RagError::ConfigError(_) => "configuration",
            RagError::SourceNotFound { .. } => "source_not_found",
            RagError::SourceItem { .. } => "source_item",
            RagError::ScoringParse { .. } => "scoring_parse",
            RagError::EmbeddingError { .. } => "embedding_service",
            RagError::GenerationError { .. } => "generation_service",
            RagError::VectorStoreError { .. } => "vector_store",
            RagError::SyncError { .. } => "sync",
            RagError::PipelineError(_) => "pipeline",
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_local_errors_are_not_fatal() {
        let missing =
            RagError::SourceNotFound { kind: SourceKind::Pdf, path: PathBuf::from("data/pdfs") };
        let item = RagError::SourceItem {
            kind: SourceKind::Csv,
            item: "row 3".into(),
            message: "missing field".into(),
        };
        let parse = RagError::ScoringParse { response: "very relevant".into() };
        assert!(!missing.is_fatal());
        assert!(!item.is_fatal());
        assert!(!parse.is_fatal());

        let embed = RagError::EmbeddingError { provider: "Ollama".into(), message: "down".into() };
        assert!(embed.is_fatal());
        assert_eq!(embed.kind(), "embedding_service");
    }

    #[test]
    fn not_found_message_names_kind_and_path() {
        let err =
            RagError::SourceNotFound { kind: SourceKind::Txt, path: PathBuf::from("data/txts") };
        assert_eq!(err.to_string(), "txt source not found: data/txts");
    }
}
