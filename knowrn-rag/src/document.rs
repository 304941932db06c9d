//! Data types for chunks and search results.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Metadata key holding the [`SourceKind`] of a chunk.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the human-readable origin (file name or topic).
pub const FILE_NAME_KEY: &str = "file_name";
/// Metadata key holding the natural key of a tabular record.
pub const RECORD_ID_KEY: &str = "id";
/// Metadata key holding the chunk's position within its source document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// The kind of source a chunk was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A row of the tabular knowledge file.
    Csv,
    /// A PDF file.
    Pdf,
    /// A plain-text file.
    Txt,
}

impl SourceKind {
    /// The lowercase tag used in chunk IDs and metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Csv => "csv",
            SourceKind::Pdf => "pdf",
            SourceKind::Txt => "txt",
        }
    }

    /// Build the stable chunk ID for the `index`-th chunk of `source_id`.
    ///
    /// Re-ingesting unchanged data yields the same IDs, which is what makes
    /// index upserts idempotent.
    pub fn chunk_id(&self, source_id: &str, index: usize) -> String {
        format!("{}-{source_id}-{index}", self.as_str())
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The atomic retrieval unit: a bounded piece of source text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Stable identifier, e.g. `csv-1-0` or `pdf-resume-3`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until synced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Which loader produced the chunk.
    pub source: SourceKind,
    /// Human-readable origin: the file name, or the topic of a CSV row.
    pub label: String,
    /// Source-specific fields (row id, chunk index) plus the `source` and
    /// `file_name` keys mirrored from the typed fields.
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// Create a chunk without an embedding.
    ///
    /// The `source`, `file_name` and `chunk_index` metadata keys are filled in
    /// from the arguments.
    pub fn new(
        source: SourceKind,
        source_id: &str,
        index: usize,
        text: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        let label = label.into();
        let metadata = HashMap::from([
            (SOURCE_KEY.to_string(), source.as_str().to_string()),
            (FILE_NAME_KEY.to_string(), label.clone()),
            (CHUNK_INDEX_KEY.to_string(), index.to_string()),
        ]);
        Self {
            id: source.chunk_id(source_id, index),
            text: text.into(),
            embedding: Vec::new(),
            source,
            label,
            metadata,
        }
    }

    /// Attach an extra metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The provenance label shown next to answers.
    ///
    /// Falls back to the source kind when the label is empty.
    pub fn source_label(&self) -> &str {
        if self.label.trim().is_empty() { self.source.as_str() } else { &self.label }
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity for vector search, or the 0–10 model score after
    /// reranking. Higher is more relevant.
    pub score: f32,
}

impl SearchResult {
    /// Shorthand for [`Chunk::source_label`].
    pub fn source_label(&self) -> &str {
        self.chunk.source_label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_follow_kind_source_index_scheme() {
        assert_eq!(SourceKind::Csv.chunk_id("1", 0), "csv-1-0");
        assert_eq!(SourceKind::Pdf.chunk_id("resume", 2), "pdf-resume-2");
        assert_eq!(SourceKind::Txt.chunk_id("about", 11), "txt-about-11");
    }

    #[test]
    fn new_chunk_mirrors_provenance_into_metadata() {
        let chunk = Chunk::new(SourceKind::Txt, "about", 1, "hello", "about.txt");
        assert_eq!(chunk.id, "txt-about-1");
        assert_eq!(chunk.metadata[SOURCE_KEY], "txt");
        assert_eq!(chunk.metadata[FILE_NAME_KEY], "about.txt");
        assert_eq!(chunk.metadata[CHUNK_INDEX_KEY], "1");
        assert!(chunk.embedding.is_empty());
    }

    #[test]
    fn empty_label_falls_back_to_kind() {
        let chunk = Chunk::new(SourceKind::Csv, "7", 0, "text", "  ");
        assert_eq!(chunk.source_label(), "csv");
    }
}
