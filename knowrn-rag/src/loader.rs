//! Source loaders: turn CSV rows, PDFs and text files into [`Chunk`]s.
//!
//! Every loader shares the same failure policy. A missing source location is
//! logged and yields nothing; a single bad record or file is logged, recorded
//! in [`LoadReport::skipped`] and skipped. A load never fails as a whole.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::chunking::Chunker;
use crate::document::{Chunk, SourceKind};
use crate::error::RagError;

/// The outcome of loading one source location.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Chunks in source order.
    pub chunks: Vec<Chunk>,
    /// Non-fatal problems: a missing location or individual bad items.
    pub skipped: Vec<RagError>,
    seen: HashSet<String>,
}

impl LoadReport {
    /// Report for a location that does not exist.
    pub(crate) fn not_found(kind: SourceKind, path: &Path) -> Self {
        warn!(source = %kind, path = %path.display(), "source not found, skipping");
        Self {
            skipped: vec![RagError::SourceNotFound { kind, path: path.to_path_buf() }],
            ..Self::default()
        }
    }

    /// Add the chunks of one item. An item that would reuse a chunk ID
    /// already produced by an earlier item is skipped whole.
    pub(crate) fn add_item(
        &mut self,
        kind: SourceKind,
        item: impl Into<String>,
        chunks: Vec<Chunk>,
    ) {
        if let Some(duplicate) = chunks.iter().find(|c| self.seen.contains(&c.id)) {
            let message = format!("duplicate chunk id '{}'", duplicate.id);
            self.skip(kind, item, message);
            return;
        }
        self.seen.extend(chunks.iter().map(|c| c.id.clone()));
        self.chunks.extend(chunks);
    }

    /// Record a failed item and keep going.
    pub(crate) fn skip(&mut self, kind: SourceKind, item: impl Into<String>, message: String) {
        let item = item.into();
        error!(source = %kind, item = %item, error = %message, "failed to load item");
        self.skipped.push(RagError::SourceItem { kind, item, message });
    }

    /// Consume the report, keeping only the chunks.
    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }
}

/// A loader for one kind of source.
///
/// # Example
///
/// ```rust,ignore
/// use knowrn_rag::{PdfLoader, RecursiveChunker, SourceLoader};
///
/// let loader = PdfLoader::new(Arc::new(RecursiveChunker::new(800, 100)?));
/// let report = loader.load(Path::new("data/pdfs")).await;
/// ```
#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// The kind of chunks this loader produces.
    fn kind(&self) -> SourceKind;

    /// Load and chunk everything at `location`.
    async fn load(&self, location: &Path) -> LoadReport;
}

/// Split `text` and wrap the non-blank pieces into chunks with stable IDs.
///
/// Blank pieces are dropped before numbering, so indices stay contiguous.
pub(crate) fn chunk_source(
    chunker: &Arc<dyn Chunker>,
    kind: SourceKind,
    source_id: &str,
    label: &str,
    text: &str,
) -> Vec<Chunk> {
    chunker
        .split(text)
        .into_iter()
        .filter(|piece| !piece.trim().is_empty())
        .enumerate()
        .map(|(index, piece)| Chunk::new(kind, source_id, index, piece, label))
        .collect()
}

/// Files directly inside `dir` with the given extension, sorted by path.
pub fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry.path().extension().is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();

    files.sort();
    files
}

/// File stem and file name of `path`, for chunk IDs and provenance labels.
pub(crate) fn stem_and_name(path: &Path) -> (String, String) {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    (stem, name)
}

pub(crate) fn log_loaded(kind: SourceKind, report: &LoadReport) {
    info!(
        source = %kind,
        chunk_count = report.chunks.len(),
        skipped = report.skipped.len(),
        "loaded source"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::FixedSizeChunker;
    use std::fs;

    #[test]
    fn blank_pieces_are_dropped_before_numbering() {
        let chunker: Arc<dyn Chunker> = Arc::new(FixedSizeChunker::new(4, 0).unwrap());
        let chunks = chunk_source(&chunker, SourceKind::Txt, "notes", "notes.txt", "abcd    efgh");
        let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["txt-notes-0", "txt-notes-1"]);
        assert_eq!(chunks[1].text, "efgh");
    }

    #[test]
    fn lists_only_matching_files_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("a.TXT"), "a").unwrap();
        fs::write(root.join("c.pdf"), "c").unwrap();
        fs::write(root.join("nested/d.txt"), "d").unwrap();

        let files = files_with_extension(root, "txt");
        let names: Vec<_> = files.iter().map(|p| stem_and_name(p).1).collect();
        assert_eq!(names, vec!["a.TXT", "b.txt"]);
    }

    #[test]
    fn item_reusing_an_id_is_skipped_whole() {
        let chunker: Arc<dyn Chunker> = Arc::new(FixedSizeChunker::new(4, 0).unwrap());
        let mut report = LoadReport::default();
        report.add_item(
            SourceKind::Pdf,
            "a.pdf",
            chunk_source(&chunker, SourceKind::Pdf, "a", "a.pdf", "abcd"),
        );
        report.add_item(
            SourceKind::Pdf,
            "a.PDF",
            chunk_source(&chunker, SourceKind::Pdf, "a", "a.PDF", "wxyzefgh"),
        );

        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].label, "a.pdf");
        assert!(matches!(
            &report.skipped[..],
            [RagError::SourceItem { item, message, .. }]
                if item == "a.PDF" && message.contains("pdf-a-0")
        ));
    }
}
