//! Loader for a directory of plain-text files.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::chunking::Chunker;
use crate::document::SourceKind;
use crate::loader::{
    LoadReport, SourceLoader, chunk_source, files_with_extension, log_loaded, stem_and_name,
};

/// Loads every `*.txt` directly inside a directory as UTF-8.
///
/// Chunk IDs are `txt-{file stem}-{index}` and the file name is the
/// provenance label.
pub struct TextLoader {
    chunker: Arc<dyn Chunker>,
}

impl TextLoader {
    /// Create a loader that splits file contents with `chunker`.
    pub fn new(chunker: Arc<dyn Chunker>) -> Self {
        Self { chunker }
    }
}

#[async_trait]
impl SourceLoader for TextLoader {
    fn kind(&self) -> SourceKind {
        SourceKind::Txt
    }

    async fn load(&self, location: &Path) -> LoadReport {
        if !location.is_dir() {
            return LoadReport::not_found(SourceKind::Txt, location);
        }

        let mut report = LoadReport::default();
        for path in files_with_extension(location, "txt") {
            let (stem, name) = stem_and_name(&path);
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => {
                    let chunks =
                        chunk_source(&self.chunker, SourceKind::Txt, &stem, &name, &text);
                    report.add_item(SourceKind::Txt, name, chunks);
                }
                Err(e) => report.skip(SourceKind::Txt, name, e.to_string()),
            }
        }

        log_loaded(SourceKind::Txt, &report);
        report
    }
}
