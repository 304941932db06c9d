//! Loader for a directory of PDF files.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::chunking::Chunker;
use crate::document::SourceKind;
use crate::error::{RagError, Result};
use crate::loader::{
    LoadReport, SourceLoader, chunk_source, files_with_extension, log_loaded, stem_and_name,
};

/// Text pulled out of one PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfText {
    /// Number of pages in the document.
    pub pages: usize,
    /// Page texts joined with `\n`. Pages that failed to extract contribute
    /// an empty string.
    pub text: String,
}

/// Extract text page by page.
///
/// A page whose text cannot be extracted counts as empty; only a document
/// that cannot be parsed at all is an error.
///
/// # Errors
///
/// Returns [`RagError::SourceItem`] with an empty item name when the bytes
/// are not a readable PDF; callers fill in the file name.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<PdfText> {
    let document = lopdf::Document::load_mem(bytes).map_err(|e| RagError::SourceItem {
        kind: SourceKind::Pdf,
        item: String::new(),
        message: e.to_string(),
    })?;

    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    let pages: Vec<String> = page_numbers
        .iter()
        .map(|&page| {
            document.extract_text(&[page]).unwrap_or_else(|e| {
                warn!(page, error = %e, "page text extraction failed, treating as empty");
                String::new()
            })
        })
        .collect();

    Ok(PdfText { pages: pages.len(), text: pages.join("\n") })
}

/// Read and extract one PDF off the async runtime.
///
/// # Errors
///
/// Returns [`RagError::SourceItem`] naming the file if it cannot be read or
/// parsed, or if the extractor panics.
pub async fn read_pdf(path: &Path) -> Result<PdfText> {
    let (_, name) = stem_and_name(path);
    let item_error = |message: String| RagError::SourceItem {
        kind: SourceKind::Pdf,
        item: name.clone(),
        message,
    };

    let bytes = tokio::fs::read(path).await.map_err(|e| item_error(e.to_string()))?;
    let extracted = tokio::task::spawn_blocking(move || extract_pdf_text(&bytes))
        .await
        .map_err(|e| item_error(format!("extraction task failed: {e}")))?;

    extracted.map_err(|e| match e {
        RagError::SourceItem { message, .. } => item_error(message),
        other => other,
    })
}

/// Loads every `*.pdf` directly inside a directory.
///
/// Chunk IDs are `pdf-{file stem}-{index}` and the file name is the
/// provenance label. Files are processed in path order.
pub struct PdfLoader {
    chunker: Arc<dyn Chunker>,
}

impl PdfLoader {
    /// Create a loader that splits extracted text with `chunker`.
    pub fn new(chunker: Arc<dyn Chunker>) -> Self {
        Self { chunker }
    }
}

#[async_trait]
impl SourceLoader for PdfLoader {
    fn kind(&self) -> SourceKind {
        SourceKind::Pdf
    }

    async fn load(&self, location: &Path) -> LoadReport {
        if !location.is_dir() {
            return LoadReport::not_found(SourceKind::Pdf, location);
        }

        let mut report = LoadReport::default();
        for path in files_with_extension(location, "pdf") {
            let (stem, name) = stem_and_name(&path);
            match read_pdf(&path).await {
                Ok(pdf) => {
                    debug!(file = %name, pages = pdf.pages, chars = pdf.text.len(), "extracted pdf");
                    let chunks =
                        chunk_source(&self.chunker, SourceKind::Pdf, &stem, &name, &pdf.text);
                    report.add_item(SourceKind::Pdf, name, chunks);
                }
                Err(RagError::SourceItem { message, .. }) => {
                    report.skip(SourceKind::Pdf, name, message);
                }
                Err(other) => report.skip(SourceKind::Pdf, name, other.to_string()),
            }
        }

        log_loaded(SourceKind::Pdf, &report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, ObjectId, Stream, dictionary};

    /// A PDF whose pages have the given content streams, all sharing one
    /// Courier font.
    fn pdf_with_pages(contents: Vec<Stream>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let page_ids: Vec<ObjectId> = contents
            .into_iter()
            .map(|stream| {
                let content_id = doc.add_object(stream);
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "Contents" => content_id,
                    "Resources" => resources_id,
                })
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => page_ids.len() as i64,
                "Kids" => page_ids.into_iter().map(Object::from).collect::<Vec<_>>(),
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn text_page(text: &str) -> Stream {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        Stream::new(dictionary! {}, content.encode().unwrap())
    }

    #[test]
    fn unreadable_page_counts_as_empty() {
        let junk = Stream::new(
            dictionary! { "Filter" => "FlateDecode" },
            b"\x00\x01 not deflate data \xff\xfe".to_vec(),
        );
        let bytes = pdf_with_pages(vec![text_page("good page text"), junk]);

        let pdf = extract_pdf_text(&bytes).unwrap();
        assert_eq!(pdf.pages, 2);
        assert!(pdf.text.contains("good page text"), "{:?}", pdf.text);
    }

    #[test]
    fn garbage_bytes_are_an_item_error() {
        let err = extract_pdf_text(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, RagError::SourceItem { kind: SourceKind::Pdf, .. }));
    }

    #[tokio::test]
    async fn unreadable_file_names_the_item() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.5 truncated").unwrap();

        match read_pdf(&path).await {
            Err(RagError::SourceItem { item, .. }) => assert_eq!(item, "broken.pdf"),
            other => panic!("expected item error, got {other:?}"),
        }
    }
}
