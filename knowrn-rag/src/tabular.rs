//! Loader for the tabular knowledge file (`id, topic, information`).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::chunking::Chunker;
use crate::document::{RECORD_ID_KEY, SourceKind};
use crate::loader::{LoadReport, SourceLoader, chunk_source, log_loaded};

/// One row of the knowledge file. Extra columns are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct KnowledgeRecord {
    /// Natural key of the row; part of every chunk ID derived from it.
    pub id: String,
    /// Short subject line, used as the provenance label.
    pub topic: String,
    /// Free-text body.
    pub information: String,
}

impl KnowledgeRecord {
    /// The labeled text that gets chunked and embedded.
    pub fn to_text(&self) -> String {
        format!("Topic: {}\nInformation: {}", self.topic, self.information)
    }
}

/// Loads a CSV file with `id`, `topic` and `information` columns.
///
/// Each row becomes its own document: chunk IDs are `csv-{id}-{index}` and
/// the row's topic is the provenance label.
pub struct TabularLoader {
    chunker: Arc<dyn Chunker>,
}

impl TabularLoader {
    /// Create a loader that splits rows with `chunker`.
    pub fn new(chunker: Arc<dyn Chunker>) -> Self {
        Self { chunker }
    }
}

#[async_trait]
impl SourceLoader for TabularLoader {
    fn kind(&self) -> SourceKind {
        SourceKind::Csv
    }

    async fn load(&self, location: &Path) -> LoadReport {
        if !location.exists() {
            return LoadReport::not_found(SourceKind::Csv, location);
        }

        let mut report = LoadReport::default();
        let bytes = match tokio::fs::read(location).await {
            Ok(bytes) => bytes,
            Err(e) => {
                report.skip(SourceKind::Csv, location.display().to_string(), e.to_string());
                return report;
            }
        };

        let mut reader =
            csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes.as_slice());

        for (row, record) in reader.deserialize::<KnowledgeRecord>().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    let line = e.position().map_or(row + 2, |p| p.line() as usize);
                    report.skip(SourceKind::Csv, format!("line {line}"), e.to_string());
                    continue;
                }
            };
            if record.id.is_empty() {
                report.skip(SourceKind::Csv, format!("row {}", row + 1), "empty id".to_string());
                continue;
            }

            let chunks = chunk_source(
                &self.chunker,
                SourceKind::Csv,
                &record.id,
                &record.topic,
                &record.to_text(),
            );
            let chunks = chunks
                .into_iter()
                .map(|chunk| chunk.with_metadata(RECORD_ID_KEY, &record.id))
                .collect();
            report.add_item(SourceKind::Csv, format!("row {}", row + 1), chunks);
        }

        log_loaded(SourceKind::Csv, &report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::RecursiveChunker;
    use crate::document::FILE_NAME_KEY;
    use crate::error::RagError;
    use std::fs;

    fn loader() -> TabularLoader {
        TabularLoader::new(Arc::new(RecursiveChunker::new(800, 100).unwrap()))
    }

    #[tokio::test]
    async fn row_becomes_labeled_chunk() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("rag_data.csv");
        fs::write(&path, "id,topic,information\n1,Hobby,plays ukulele\n").unwrap();

        let chunks = loader().load(&path).await.into_chunks();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "csv-1-0");
        assert_eq!(chunks[0].text, "Topic: Hobby\nInformation: plays ukulele");
        assert_eq!(chunks[0].label, "Hobby");
        assert_eq!(chunks[0].metadata[RECORD_ID_KEY], "1");
        assert_eq!(chunks[0].metadata[FILE_NAME_KEY], "Hobby");
    }

    #[tokio::test]
    async fn malformed_row_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("rag_data.csv");
        fs::write(
            &path,
            "id,topic,information\n1,Hobby,plays ukulele\n2,Sport\n3,School,SVPCET Nagpur\n",
        )
        .unwrap();

        let report = loader().load(&path).await;
        let ids: Vec<_> = report.chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["csv-1-0", "csv-3-0"]);
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.skipped[0], RagError::SourceItem { kind: SourceKind::Csv, .. }));
    }

    #[tokio::test]
    async fn missing_file_yields_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let report = loader().load(&temp.path().join("absent.csv")).await;
        assert!(report.chunks.is_empty());
        assert!(matches!(report.skipped[..], [RagError::SourceNotFound { .. }]));
    }

    #[tokio::test]
    async fn quoted_fields_keep_commas() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("rag_data.csv");
        fs::write(
            &path,
            "id,topic,information\n7,Projects,\"AI Health and Wellness coach, built in 2024\"\n",
        )
        .unwrap();

        let chunks = loader().load(&path).await.into_chunks();
        assert_eq!(
            chunks[0].text,
            "Topic: Projects\nInformation: AI Health and Wellness coach, built in 2024"
        );
    }

    #[tokio::test]
    async fn repeated_id_keeps_first_row() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("rag_data.csv");
        fs::write(&path, "id,topic,information\n1,Hobby,plays ukulele\n1,Sport,plays hockey\n")
            .unwrap();

        let report = loader().load(&path).await;
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].label, "Hobby");
        assert!(matches!(
            &report.skipped[..],
            [RagError::SourceItem { kind: SourceKind::Csv, item, .. }] if item == "row 2"
        ));
    }
}
