//! Subcommand implementations.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use knowrn_rag::loader::files_with_extension;
use knowrn_rag::ollama::{OllamaEmbeddingProvider, OllamaGenerator};
use knowrn_rag::{
    IngestReport, QueryFailure, RagPipeline, SearchResult, SledVectorStore, read_pdf,
};
use tracing::{info, warn};

use crate::config::AppConfig;

/// Queries run by `inspect` when none are given, one or more per source
/// kind plus a cross-source concept.
pub const DEFAULT_QUERIES: &[&str] = &[
    "HackRonyX 2025",
    "GitHub rn-dev",
    "SVPCET Nagpur",
    "ukulele",
    "Smart India Hackathon 2024",
    "AI Health and Wellness coach",
    "hockey at the national level",
];

const HIT_PREVIEW_CHARS: usize = 240;
const PDF_PREVIEW_CHARS: usize = 400;

/// Open the index and wire the Ollama backends into a pipeline.
pub fn build_pipeline(config: &AppConfig) -> Result<RagPipeline> {
    let timeout = config.rag.request_timeout();
    let store = SledVectorStore::open(&config.index.persist_dir).with_context(|| {
        format!("failed to open index at '{}'", config.index.persist_dir.display())
    })?;
    let embedder = OllamaEmbeddingProvider::new(&config.ollama_url, &config.embedding_model)?
        .with_timeout(timeout)?;
    let generator =
        OllamaGenerator::new(&config.ollama_url, &config.generation_model)?.with_timeout(timeout)?;

    let pipeline = RagPipeline::builder()
        .config(config.rag.clone())
        .collection(&config.index.collection)
        .embedding_provider(Arc::new(embedder))
        .vector_store(Arc::new(store))
        .generator(Arc::new(generator))
        .build()?;
    Ok(pipeline)
}

/// `knowrn ingest`
pub async fn ingest(config: &AppConfig) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    pipeline.create_collection().await?;

    let report = pipeline.ingest(&config.sources).await?;
    info!(synced = report.synced, collection = pipeline.collection(), "ingestion finished");
    print!("{}", ingest_summary(&report));
    Ok(())
}

/// `knowrn ask`
pub async fn ask(config: &AppConfig, question: &str) -> Result<()> {
    let pipeline = build_pipeline(config)?;

    let outcome = match pipeline.ensure_collection().await {
        Ok(_) => pipeline.respond(question).await,
        Err(e) => Err(QueryFailure::new(question, &e)),
    };
    match outcome {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(failure) => {
            println!("{}", serde_json::to_string_pretty(&failure)?);
            Err(anyhow!("{}: {}", failure.error_kind, failure.message))
        }
    }
}

/// `knowrn inspect`
pub async fn inspect(config: &AppConfig, queries: &[String], pdf_check: bool) -> Result<()> {
    // Show raw retrieval: no model-based rerank.
    let mut config = config.clone();
    config.rag.rerank_top_k = None;
    let pipeline = build_pipeline(&config)?;
    let indexed = pipeline.ensure_collection().await.with_context(|| {
        format!("collection '{}' has not been ingested", pipeline.collection())
    })?;
    println!("Indexed chunks: {indexed}");

    let queries: Vec<&str> = if queries.is_empty() {
        DEFAULT_QUERIES.to_vec()
    } else {
        queries.iter().map(String::as_str).collect()
    };

    for query in queries {
        println!("\n=== QUERY ===\n{query}");
        match pipeline.retrieve(query).await {
            Ok(results) => print!("{}", format_hits(&results)),
            Err(e) => {
                warn!(query, error = %e, "inspection query failed");
                println!("Error: {e}");
            }
        }
    }

    if pdf_check {
        check_pdfs(&config).await;
    }
    Ok(())
}

async fn check_pdfs(config: &AppConfig) {
    let dir = &config.sources.pdf_dir;
    if !dir.is_dir() {
        println!("\n[PDF CHECK] directory not found: {}", dir.display());
        return;
    }

    for path in files_with_extension(dir, "pdf") {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        match read_pdf(&path).await {
            Ok(pdf) => {
                println!(
                    "\n[PDF CHECK] {name}: chars={} pages={}",
                    pdf.text.chars().count(),
                    pdf.pages
                );
                let text = preview(&pdf.text, PDF_PREVIEW_CHARS);
                if text.is_empty() {
                    println!("<no text extracted>");
                } else {
                    println!("{text}");
                }
            }
            Err(e) => println!("\n[PDF CHECK] {name}: error: {e}"),
        }
    }
}

/// Per-source chunk counts for an ingestion run.
pub fn ingest_summary(report: &IngestReport) -> String {
    let mut summary = format!(
        "CSV chunks: {}\nPDF chunks: {}\nTXT chunks: {}\nTotal chunks: {}\nSynced: {}\n",
        report.csv_chunks,
        report.pdf_chunks,
        report.txt_chunks,
        report.total_chunks(),
        report.synced,
    );
    for skipped in &report.skipped {
        summary.push_str(&format!("Skipped: {skipped}\n"));
    }
    summary
}

/// One block per hit: source kind, label and a single-line preview.
pub fn format_hits(results: &[SearchResult]) -> String {
    let mut out = format!("Retrieved: {} docs\n", results.len());
    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!(
            "-- {}. Source: {} | Topic: {}\n   {}\n",
            i + 1,
            result.chunk.source,
            result.source_label(),
            preview(&result.chunk.text, HIT_PREVIEW_CHARS),
        ));
    }
    out
}

/// The first `max_chars` characters of `text` on a single line.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).map(|c| if c == '\n' { ' ' } else { c }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowrn_rag::{Chunk, SourceKind, VectorStore};

    #[test]
    fn preview_is_single_line_and_bounded() {
        assert_eq!(preview("Topic: Hobby\nInformation: plays ukulele", 18), "Topic: Hobby Infor");
        assert_eq!(preview("ünïcode", 3), "ünï");
        assert_eq!(preview("", 240), "");
    }

    #[test]
    fn hits_show_kind_and_label() {
        let results = vec![SearchResult {
            chunk: Chunk::new(
                SourceKind::Csv,
                "1",
                0,
                "Topic: Hobby\nInformation: plays ukulele",
                "Hobby",
            ),
            score: 0.9,
        }];
        let out = format_hits(&results);
        assert!(out.starts_with("Retrieved: 1 docs\n"));
        assert!(out.contains("-- 1. Source: csv | Topic: Hobby\n"));
        assert!(out.contains("   Topic: Hobby Information: plays ukulele\n"));
    }

    #[test]
    fn summary_lists_counts_and_skips() {
        let report = IngestReport {
            csv_chunks: 3,
            pdf_chunks: 2,
            txt_chunks: 0,
            skipped: vec!["txt source not found: data/txts".to_string()],
            synced: 5,
        };
        let summary = ingest_summary(&report);
        assert!(summary.contains("Total chunks: 5\n"));
        assert!(summary.contains("Skipped: txt source not found: data/txts\n"));
    }

    #[tokio::test]
    async fn pipeline_opens_index_under_persist_dir() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.index.persist_dir = temp.path().join("index");

        let pipeline = build_pipeline(&config).unwrap();
        pipeline.create_collection().await.unwrap();
        assert_eq!(pipeline.collection(), "Nishant_gakare_information");
        assert!(config.index.persist_dir.is_dir());
    }

    #[tokio::test]
    async fn read_commands_do_not_create_the_collection() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.index.persist_dir = temp.path().join("index");

        assert!(inspect(&config, &["ukulele".to_string()], false).await.is_err());
        let err = ask(&config, "What instrument?").await.unwrap_err();
        assert!(err.to_string().starts_with("vector_store: "), "{err}");

        let store = SledVectorStore::open(&config.index.persist_dir).unwrap();
        assert!(store.count("Nishant_gakare_information").await.is_err());
    }
}
