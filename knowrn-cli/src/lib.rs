//! # knowrn-cli
//!
//! Command-line front end for a knowrn knowledge base: `ingest` builds or
//! refreshes the index, `ask` answers a question as JSON, and `inspect`
//! shows which sources come back for a set of sample queries.

pub mod commands;
pub mod config;
pub mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "knowrn")]
#[command(about = "Ask questions about a personal knowledge base", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Tabular knowledge file (id, topic, information)
    #[arg(long, global = true)]
    pub csv: Option<PathBuf>,

    /// Directory of PDF files
    #[arg(long, global = true)]
    pub pdf_dir: Option<PathBuf>,

    /// Directory of text files
    #[arg(long, global = true)]
    pub txt_dir: Option<PathBuf>,

    /// Directory holding the vector index
    #[arg(long, global = true)]
    pub persist_dir: Option<PathBuf>,

    /// Collection name inside the index
    #[arg(long, global = true)]
    pub collection: Option<String>,

    /// Ollama server base URL
    #[arg(long, global = true)]
    pub ollama_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Load all sources and upsert them into the index
    Ingest,

    /// Answer a question from the index and print the result as JSON
    Ask {
        /// The question to answer
        question: String,
    },

    /// Show what the index returns for sample queries, without modifying it
    Inspect {
        /// Queries to run (a built-in set when omitted)
        queries: Vec<String>,

        /// Also report page and character counts for every PDF
        #[arg(long)]
        pdf_check: bool,
    },
}

impl Cli {
    /// Apply command-line overrides on top of `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.csv {
            config.sources.csv = path.clone();
        }
        if let Some(path) = &self.pdf_dir {
            config.sources.pdf_dir = path.clone();
        }
        if let Some(path) = &self.txt_dir {
            config.sources.txt_dir = path.clone();
        }
        if let Some(path) = &self.persist_dir {
            config.index.persist_dir = path.clone();
        }
        if let Some(name) = &self.collection {
            config.index.collection = name.clone();
        }
        if let Some(url) = &self.ollama_url {
            config.ollama_url = url.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "knowrn",
            "--collection",
            "profile",
            "ask",
            "What instrument?",
            "--pdf-dir",
            "/srv/pdfs",
        ]);
        let mut config = AppConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.index.collection, "profile");
        assert_eq!(config.sources.pdf_dir, PathBuf::from("/srv/pdfs"));
        assert_eq!(config.sources.csv, AppConfig::default().sources.csv);
        assert_eq!(cli.command, Commands::Ask { question: "What instrument?".to_string() });
    }

    #[test]
    fn inspect_takes_optional_queries() {
        let cli = Cli::parse_from(["knowrn", "inspect", "--pdf-check"]);
        assert_eq!(cli.command, Commands::Inspect { queries: Vec::new(), pdf_check: true });

        let cli = Cli::parse_from(["knowrn", "inspect", "ukulele", "hockey"]);
        match cli.command {
            Commands::Inspect { queries, pdf_check } => {
                assert_eq!(queries, vec!["ukulele", "hockey"]);
                assert!(!pdf_check);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
