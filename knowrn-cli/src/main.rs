use anyhow::Result;
use clap::Parser;

use knowrn_cli::{AppConfig, Cli, Commands, commands, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_json);

    let mut config = AppConfig::from_env()?;
    cli.apply(&mut config);

    match &cli.command {
        Commands::Ingest => commands::ingest(&config).await,
        Commands::Ask { question } => commands::ask(&config, question).await,
        Commands::Inspect { queries, pdf_check } => {
            commands::inspect(&config, queries, *pdf_check).await
        }
    }
}
