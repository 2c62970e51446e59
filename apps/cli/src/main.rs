//! campuscorpus CLI: builds a citation-ready university corpus.
//!
//! Crawls the configured web domains and extracts the configured PDF
//! documents into JSONL entry files, then merges them into one corpus.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
