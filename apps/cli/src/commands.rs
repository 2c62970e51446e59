//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use campuscorpus_core::pipeline::{CorpusPipeline, ProgressReporter, RunMode, RunSummary};
use campuscorpus_shared::{AppConfig, init_config, load_config, resolve_config_path};
use campuscorpus_storage::CheckpointStore;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// campuscorpus: crawl a university site and its documents into a corpus.
#[derive(Parser)]
#[command(
    name = "campuscorpus",
    version,
    about = "Build a citation-ready JSONL corpus from a university website and its PDF catalogs.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./campuscorpus.toml, then ~/.campuscorpus/campuscorpus.toml).
    #[arg(long, global = true, env = "CAMPUSCORPUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl, extract, and merge into the corpus.
    Run {
        /// Only crawl the website.
        #[arg(long, conflicts_with = "pdf_only")]
        web_only: bool,

        /// Only process the configured PDF documents.
        #[arg(long)]
        pdf_only: bool,
    },

    /// Re-merge the existing entry files without fetching anything.
    Merge,

    /// Show the saved crawl checkpoint.
    Status,

    /// Delete the crawl checkpoint so the next run starts fresh.
    Reset,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "campuscorpus=info",
        1 => "campuscorpus=debug",
        _ => "campuscorpus=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run { web_only, pdf_only } => {
            let mode = match (web_only, pdf_only) {
                (true, _) => RunMode::WebOnly,
                (_, true) => RunMode::PdfOnly,
                _ => RunMode::Full,
            };
            cmd_run(config_path, mode).await
        }
        Command::Merge => cmd_merge(config_path).await,
        Command::Status => cmd_status(config_path).await,
        Command::Reset => cmd_reset(config_path).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>, mode: RunMode) -> Result<()> {
    let config = load_config(config_path)?;
    info!(?mode, documents = config.documents.len(), "starting run");

    // Ctrl-C stops dispatch; in-flight work drains and a checkpoint is saved.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight requests");
            let _ = shutdown_tx.send(true);
        }
    });

    let reporter = CliProgress::new();
    let pipeline = CorpusPipeline::new(config);
    let result = pipeline.run(mode, &reporter, shutdown_rx).await;
    reporter.spinner.finish_and_clear();
    let summary = result?;

    println!();
    if let Some(crawl) = &summary.crawl {
        println!("  Web crawl ({})", crawl.stop_reason);
        println!("    Pages fetched:  {}", crawl.pages_fetched);
        println!("    Pages restored: {}", crawl.pages_restored);
        println!("    Entries:        {}", crawl.entries_written);
        println!("    Failed URLs:    {}", crawl.permanent_failures);
        println!("    Retries:        {}", crawl.retries);
    }
    if let Some(pdf) = &summary.pdf {
        println!("  Documents");
        println!("    Processed:      {}", pdf.documents - pdf.failed);
        println!("    Failed:         {}", pdf.failed);
        println!("    Chunks:         {}", pdf.entries);
    }
    if let Some(merge) = &summary.merge {
        print_merge(merge, &summary.corpus_path);
    }
    println!("  Time: {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_merge(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let corpus_path = PathBuf::from(&config.output.corpus);
    let stats = CorpusPipeline::new(config).merge().await?;

    println!();
    print_merge(&stats, &corpus_path);
    println!();
    Ok(())
}

fn print_merge(stats: &campuscorpus_core::MergeStats, corpus_path: &Path) {
    println!("  Corpus");
    println!("    Web entries:    {} of {}", stats.web_kept(), stats.web_count);
    println!("    PDF entries:    {} of {}", stats.pdf_kept(), stats.pdf_count);
    println!("    Filtered:       {}", stats.filtered());
    println!("    Total:          {}", stats.total_count);
    println!("    Path:           {}", corpus_path.display());
}

async fn cmd_status(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = CheckpointStore::new(&config.checkpoint.path);

    let Some(snapshot) = store.load().await? else {
        println!("No checkpoint at {}", store.path().display());
        return Ok(());
    };

    let state = &snapshot.state;
    println!();
    println!("  Checkpoint:      {}", store.path().display());
    if let Some(run_id) = &snapshot.run_id {
        println!("  Run:             {run_id}");
    }
    println!("  Pages processed: {}", state.pages_processed);
    println!("  Visited:         {}", state.visited.len());
    println!("  Failed:          {}", state.failed.len());
    println!("  Pending:         {}", state.pending.len());
    match state.last_checkpoint.or(snapshot.saved_at) {
        Some(at) => println!("  Last saved:      {}", at.to_rfc3339()),
        None => println!("  Last saved:      unknown"),
    }
    println!();
    Ok(())
}

async fn cmd_reset(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = CheckpointStore::new(&config.checkpoint.path);
    if store.clear().await? {
        println!("Removed checkpoint {}", store.path().display());
    } else {
        println!("No checkpoint at {}", store.path().display());
    }
    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = init_config(config_path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    match resolve_config_path(config_path) {
        Some(path) => println!("# {}", path.display()),
        None => println!("# built-in defaults"),
    }
    let config: AppConfig = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| eyre!("failed to render config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_processed(&self, url: &str, current: usize, max_pages: usize) {
        self.spinner
            .set_message(format!("Crawling [{current}/{max_pages}] {url}"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}
