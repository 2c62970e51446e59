//! End-to-end `run` pipeline: crawl + PDF extraction → entry files → corpus.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use campuscorpus_crawler::{CrawlReport, CrawlSinks, Crawler, Frontier};
use campuscorpus_pdf::PdfPipeline;
use campuscorpus_shared::{AppConfig, CorpusError, CrawlConfig, Result};
use campuscorpus_storage::{CheckpointStore, EntryWriter, write_entries};

use crate::merge::{ErrorFilter, MergeStats, merge_files};
use crate::web::WebPageHandler;

/// Which sub-pipelines a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Full,
    WebOnly,
    PdfOnly,
}

impl RunMode {
    fn web(self) -> bool {
        matches!(self, Self::Full | Self::WebOnly)
    }

    fn pdf(self) -> bool {
        matches!(self, Self::Full | Self::PdfOnly)
    }
}

/// Result of the PDF sub-pipeline.
#[derive(Debug, Clone)]
pub struct PdfSummary {
    pub documents: usize,
    pub failed: usize,
    pub entries: usize,
    pub elapsed: Duration,
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct RunSummary {
    pub crawl: Option<CrawlReport>,
    pub pdf: Option<PdfSummary>,
    pub merge: Option<MergeStats>,
    /// Path of the merged corpus file.
    pub corpus_path: PathBuf,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called for every successfully fetched page.
    fn page_processed(&self, url: &str, current: usize, max_pages: usize);
    /// Called when the pipeline completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_processed(&self, _url: &str, _current: usize, _max_pages: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// The corpus builder.
pub struct CorpusPipeline {
    config: AppConfig,
    allow_localhost: bool,
}

impl CorpusPipeline {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            allow_localhost: false,
        }
    }

    /// Allow crawling localhost/private IPs (for integration tests).
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the selected sub-pipelines, then merge whatever entry files exist.
    ///
    /// The PDF pipeline runs as its own task while the crawl runs on this
    /// one. The merge still happens when a sub-pipeline fails, so a stopped
    /// run leaves a usable partial corpus; the first failure is returned
    /// afterwards.
    #[instrument(skip_all, fields(mode = ?mode))]
    pub async fn run(
        &self,
        mode: RunMode,
        progress: &dyn ProgressReporter,
        shutdown: watch::Receiver<bool>,
    ) -> Result<RunSummary> {
        let start = Instant::now();
        info!(
            documents = self.config.documents.len(),
            start_urls = self.config.crawl.start_urls.len(),
            "starting corpus run"
        );

        let pdf_task = mode.pdf().then(|| {
            progress.phase("Processing documents");
            let config = self.config.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { run_pdf(&config, shutdown).await })
        });

        let crawl = if mode.web() {
            progress.phase("Crawling");
            Some(self.run_web(progress, shutdown).await)
        } else {
            None
        };

        let pdf = match pdf_task {
            Some(handle) => Some(
                handle
                    .await
                    .map_err(|e| CorpusError::Pdf(format!("pdf task failed: {e}")))
                    .and_then(|r| r),
            ),
            None => None,
        };

        let mut failures = Vec::new();
        let crawl = crawl.and_then(|r| {
            r.map_err(|e| {
                error!(error = %e, "web pipeline failed");
                failures.push(e);
            })
            .ok()
        });
        let pdf = pdf.and_then(|r| {
            r.map_err(|e| {
                error!(error = %e, "pdf pipeline failed");
                failures.push(e);
            })
            .ok()
        });

        progress.phase("Merging corpus");
        let merge = match self.merge().await {
            Ok(stats) => Some(stats),
            Err(e) if failures.is_empty() => return Err(e),
            Err(e) => {
                warn!(error = %e, "merge skipped");
                None
            }
        };

        if let Some(first) = failures.into_iter().next() {
            return Err(first);
        }

        let summary = RunSummary {
            crawl,
            pdf,
            merge,
            corpus_path: PathBuf::from(&self.config.output.corpus),
            elapsed: start.elapsed(),
        };
        info!(elapsed_ms = summary.elapsed.as_millis(), "corpus run completed");
        progress.done(&summary);
        Ok(summary)
    }

    /// Merge the existing web and PDF entry files into the corpus file.
    pub async fn merge(&self) -> Result<MergeStats> {
        let output = &self.config.output;
        let filter = ErrorFilter::new(&self.config.merge.error_indicators);
        merge_files(
            Path::new(&output.web_entries),
            Path::new(&output.pdf_entries),
            Path::new(&output.corpus),
            &filter,
        )
        .await
    }

    async fn run_web(
        &self,
        progress: &dyn ProgressReporter,
        shutdown: watch::Receiver<bool>,
    ) -> Result<CrawlReport> {
        let crawl_config = CrawlConfig::from(&self.config);
        let store = CheckpointStore::new(&self.config.checkpoint.path);

        let mut frontier = Frontier::from_config(&crawl_config);
        let resumed = match frontier.restore(&store).await {
            Ok(resumed) => resumed,
            Err(e) => {
                warn!(error = %e, "ignoring unusable checkpoint, starting fresh");
                false
            }
        };

        // A resumed crawl keeps the entries covered by the checkpoint.
        let web_path = Path::new(&self.config.output.web_entries);
        let mut writer = if resumed {
            EntryWriter::resume(web_path, frontier.entries_offset()).await?
        } else {
            EntryWriter::create(web_path).await?
        };

        let mut handler = WebPageHandler::new(&self.config, progress, frontier.pages_processed())?;
        let mut crawler = Crawler::new(crawl_config)?;
        if self.allow_localhost {
            crawler = crawler.allow_localhost();
        }

        crawler
            .run(
                &mut frontier,
                CrawlSinks {
                    checkpoint: &store,
                    entries: &mut writer,
                },
                &mut handler,
                shutdown,
            )
            .await
    }
}

async fn run_pdf(config: &AppConfig, shutdown: watch::Receiver<bool>) -> Result<PdfSummary> {
    let pipeline = PdfPipeline::new(&config.pdf, Duration::from_secs(config.crawl.timeout_secs))?;
    let report = pipeline.process_documents(&config.documents, shutdown).await;
    write_entries(Path::new(&config.output.pdf_entries), &report.entries).await?;

    Ok(PdfSummary {
        documents: report.documents.len(),
        failed: report.failed(),
        entries: report.entries.len(),
        elapsed: report.elapsed,
    })
}
