//! PDF document ingestion for the campus corpus.
//!
//! This crate provides:
//! - [`PdfPipeline`]: download, extract, and chunk configured documents on a
//!   bounded worker pool
//! - [`PageCleaner`]: per-page noise removal
//! - [`chunk_with_overlap`]: overlapping page windows
//! - [`PageSource`]: the page-text seam, implemented by [`LopdfSource`]

pub mod chunk;
pub mod clean;
pub mod download;
pub mod source;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::Client;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use campuscorpus_shared::{
    ContentEntry, CorpusError, DocumentSource, PdfConfig, Result, SourceType, cache_file_name,
    citation_base,
};

pub use chunk::chunk_with_overlap;
pub use clean::PageCleaner;
pub use download::download_if_absent;
pub use source::{LopdfSource, PageSource};

/// Outcome of one configured document.
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    pub key: String,
    pub total_pages: u32,
    pub chunks: usize,
    /// Set when the document was skipped.
    pub error: Option<String>,
}

/// Result of a PDF pipeline run.
#[derive(Debug, Default)]
pub struct PdfReport {
    /// Entries of all documents, in configured document order.
    pub entries: Vec<ContentEntry>,
    pub documents: Vec<DocumentSummary>,
    pub elapsed: Duration,
}

impl PdfReport {
    pub fn failed(&self) -> usize {
        self.documents.iter().filter(|d| d.error.is_some()).count()
    }
}

/// Downloads, cleans, and chunks configured documents.
pub struct PdfPipeline {
    client: Client,
    download_dir: PathBuf,
    cleaner: Arc<PageCleaner>,
    chunk_size: usize,
    chunk_overlap: usize,
    workers: usize,
}

impl PdfPipeline {
    pub fn new(config: &PdfConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CorpusError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            download_dir: PathBuf::from(&config.download_dir),
            cleaner: Arc::new(PageCleaner::from_config(config)?),
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            workers: config.workers.max(1),
        })
    }

    /// Process every document. A failing document is logged and skipped.
    ///
    /// Once `shutdown` is set, documents not yet started are skipped and a
    /// downloaded document is not parsed.
    #[instrument(skip_all, fields(documents = docs.len(), workers = self.workers))]
    pub async fn process_documents(
        &self,
        docs: &[DocumentSource],
        shutdown: watch::Receiver<bool>,
    ) -> PdfReport {
        let started = Instant::now();
        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (index, doc) in docs.iter().cloned().enumerate() {
            let permits = permits.clone();
            let job = DocumentJob {
                client: self.client.clone(),
                dest: self.download_dir.join(cache_file_name(&doc.key)),
                cleaner: self.cleaner.clone(),
                chunk_size: self.chunk_size,
                chunk_overlap: self.chunk_overlap,
                shutdown: shutdown.clone(),
            };
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let result = job.run(&doc).await;
                (index, doc.key, result)
            });
        }

        let mut finished: Vec<Option<(String, Result<(u32, Vec<ContentEntry>)>)>> =
            (0..docs.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, key, result)) => finished[index] = Some((key, result)),
                Err(e) => warn!(error = %e, "document task failed"),
            }
        }

        let mut report = PdfReport::default();
        for (slot, doc) in finished.into_iter().zip(docs) {
            let summary = match slot {
                Some((key, Ok((total_pages, entries)))) => {
                    info!(%key, total_pages, chunks = entries.len(), "document processed");
                    let chunks = entries.len();
                    report.entries.extend(entries);
                    DocumentSummary { key, total_pages, chunks, error: None }
                }
                Some((key, Err(e))) => {
                    warn!(%key, error = %e, "document skipped");
                    DocumentSummary { key, total_pages: 0, chunks: 0, error: Some(e.to_string()) }
                }
                None => DocumentSummary {
                    key: doc.key.clone(),
                    total_pages: 0,
                    chunks: 0,
                    error: Some("task aborted".into()),
                },
            };
            report.documents.push(summary);
        }
        report.elapsed = started.elapsed();

        info!(
            entries = report.entries.len(),
            failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis(),
            "pdf pipeline completed"
        );
        report
    }
}

struct DocumentJob {
    client: Client,
    dest: PathBuf,
    cleaner: Arc<PageCleaner>,
    chunk_size: usize,
    chunk_overlap: usize,
    shutdown: watch::Receiver<bool>,
}

impl DocumentJob {
    async fn run(self, doc: &DocumentSource) -> Result<(u32, Vec<ContentEntry>)> {
        self.ensure_running()?;
        download_if_absent(&self.client, &doc.url, &self.dest).await?;
        self.ensure_running()?;

        let doc = doc.clone();
        tokio::task::spawn_blocking(move || {
            let source = LopdfSource::open(&self.dest)?;
            let entries = document_entries(
                &doc,
                &source,
                &self.cleaner,
                self.chunk_size,
                self.chunk_overlap,
            );
            Ok::<_, CorpusError>((source.page_count(), entries))
        })
        .await
        .map_err(|e| CorpusError::Pdf(format!("extraction task failed: {e}")))?
    }

    fn ensure_running(&self) -> Result<()> {
        if *self.shutdown.borrow() {
            return Err(CorpusError::Pdf("skipped: shutdown requested".into()));
        }
        Ok(())
    }
}

/// Build the chunk entries of one document, page by page.
pub fn document_entries(
    doc: &DocumentSource,
    source: &dyn PageSource,
    cleaner: &PageCleaner,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<ContentEntry> {
    let total_pages = source.page_count();
    let base = citation_base(&doc.url);
    let persona = doc.persona_label();
    let scraped_at = Utc::now();

    let mut entries = Vec::new();
    for page in 1..=total_pages {
        let Some(text) = cleaner.extract_page(source, page) else {
            continue;
        };
        let chunks = chunk_with_overlap(&text, chunk_size, chunk_overlap);
        let total_chunks_on_page = chunks.len();

        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            entries.push(ContentEntry {
                title: doc.title.clone(),
                section_header: Some(format!("Page {page}")),
                text: chunk,
                url: doc.url.clone(),
                anchor_url: format!("{base}#page={page}"),
                anchor_id: Some(format!("page-{page}")),
                header_level: None,
                persona: persona.clone(),
                faq_category: doc.faq_category.clone(),
                source_type: SourceType::Pdf,
                chunk_index,
                total_chunks: None,
                pdf_page: Some(page),
                total_pages: Some(total_pages),
                total_chunks_on_page: Some(total_chunks_on_page),
                priority: Some(doc.priority),
                pdf_key: Some(doc.key.clone()),
                scraped_at: Some(scraped_at),
            });
        }
    }
    entries
}
