//! Crawl coordinator.
//!
//! The coordinator owns the [`Frontier`], dispatches fetches onto a
//! `JoinSet` bounded by the global concurrency cap and a per-host semaphore,
//! hands successful pages to a [`PageHandler`], and appends the resulting
//! entries to the web entry file as each page completes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use campuscorpus_shared::{ContentEntry, CorpusError, CrawlConfig, CrawlTarget, PageContent, Result};
use campuscorpus_storage::{CheckpointStore, EntryWriter};

use crate::fetch::{FetchReport, Fetcher};
use crate::frontier::{Disposition, FetchOutcome, Frontier};
use crate::memory::{MemoryGuard, MemoryProbe, MemoryStatus, SysinfoProbe};
use crate::scope::CrawlScope;

// ---------------------------------------------------------------------------
// CrawlReport
// ---------------------------------------------------------------------------

/// Why the crawl loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Nothing left to fetch.
    Exhausted,
    /// `max_pages` successful pages reached (restored pages included).
    PageBudget,
    /// Shutdown was requested.
    Shutdown,
    /// Process memory crossed the hard limit.
    MemoryLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exhausted => "exhausted",
            Self::PageBudget => "page budget reached",
            Self::Shutdown => "shutdown requested",
            Self::MemoryLimit => "memory limit",
        };
        f.write_str(s)
    }
}

/// Summary of a completed crawl.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Pages fetched successfully during this run.
    pub pages_fetched: usize,
    /// Pages already processed according to the restored checkpoint.
    pub pages_restored: usize,
    /// Entries appended to the web entry file during this run.
    pub entries_written: usize,
    /// Targets that ended in the failed set during this run.
    pub permanent_failures: usize,
    /// Retries scheduled during this run.
    pub retries: usize,
    pub stop_reason: StopReason,
    pub duration: Duration,
}

/// Turns one fetched page into corpus entries.
///
/// Called on the coordinator task only, so implementations may hold
/// non-`Sync` state.
pub trait PageHandler: Send {
    fn handle_page(&mut self, page: PageContent) -> Result<Vec<ContentEntry>>;
}

/// Where a crawl writes its results.
pub struct CrawlSinks<'a> {
    pub checkpoint: &'a CheckpointStore,
    pub entries: &'a mut EntryWriter,
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Concurrent, scope-aware, checkpointing crawler.
pub struct Crawler {
    config: CrawlConfig,
    scope: CrawlScope,
    fetcher: Fetcher,
    memory: MemoryGuard,
}

impl Crawler {
    /// Create a new crawler with the given configuration.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let probe: Box<dyn MemoryProbe> = Box::new(SysinfoProbe::new());
        Self::with_memory_probe(config, probe)
    }

    /// Create a crawler that samples memory through `probe`.
    pub fn with_memory_probe(config: CrawlConfig, probe: Box<dyn MemoryProbe>) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        let scope = CrawlScope::new(&config);
        let memory = MemoryGuard::new(probe, config.memory_warning_mb, config.memory_limit_mb);
        Ok(Self {
            config,
            scope,
            fetcher,
            memory,
        })
    }

    /// Allow crawling localhost/private IPs (for integration tests).
    pub fn allow_localhost(mut self) -> Self {
        self.scope = self.scope.allow_localhost();
        self
    }

    /// Queue the configured start URLs that are in scope and not yet visited.
    pub fn seed(&self, frontier: &mut Frontier) -> usize {
        let mut added = 0;
        for raw in &self.config.start_urls {
            match CrawlTarget::parse(raw) {
                Some(target) if self.scope.in_scope(&target.url) => {
                    if frontier.enqueue_if_new(target) {
                        added += 1;
                    }
                }
                Some(_) => warn!(url = %raw, "start url is out of scope"),
                None => warn!(url = %raw, "invalid start url"),
            }
        }
        added
    }

    /// Run the crawl loop until the frontier is exhausted, the page budget
    /// is reached, shutdown is signalled, or memory runs out.
    ///
    /// A final checkpoint is always forced before returning. Crossing the
    /// hard memory limit returns [`CorpusError::ResourceExhausted`].
    #[instrument(skip_all, fields(max_pages = self.config.max_pages, concurrency = self.config.concurrency))]
    pub async fn run<H: PageHandler>(
        &mut self,
        frontier: &mut Frontier,
        mut sinks: CrawlSinks<'_>,
        handler: &mut H,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<CrawlReport> {
        let started = Instant::now();
        let seeded = self.seed(frontier);
        let pages_restored = frontier.restored_pages();

        info!(
            seeded,
            queued = frontier.queued_len(),
            restored = pages_restored,
            per_host = self.config.per_host_concurrency,
            "starting crawl"
        );

        let mut tasks: JoinSet<Option<FetchReport>> = JoinSet::new();
        let mut host_limits: HashMap<String, Arc<Semaphore>> = HashMap::new();
        let mut memory_tick = tokio::time::interval(self.config.memory_check_interval);
        memory_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut stats = RunStats::default();
        let mut shutdown_closed = false;
        let mut stop = if *shutdown.borrow() {
            Some(StopReason::Shutdown)
        } else {
            None
        };

        while stop.is_none() {
            self.dispatch(frontier, &mut tasks, &mut host_limits, &shutdown);

            if tasks.is_empty() {
                stop = Some(if frontier.pages_processed() >= self.config.max_pages {
                    StopReason::PageBudget
                } else {
                    StopReason::Exhausted
                });
                break;
            }

            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(Some(report))) => {
                        apply_report(&self.scope, report, frontier, handler, sinks.entries, &mut stats).await?;
                        save_checkpoint(frontier, &mut sinks, false).await?;
                    }
                    Some(Ok(None)) => debug!("fetch abandoned for shutdown"),
                    Some(Err(e)) => warn!(error = %e, "fetch task failed"),
                    None => {}
                },
                _ = memory_tick.tick() => match self.memory.check() {
                    MemoryStatus::Exceeded(mb) => {
                        warn!(rss_mb = mb, limit_mb = self.memory.limit_mb(), "memory limit exceeded, stopping crawl");
                        tasks.abort_all();
                        while tasks.join_next().await.is_some() {}
                        if let Err(e) = save_checkpoint(frontier, &mut sinks, true).await {
                            warn!(error = %e, "final checkpoint failed");
                        }
                        return Err(CorpusError::ResourceExhausted(format!(
                            "resident memory {mb} MB exceeds limit of {} MB",
                            self.memory.limit_mb()
                        )));
                    }
                    MemoryStatus::Warning(mb) => warn!(rss_mb = mb, "memory usage high"),
                    MemoryStatus::Normal | MemoryStatus::Unknown => {}
                },
                changed = shutdown.changed(), if !shutdown_closed => match changed {
                    Ok(()) if *shutdown.borrow() => stop = Some(StopReason::Shutdown),
                    Ok(()) => {}
                    Err(_) => shutdown_closed = true,
                },
            }
        }

        if !tasks.is_empty() {
            info!(in_flight = tasks.len(), "waiting for in-flight fetches");
            // Results after shutdown are discarded; the targets stay in
            // flight and are saved as pending. Tasks still waiting for a
            // host permit return without fetching.
            while tasks.join_next().await.is_some() {}
        }

        save_checkpoint(frontier, &mut sinks, true).await?;

        let report = CrawlReport {
            pages_fetched: frontier.pages_processed() - pages_restored,
            pages_restored,
            entries_written: stats.entries_written,
            permanent_failures: stats.failures,
            retries: stats.retries,
            stop_reason: stop.unwrap_or(StopReason::Exhausted),
            duration: started.elapsed(),
        };

        info!(
            pages_fetched = report.pages_fetched,
            pages_total = frontier.pages_processed(),
            entries = report.entries_written,
            failures = report.permanent_failures,
            retries = report.retries,
            stop = %report.stop_reason,
            duration_ms = report.duration.as_millis(),
            "crawl completed"
        );

        Ok(report)
    }

    /// Fill free worker slots without exceeding the page budget.
    fn dispatch(
        &self,
        frontier: &mut Frontier,
        tasks: &mut JoinSet<Option<FetchReport>>,
        host_limits: &mut HashMap<String, Arc<Semaphore>>,
        shutdown: &watch::Receiver<bool>,
    ) {
        while tasks.len() < self.config.concurrency
            && frontier.pages_processed() + frontier.in_flight_len() < self.config.max_pages
        {
            let Some(target) = frontier.next_batch(1).pop() else {
                break;
            };
            let per_host = self.config.per_host_concurrency;
            let limit = host_limits
                .entry(target.host().to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(per_host)))
                .clone();
            let fetcher = self.fetcher.clone();
            let shutdown = shutdown.clone();
            tasks.spawn(async move { fetcher.fetch(target, limit, shutdown).await });
        }
    }
}

/// Checkpoint with the entry file flushed and its length recorded, so a
/// resumed run can drop entries appended after this point.
async fn save_checkpoint(frontier: &mut Frontier, sinks: &mut CrawlSinks<'_>, force: bool) -> Result<bool> {
    if !force && !frontier.checkpoint_due() {
        return Ok(false);
    }
    sinks.entries.flush().await?;
    frontier.record_entries_offset(sinks.entries.offset());
    Ok(frontier.checkpoint(sinks.checkpoint, force).await)
}

/// Fold one worker report into the frontier and the entry file.
async fn apply_report<H: PageHandler>(
    scope: &CrawlScope,
    report: FetchReport,
    frontier: &mut Frontier,
    handler: &mut H,
    entries: &mut EntryWriter,
    stats: &mut RunStats,
) -> Result<()> {
    let FetchReport {
        target,
        outcome,
        page,
        links,
        status,
        elapsed,
    } = report;

    match frontier.record_result(&target, &outcome) {
        Disposition::Visited => {
            debug!(url = %target.url, ?status, elapsed_ms = elapsed.as_millis(), "page fetched");
            for link in links {
                if scope.in_scope(&link) {
                    frontier.enqueue_if_new(CrawlTarget::new(&link));
                }
            }
            if let Some(page) = page {
                let url = page.url.clone();
                match handler.handle_page(page) {
                    Ok(batch) if !batch.is_empty() => {
                        entries.write_batch(&batch).await?;
                        stats.entries_written += batch.len();
                    }
                    Ok(_) => debug!(%url, "page produced no entries"),
                    Err(e) => warn!(%url, error = %e, "page handler failed"),
                }
            }
        }
        Disposition::Retry { attempt } => {
            stats.retries += 1;
            debug!(url = %target.url, attempt, ?outcome, "fetch will be retried");
        }
        Disposition::Failed => {
            stats.failures += 1;
            warn!(url = %target.url, ?status, ?outcome, "fetch failed");
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
struct RunStats {
    entries_written: usize,
    failures: usize,
    retries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use campuscorpus_shared::{AppConfig, SourceType};
    use campuscorpus_storage::read_entries;
    use std::path::PathBuf;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::memory::tests::FixedProbe;

    /// Emits one entry per page, titled after the page.
    struct TitleHandler {
        pages: Vec<String>,
    }

    impl PageHandler for TitleHandler {
        fn handle_page(&mut self, page: PageContent) -> Result<Vec<ContentEntry>> {
            self.pages.push(page.url.clone());
            Ok(vec![ContentEntry {
                title: page.title,
                section_header: None,
                text: "body".into(),
                url: page.url.clone(),
                anchor_url: page.url,
                anchor_id: None,
                header_level: None,
                persona: "all".into(),
                faq_category: None,
                source_type: SourceType::Web,
                chunk_index: 0,
                total_chunks: Some(1),
                pdf_page: None,
                total_pages: None,
                total_chunks_on_page: None,
                priority: None,
                pdf_key: None,
                scraped_at: None,
            }])
        }
    }

    struct Fixture {
        dir: PathBuf,
        store: CheckpointStore,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("cc-crawl-{}", Uuid::now_v7()));
            let store = CheckpointStore::new(dir.join("checkpoint.json"));
            Self { dir, store }
        }

        fn entries_path(&self) -> PathBuf {
            self.dir.join("web.jsonl")
        }
    }

    fn html(title: &str, links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|l| format!(r#"<a href="{l}">{l}</a>"#))
            .collect();
        format!("<html><head><title>{title}</title></head><body><main><p>{title}</p>{anchors}</main></body></html>")
    }

    async fn mount_page(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
            .mount(server)
            .await;
    }

    fn config_for(server: &MockServer, f: impl FnOnce(&mut AppConfig)) -> CrawlConfig {
        let mut app = AppConfig::default();
        app.crawl.start_urls = vec![format!("{}/", server.uri())];
        app.crawl.allowed_domains = vec![];
        app.crawl.min_delay_ms = 0;
        app.crawl.max_delay_ms = 0;
        app.crawl.backoff_base_ms = 1;
        app.crawl.concurrency = 2;
        app.crawl.per_host_concurrency = 2;
        f(&mut app);
        CrawlConfig::from(&app)
    }

    fn crawler(config: CrawlConfig) -> Crawler {
        Crawler::with_memory_probe(config, Box::new(FixedProbe::mb(10)))
            .unwrap()
            .allow_localhost()
    }

    #[tokio::test]
    async fn crawls_linked_pages_once() {
        let server = MockServer::start().await;
        mount_page(&server, "/", html("Home", &["/a", "/b", "/a#frag", "/a/"])).await;
        mount_page(&server, "/a", html("A", &["/", "/b"])).await;
        mount_page(&server, "/b", html("B", &["/a"])).await;

        let fx = Fixture::new();
        let mut writer = EntryWriter::create(&fx.entries_path()).await.unwrap();
        let mut frontier = Frontier::new(2, 100);
        let mut handler = TitleHandler { pages: vec![] };
        let (_tx, rx) = watch::channel(false);

        let report = crawler(config_for(&server, |_| {}))
            .run(
                &mut frontier,
                CrawlSinks { checkpoint: &fx.store, entries: &mut writer },
                &mut handler,
                rx,
            )
            .await
            .unwrap();

        assert_eq!(report.pages_fetched, 3);
        assert_eq!(report.stop_reason, StopReason::Exhausted);
        assert_eq!(report.entries_written, 3);
        assert_eq!(handler.pages.len(), 3);

        let entries = read_entries(&fx.entries_path()).await.unwrap();
        let mut titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        titles.sort();
        assert_eq!(titles, vec!["A", "B", "Home"]);

        // Final checkpoint written with everything visited.
        let saved = fx.store.load().await.unwrap().unwrap();
        assert_eq!(saved.state.pages_processed, 3);
        assert!(saved.state.pending.is_empty());
    }

    #[tokio::test]
    async fn stops_at_page_budget() {
        let server = MockServer::start().await;
        mount_page(&server, "/", html("Home", &["/1", "/2", "/3", "/4"])).await;
        for p in ["/1", "/2", "/3", "/4"] {
            mount_page(&server, p, html(p, &[])).await;
        }

        let fx = Fixture::new();
        let mut writer = EntryWriter::create(&fx.entries_path()).await.unwrap();
        let mut frontier = Frontier::new(2, 100);
        let mut handler = TitleHandler { pages: vec![] };
        let (_tx, rx) = watch::channel(false);

        let report = crawler(config_for(&server, |app| app.crawl.max_pages = 3))
            .run(
                &mut frontier,
                CrawlSinks { checkpoint: &fx.store, entries: &mut writer },
                &mut handler,
                rx,
            )
            .await
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::PageBudget);
        assert_eq!(frontier.pages_processed(), 3);

        // Undispatched targets survive in the checkpoint.
        let saved = fx.store.load().await.unwrap().unwrap();
        assert_eq!(saved.state.pending.len(), 2);
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let server = MockServer::start().await;
        mount_page(&server, "/", html("Home", &["/flaky", "/gone"])).await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_page(&server, "/flaky", html("Flaky", &[])).await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fx = Fixture::new();
        let mut writer = EntryWriter::create(&fx.entries_path()).await.unwrap();
        let mut frontier = Frontier::new(2, 100);
        let mut handler = TitleHandler { pages: vec![] };
        let (_tx, rx) = watch::channel(false);

        let report = crawler(config_for(&server, |_| {}))
            .run(
                &mut frontier,
                CrawlSinks { checkpoint: &fx.store, entries: &mut writer },
                &mut handler,
                rx,
            )
            .await
            .unwrap();

        assert_eq!(report.pages_fetched, 2);
        assert_eq!(report.retries, 1);
        assert_eq!(report.permanent_failures, 1);
        assert_eq!(frontier.failed_count(), 1);
    }

    #[tokio::test]
    async fn resume_skips_visited_and_continues_pending() {
        let server = MockServer::start().await;
        mount_page(&server, "/", html("Home", &["/1", "/2"])).await;
        mount_page(&server, "/1", html("One", &[])).await;
        mount_page(&server, "/2", html("Two", &[])).await;

        let fx = Fixture::new();

        // First run stops after the seed page.
        {
            let mut writer = EntryWriter::create(&fx.entries_path()).await.unwrap();
            let mut frontier = Frontier::new(2, 100);
            let mut handler = TitleHandler { pages: vec![] };
            let (_tx, rx) = watch::channel(false);
            let report = crawler(config_for(&server, |app| app.crawl.max_pages = 1))
                .run(
                    &mut frontier,
                    CrawlSinks { checkpoint: &fx.store, entries: &mut writer },
                    &mut handler,
                    rx,
                )
                .await
                .unwrap();
            assert_eq!(report.stop_reason, StopReason::PageBudget);
        }

        // Second run restores and fetches only the pending pages.
        let mut writer = EntryWriter::append(&fx.entries_path()).await.unwrap();
        let mut frontier = Frontier::new(2, 100);
        assert!(frontier.restore(&fx.store).await.unwrap());
        let mut handler = TitleHandler { pages: vec![] };
        let (_tx, rx) = watch::channel(false);
        let report = crawler(config_for(&server, |_| {}))
            .run(
                &mut frontier,
                CrawlSinks { checkpoint: &fx.store, entries: &mut writer },
                &mut handler,
                rx,
            )
            .await
            .unwrap();

        assert_eq!(report.pages_restored, 1);
        assert_eq!(report.pages_fetched, 2);
        assert!(handler.pages.iter().all(|u| !u.ends_with('/')));
        assert_eq!(read_entries(&fx.entries_path()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn shutdown_requeues_in_flight_targets() {
        let server = MockServer::start().await;
        mount_page(&server, "/", html("Home", &["/slow"])).await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(html("Slow", &[]), "text/html")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let fx = Fixture::new();
        let mut writer = EntryWriter::create(&fx.entries_path()).await.unwrap();
        let mut frontier = Frontier::new(2, 100);
        let mut handler = TitleHandler { pages: vec![] };
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = tx.send(true);
        });

        let report = crawler(config_for(&server, |_| {}))
            .run(
                &mut frontier,
                CrawlSinks { checkpoint: &fx.store, entries: &mut writer },
                &mut handler,
                rx,
            )
            .await
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::Shutdown);
        assert_eq!(report.pages_fetched, 1);

        let saved = fx.store.load().await.unwrap().unwrap();
        assert_eq!(saved.state.pages_processed, 1);
        assert_eq!(saved.state.pending.len(), 1);
        assert!(saved.state.pending[0].ends_with("/slow"));
    }

    #[tokio::test]
    async fn shutdown_stops_fetches_waiting_for_host_permit() {
        let server = MockServer::start().await;
        mount_page(&server, "/", html("Home", &["/a", "/b", "/c"])).await;
        for p in ["/a", "/b", "/c"] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_raw(html(p, &[]), "text/html")
                        .set_delay(Duration::from_millis(800)),
                )
                .mount(&server)
                .await;
        }

        let fx = Fixture::new();
        let mut writer = EntryWriter::create(&fx.entries_path()).await.unwrap();
        let mut frontier = Frontier::new(2, 100);
        let mut handler = TitleHandler { pages: vec![] };
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let _ = tx.send(true);
        });

        let config = config_for(&server, |app| {
            app.crawl.concurrency = 3;
            app.crawl.per_host_concurrency = 1;
        });
        let report = crawler(config)
            .run(
                &mut frontier,
                CrawlSinks { checkpoint: &fx.store, entries: &mut writer },
                &mut handler,
                rx,
            )
            .await
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::Shutdown);

        // Only the seed and the one page holding the host permit went out.
        let requests = server.received_requests().await.unwrap();
        let paths: Vec<_> = requests.iter().map(|r| r.url.path().to_string()).collect();
        assert_eq!(paths.len(), 2, "unexpected requests: {paths:?}");
        assert_eq!(paths[0], "/");

        let saved = fx.store.load().await.unwrap().unwrap();
        assert_eq!(saved.state.pages_processed, 1);
        assert_eq!(saved.state.pending.len(), 3);
    }

    #[tokio::test]
    async fn checkpoint_records_entry_file_length() {
        let server = MockServer::start().await;
        mount_page(&server, "/", html("Home", &["/1"])).await;
        mount_page(&server, "/1", html("One", &[])).await;

        let fx = Fixture::new();
        let mut writer = EntryWriter::create(&fx.entries_path()).await.unwrap();
        let mut frontier = Frontier::new(2, 1);
        let mut handler = TitleHandler { pages: vec![] };
        let (_tx, rx) = watch::channel(false);

        crawler(config_for(&server, |_| {}))
            .run(
                &mut frontier,
                CrawlSinks { checkpoint: &fx.store, entries: &mut writer },
                &mut handler,
                rx,
            )
            .await
            .unwrap();

        let len = std::fs::metadata(fx.entries_path()).unwrap().len();
        let saved = fx.store.load().await.unwrap().unwrap();
        assert_eq!(saved.state.entries_offset, Some(len));
    }

    #[tokio::test]
    async fn memory_limit_forces_checkpoint_and_errors() {
        let server = MockServer::start().await;
        mount_page(&server, "/", html("Home", &[])).await;

        let fx = Fixture::new();
        let mut writer = EntryWriter::create(&fx.entries_path()).await.unwrap();
        let mut frontier = Frontier::new(2, 100);
        let mut handler = TitleHandler { pages: vec![] };
        let (_tx, rx) = watch::channel(false);

        let config = config_for(&server, |_| {});
        let mut crawler = Crawler::with_memory_probe(config, Box::new(FixedProbe::mb(900)))
            .unwrap()
            .allow_localhost();

        let err = crawler
            .run(
                &mut frontier,
                CrawlSinks { checkpoint: &fx.store, entries: &mut writer },
                &mut handler,
                rx,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CorpusError::ResourceExhausted(_)));
        assert!(err.is_fatal());
        assert!(fx.store.load().await.unwrap().is_some());
    }
}
