//! Fetch workers: one owned [`CrawlTarget`] in, one [`FetchReport`] out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::{Client, StatusCode, header};
use scraper::{Html, Selector};
use tokio::sync::{Semaphore, watch};
use tracing::debug;
use url::Url;

use campuscorpus_markdown::extract_html_title;
use campuscorpus_shared::{CorpusError, CrawlConfig, CrawlTarget, PageContent, Result};

use crate::backoff::ExponentialBackoff;
use crate::frontier::FetchOutcome;

/// Fallback User-Agent when none are configured.
const USER_AGENT: &str = concat!("campuscorpus/", env!("CARGO_PKG_VERSION"));

/// Upper bound for retry backoff.
const MAX_BACKOFF_MS: u64 = 30_000;

/// Everything a worker learned about one target.
#[derive(Debug)]
pub struct FetchReport {
    pub target: CrawlTarget,
    pub outcome: FetchOutcome,
    /// Present only when `outcome` is [`FetchOutcome::Succeeded`].
    pub page: Option<PageContent>,
    /// Absolute links found on the page (fragments removed).
    pub links: Vec<Url>,
    pub status: Option<u16>,
    pub elapsed: Duration,
}

/// Shared, cheaply clonable fetch settings.
#[derive(Clone)]
pub(crate) struct Fetcher {
    client: Client,
    user_agents: Arc<Vec<String>>,
    min_delay_ms: u64,
    max_delay_ms: u64,
    backoff: ExponentialBackoff,
}

impl Fetcher {
    pub(crate) fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()
            .map_err(|e| CorpusError::Network(format!("failed to build HTTP client: {e}")))?;

        let user_agents = if config.user_agents.is_empty() {
            vec![USER_AGENT.to_string()]
        } else {
            config.user_agents.clone()
        };

        Ok(Self {
            client,
            user_agents: Arc::new(user_agents),
            min_delay_ms: config.min_delay.as_millis() as u64,
            max_delay_ms: config.max_delay.as_millis() as u64,
            backoff: ExponentialBackoff::new(config.backoff_base.as_millis() as u64, MAX_BACKOFF_MS),
        })
    }

    /// Wait for the host permit and politeness delay, then fetch `target`.
    ///
    /// Returns `None` without sending anything when shutdown is signalled
    /// before the request goes out; the target stays in flight and is saved
    /// as pending.
    pub(crate) async fn fetch(
        &self,
        target: CrawlTarget,
        host_limit: Arc<Semaphore>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Option<FetchReport> {
        let started = Instant::now();
        // A closed semaphore only means the crawl is tearing down.
        let _permit = tokio::select! {
            permit = host_limit.acquire_owned() => permit.ok(),
            _ = shutdown_signalled(&mut shutdown) => return None,
        };

        let delay = self.politeness_delay(target.attempt);
        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_signalled(&mut shutdown) => return None,
            }
        }
        if *shutdown.borrow() {
            return None;
        }

        let (outcome, status, body) = self.request(&target).await;

        let (page, links) = match (&outcome, body) {
            (FetchOutcome::Succeeded, Some(body)) => {
                let (page, links) = build_page(&body.final_url, body.text, body.is_html);
                (Some(page), links)
            }
            _ => (None, Vec::new()),
        };

        Some(FetchReport {
            target,
            outcome,
            page,
            links,
            status,
            elapsed: started.elapsed(),
        })
    }

    fn politeness_delay(&self, attempt: u32) -> Duration {
        let mut ms = if self.max_delay_ms > 0 {
            rand::thread_rng().gen_range(self.min_delay_ms..=self.max_delay_ms)
        } else {
            0
        };
        if attempt > 0 {
            ms += self.backoff.delay(attempt).as_millis() as u64;
        }
        Duration::from_millis(ms)
    }

    fn pick_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(USER_AGENT)
    }

    async fn request(&self, target: &CrawlTarget) -> (FetchOutcome, Option<u16>, Option<Body>) {
        debug!(url = %target.url, attempt = target.attempt, "fetching page");

        let response = match self
            .client
            .get(target.url.as_str())
            .header(header::USER_AGENT, self.pick_user_agent())
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return (classify_error(&e), None, None),
        };

        let status = response.status();
        let code = Some(status.as_u16());
        if !status.is_success() {
            return (classify_status(status), code, None);
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_lowercase();
        let is_html = content_type.contains("html");
        if !is_html && !content_type.starts_with("text/plain") {
            return (
                FetchOutcome::Permanent(format!("unsupported content type {content_type}")),
                code,
                None,
            );
        }

        let mut final_url = response.url().clone();
        final_url.set_fragment(None);

        match response.text().await {
            Ok(text) => (
                FetchOutcome::Succeeded,
                code,
                Some(Body {
                    final_url,
                    text,
                    is_html,
                }),
            ),
            Err(e) => (
                FetchOutcome::Transient(format!("body read failed: {e}")),
                code,
                None,
            ),
        }
    }
}

/// Resolves once shutdown is signalled; never, if the sender is gone.
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

struct Body {
    final_url: Url,
    text: String,
    is_html: bool,
}

fn classify_status(status: StatusCode) -> FetchOutcome {
    let reason = format!("HTTP {status}");
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        FetchOutcome::Transient(reason)
    } else {
        FetchOutcome::Permanent(reason)
    }
}

fn classify_error(e: &reqwest::Error) -> FetchOutcome {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        FetchOutcome::Transient(e.to_string())
    } else {
        FetchOutcome::Permanent(e.to_string())
    }
}

/// Parse the body into a [`PageContent`] plus outgoing links. Synchronous:
/// `scraper::Html` must not live across an await point.
fn build_page(url: &Url, body: String, is_html: bool) -> (PageContent, Vec<Url>) {
    if !is_html {
        let page = PageContent {
            url: url.to_string(),
            title: String::new(),
            raw_markup: body,
            html_for_links: None,
            fetched_at: Utc::now(),
        };
        return (page, Vec::new());
    }

    let links = extract_links(&Html::parse_document(&body), url);
    let title = extract_html_title(&body).unwrap_or_default();

    let page = PageContent {
        url: url.to_string(),
        title,
        html_for_links: Some(body.clone()),
        raw_markup: body,
        fetched_at: Utc::now(),
    };
    (page, links)
}

/// Extract all links from a document, resolved against the base URL.
fn extract_links(doc: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(link_sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }
        if let Ok(mut resolved) = base_url.join(href) {
            resolved.set_fragment(None);
            links.push(resolved);
        }
    }
    links
}
