//! Core domain types for the campus corpus.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;
use uuid::Uuid;

/// Current schema version for the checkpoint snapshot format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Fingerprint / CrawlTarget
// ---------------------------------------------------------------------------

/// Stable SHA-256 hash (lowercase hex) of a normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Hash a normalized URL form.
    pub fn of(normalized_form: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalized_form.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A URL scheduled (or about to be scheduled) for fetching.
///
/// Equality and hashing only consider `normalized_form`, so two targets that
/// differ by query string, fragment, or trailing slash are the same target.
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    /// URL to fetch (fragment removed).
    pub url: Url,
    /// `scheme://host[:port]/path` with no query, fragment, or trailing slash.
    pub normalized_form: String,
    /// Number of fetch attempts already spent on this target.
    pub attempt: u32,
}

impl CrawlTarget {
    /// Build a target from a URL, dropping its fragment.
    pub fn new(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        let normalized_form = normalize_url(&url);
        Self {
            url,
            normalized_form,
            attempt: 0,
        }
    }

    /// Parse a raw URL string into a target.
    pub fn parse(raw: &str) -> Option<Self> {
        Url::parse(raw).ok().map(|u| Self::new(&u))
    }

    /// Fingerprint used for set membership.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.normalized_form)
    }

    /// The host this target is fetched from.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or("")
    }
}

impl PartialEq for CrawlTarget {
    fn eq(&self, other: &Self) -> bool {
        self.normalized_form == other.normalized_form
    }
}

impl Eq for CrawlTarget {}

impl std::hash::Hash for CrawlTarget {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized_form.hash(state);
    }
}

/// Reduce a URL to scheme + host (+ explicit port) + path.
pub fn normalize_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    let mut path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    match url.port() {
        Some(port) => format!("{}://{host}:{port}{path}", url.scheme()),
        None => format!("{}://{host}{path}", url.scheme()),
    }
}

/// Strip query and fragment from a URL string, leaving a citation base.
pub fn citation_base(raw: &str) -> &str {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    &raw[..end]
}

// ---------------------------------------------------------------------------
// Page-level types
// ---------------------------------------------------------------------------

/// Content of one successfully fetched page. Consumed immediately.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Final page URL (fragment removed).
    pub url: String,
    /// `<title>` text, falling back to the first H1.
    pub title: String,
    /// Raw response body (HTML or plain text).
    pub raw_markup: String,
    /// HTML for link/anchor extraction, when the body was HTML.
    pub html_for_links: Option<String>,
    /// When the page was fetched.
    pub fetched_at: DateTime<Utc>,
}

/// HTML header level of an anchored section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderLevel {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeaderLevel {
    /// Map a numeric level (1..=6) to a header level.
    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            1 => Some(Self::H1),
            2 => Some(Self::H2),
            3 => Some(Self::H3),
            4 => Some(Self::H4),
            5 => Some(Self::H5),
            6 => Some(Self::H6),
            _ => None,
        }
    }

    /// Map a tag name (`h1`..`h6`) to a header level.
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.strip_prefix(['h', 'H'])
            .and_then(|d| d.parse::<usize>().ok())
            .and_then(Self::from_depth)
    }
}

impl std::fmt::Display for HeaderLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::H1 => "h1",
            Self::H2 => "h2",
            Self::H3 => "h3",
            Self::H4 => "h4",
            Self::H5 => "h5",
            Self::H6 => "h6",
        };
        f.write_str(tag)
    }
}

/// An in-page identifier on a header element, usable as a deep link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub anchor_id: String,
    pub header_text: String,
    pub anchor_url: String,
    pub level: HeaderLevel,
}

// ---------------------------------------------------------------------------
// ContentEntry
// ---------------------------------------------------------------------------

/// Where a corpus entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Web,
    Pdf,
}

/// Relative importance of a configured document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

/// One persisted, chunk-level unit of the corpus.
///
/// Optional fields are always written (as `null`) so that every JSONL record
/// carries the same field set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub title: String,
    #[serde(default)]
    pub section_header: Option<String>,
    pub text: String,
    pub url: String,
    pub anchor_url: String,
    #[serde(default)]
    pub anchor_id: Option<String>,
    #[serde(default)]
    pub header_level: Option<HeaderLevel>,
    pub persona: String,
    #[serde(default)]
    pub faq_category: Option<String>,
    pub source_type: SourceType,
    /// 0-based position among the chunks of the same page.
    #[serde(default)]
    pub chunk_index: usize,
    /// Section count of the web page (web only).
    #[serde(default)]
    pub total_chunks: Option<usize>,
    /// 1-indexed PDF page number.
    #[serde(default)]
    pub pdf_page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_chunks_on_page: Option<usize>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub pdf_key: Option<String>,
    #[serde(default)]
    pub scraped_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// FrontierState / checkpoint snapshot
// ---------------------------------------------------------------------------

/// Crash-recoverable crawl bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontierState {
    #[serde(default)]
    pub visited: BTreeSet<Fingerprint>,
    #[serde(default)]
    pub failed: BTreeSet<Fingerprint>,
    #[serde(default)]
    pub pages_processed: usize,
    #[serde(default)]
    pub last_checkpoint: Option<DateTime<Utc>>,
    /// URLs queued or in flight when the state was captured.
    #[serde(default)]
    pub pending: Vec<String>,
    /// Length in bytes of the web entry file at the checkpoint. Entries past
    /// it belong to pages that are not in `visited` yet.
    #[serde(default)]
    pub entries_offset: Option<u64>,
}

/// The on-disk checkpoint document.
///
/// Unknown fields are ignored and missing fields take their defaults, so
/// older and newer binaries can read each other's files as long as
/// `schema_version` does not exceed [`CURRENT_SCHEMA_VERSION`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSnapshot {
    pub schema_version: u32,
    #[serde(default)]
    pub run_id: Option<RunId>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub state: FrontierState,
}

impl CheckpointSnapshot {
    /// Wrap a state for writing.
    pub fn new(run_id: &RunId, state: &FrontierState) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            run_id: Some(run_id.clone()),
            saved_at: Some(Utc::now()),
            state: state.clone(),
        }
    }
}
