//! Combining web and PDF entries into the final corpus.

use std::path::Path;

use tracing::{info, instrument, warn};

use campuscorpus_shared::{ContentEntry, CorpusError, Result};
use campuscorpus_storage::{read_entries, write_entries};

/// Characters of entry text inspected for error indicators.
const TEXT_PROBE_CHARS: usize = 200;

/// Counts from one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Web entries read.
    pub web_count: usize,
    /// PDF entries read.
    pub pdf_count: usize,
    /// Web entries dropped as error pages.
    pub web_filtered: usize,
    /// PDF entries dropped as error pages.
    pub pdf_filtered: usize,
    /// Entries written to the corpus.
    pub total_count: usize,
}

impl MergeStats {
    pub fn web_kept(&self) -> usize {
        self.web_count - self.web_filtered
    }

    pub fn pdf_kept(&self) -> usize {
        self.pdf_count - self.pdf_filtered
    }

    pub fn filtered(&self) -> usize {
        self.web_filtered + self.pdf_filtered
    }
}

/// Drops entries that look like error pages.
#[derive(Debug, Clone)]
pub struct ErrorFilter {
    indicators: Vec<String>,
}

impl ErrorFilter {
    pub fn new(indicators: &[String]) -> Self {
        Self {
            indicators: indicators
                .iter()
                .map(|i| i.to_lowercase())
                .filter(|i| !i.is_empty())
                .collect(),
        }
    }

    /// Whether the title or the start of the text mentions an indicator.
    pub fn is_error_page(&self, entry: &ContentEntry) -> bool {
        let title = entry.title.to_lowercase();
        let head: String = entry.text.chars().take(TEXT_PROBE_CHARS).collect::<String>().to_lowercase();
        self.indicators
            .iter()
            .any(|i| title.contains(i.as_str()) || head.contains(i.as_str()))
    }
}

/// Web entries first, then PDF entries, minus error pages.
pub fn merge(
    web: Vec<ContentEntry>,
    pdf: Vec<ContentEntry>,
    filter: &ErrorFilter,
) -> (Vec<ContentEntry>, MergeStats) {
    let mut stats = MergeStats {
        web_count: web.len(),
        pdf_count: pdf.len(),
        ..MergeStats::default()
    };

    let mut corpus = Vec::with_capacity(web.len() + pdf.len());
    for entry in web {
        if filter.is_error_page(&entry) {
            stats.web_filtered += 1;
        } else {
            corpus.push(entry);
        }
    }
    for entry in pdf {
        if filter.is_error_page(&entry) {
            stats.pdf_filtered += 1;
        } else {
            corpus.push(entry);
        }
    }
    stats.total_count = corpus.len();
    (corpus, stats)
}

/// Merge two entry files into `out`.
///
/// A missing input is treated as empty; both missing is a config error.
#[instrument(skip(filter), fields(web = %web.display(), pdf = %pdf.display(), out = %out.display()))]
pub async fn merge_files(web: &Path, pdf: &Path, out: &Path, filter: &ErrorFilter) -> Result<MergeStats> {
    let web_entries = read_optional(web).await?;
    let pdf_entries = read_optional(pdf).await?;

    let (web_entries, pdf_entries) = match (web_entries, pdf_entries) {
        (None, None) => {
            return Err(CorpusError::config(format!(
                "nothing to merge: neither {} nor {} exists",
                web.display(),
                pdf.display()
            )));
        }
        (w, p) => (w.unwrap_or_default(), p.unwrap_or_default()),
    };

    let (corpus, stats) = merge(web_entries, pdf_entries, filter);
    write_entries(out, &corpus).await?;

    info!(
        web = stats.web_kept(),
        pdf = stats.pdf_kept(),
        filtered = stats.filtered(),
        total = stats.total_count,
        "corpus merged"
    );
    Ok(stats)
}

async fn read_optional(path: &Path) -> Result<Option<Vec<ContentEntry>>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        warn!(path = %path.display(), "entry file missing, treating as empty");
        return Ok(None);
    }
    read_entries(path).await.map(Some)
}
