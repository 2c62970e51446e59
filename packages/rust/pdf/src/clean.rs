//! Per-page text extraction and cleanup.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use campuscorpus_shared::{CorpusError, PdfConfig, Result};

use crate::source::PageSource;

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

static EXCESS_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("valid regex"));

/// Strips running headers, footers, and page numbers from page text.
#[derive(Debug, Clone)]
pub struct PageCleaner {
    noise: Vec<Regex>,
    min_chars: usize,
}

impl PageCleaner {
    /// Compile case-insensitive noise patterns.
    pub fn new(patterns: &[String], min_chars: usize) -> Result<Self> {
        let noise = patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("(?i){p}"))
                    .map_err(|e| CorpusError::config(format!("invalid pdf noise pattern {p:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { noise, min_chars })
    }

    pub fn from_config(config: &PdfConfig) -> Result<Self> {
        Self::new(&config.noise_patterns, config.min_page_chars)
    }

    /// Cleaned text of the 1-indexed `page`, or `None` when the page cannot
    /// be read or too little text is left.
    pub fn extract_page(&self, source: &dyn PageSource, page: u32) -> Option<String> {
        let spans = match source.page_spans(page) {
            Ok(spans) => spans,
            Err(e) => {
                warn!(page, error = %e, "page extraction failed");
                return None;
            }
        };

        let text = self.clean(&spans.join(" "));
        (text.chars().count() >= self.min_chars).then_some(text)
    }

    pub fn clean(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        for re in &self.noise {
            text = re.replace_all(&text, "").into_owned();
        }
        let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
        let text = EXCESS_SPACES.replace_all(&text, " ");

        text.split('\n')
            .filter(|line| !is_page_number(line.trim()))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

fn is_page_number(line: &str) -> bool {
    !line.is_empty() && line.len() <= 3 && line.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pages(Vec<Vec<&'static str>>);

    impl PageSource for Pages {
        fn page_count(&self) -> u32 {
            self.0.len() as u32
        }

        fn page_spans(&self, page: u32) -> Result<Vec<String>> {
            self.0
                .get(page as usize - 1)
                .map(|spans| spans.iter().map(|s| s.to_string()).collect())
                .ok_or_else(|| CorpusError::Pdf(format!("no page {page}")))
        }
    }

    fn cleaner() -> PageCleaner {
        PageCleaner::from_config(&PdfConfig::default()).unwrap()
    }

    #[test]
    fn removes_running_headers_and_trailing_page_number() {
        let raw = "NKU Catalog 2024-2025   Admission requirements for   freshmen. Page 4 of 310 42";
        assert_eq!(cleaner().clean(raw), "Admission requirements for freshmen.");
    }

    #[test]
    fn noise_patterns_ignore_case() {
        let c = PageCleaner::new(&["printed on:.*".into()], 0).unwrap();
        assert_eq!(c.clean("Tuition table PRINTED ON: 01/02/2025"), "Tuition table");
    }

    #[test]
    fn drops_short_numeric_lines_and_blank_runs() {
        let c = PageCleaner::new(&[], 0).unwrap();
        let raw = "Degree plan\n12\n\n\n\nElectives\n2025";
        assert_eq!(c.clean(raw), "Degree plan\n\nElectives\n2025");
    }

    #[test]
    fn short_pages_are_skipped() {
        let source = Pages(vec![
            vec!["Table of Contents"],
            vec!["Students seeking admission must", "submit official transcripts and test scores."],
        ]);
        let c = cleaner();
        assert!(c.extract_page(&source, 1).is_none());
        let page = c.extract_page(&source, 2).unwrap();
        assert!(page.starts_with("Students seeking admission must submit"));
    }

    #[test]
    fn unreadable_page_is_none() {
        let source = Pages(vec![]);
        assert!(cleaner().extract_page(&source, 3).is_none());
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let err = PageCleaner::new(&["(unclosed".into()], 0).unwrap_err();
        assert!(err.is_fatal());
    }
}
