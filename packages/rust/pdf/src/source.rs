//! Page-addressable text sources.

use std::path::Path;

use lopdf::Document;

use campuscorpus_shared::{CorpusError, Result};

/// Anything that can hand out the text spans of numbered pages.
pub trait PageSource {
    fn page_count(&self) -> u32;

    /// Text spans of the 1-indexed `page`, in reading order.
    fn page_spans(&self, page: u32) -> Result<Vec<String>>;
}

/// [`PageSource`] over a PDF file parsed with `lopdf`.
pub struct LopdfSource {
    doc: Document,
    page_count: u32,
}

impl LopdfSource {
    /// Parse the document at `path`. Blocking.
    pub fn open(path: &Path) -> Result<Self> {
        let doc = Document::load(path)
            .map_err(|e| CorpusError::Pdf(format!("{}: {e}", path.display())))?;
        let page_count = doc.get_pages().len() as u32;
        Ok(Self { doc, page_count })
    }
}

impl PageSource for LopdfSource {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn page_spans(&self, page: u32) -> Result<Vec<String>> {
        let text = self
            .doc
            .extract_text(&[page])
            .map_err(|e| CorpusError::Pdf(format!("page {page}: {e}")))?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }
}
