//! Turning crawled pages into web corpus entries.

use tracing::debug;

use campuscorpus_crawler::PageHandler;
use campuscorpus_markdown::{
    Normalizer, chunk_sections, extract_anchors, extract_title_from_markdown, html_to_markdown,
};
use campuscorpus_shared::{AppConfig, ContentEntry, PageContent, Result, SourceType};

use crate::pipeline::ProgressReporter;
use crate::tagger::EntryTagger;

const UNTITLED: &str = "No Title";

/// Normalizes, sections, and tags each fetched page.
pub struct WebPageHandler<'a> {
    normalizer: Normalizer,
    tagger: EntryTagger,
    min_page_chars: usize,
    min_section_chars: usize,
    progress: &'a dyn ProgressReporter,
    pages_seen: usize,
    max_pages: usize,
}

impl<'a> WebPageHandler<'a> {
    /// `pages_seen` starts at the number of pages a restored crawl already
    /// processed.
    pub fn new(
        config: &AppConfig,
        progress: &'a dyn ProgressReporter,
        pages_seen: usize,
    ) -> Result<Self> {
        Ok(Self {
            normalizer: Normalizer::with_extra_rules(&config.normalizer.extra_rules)?,
            tagger: EntryTagger::from_config(config),
            min_page_chars: config.normalizer.min_page_chars,
            min_section_chars: config.normalizer.min_section_chars,
            progress,
            pages_seen,
            max_pages: config.crawl.max_pages,
        })
    }

    fn markdown_of(&self, page: &PageContent) -> Result<String> {
        match &page.html_for_links {
            Some(html) => html_to_markdown(html, &page.url),
            None => Ok(page.raw_markup.clone()),
        }
    }
}

impl PageHandler for WebPageHandler<'_> {
    fn handle_page(&mut self, page: PageContent) -> Result<Vec<ContentEntry>> {
        self.pages_seen += 1;
        self.progress.page_processed(&page.url, self.pages_seen, self.max_pages);

        let clean = self.normalizer.normalize(&self.markdown_of(&page)?);
        if clean.chars().count() <= self.min_page_chars {
            debug!(url = %page.url, chars = clean.len(), "page too short after cleaning");
            return Ok(Vec::new());
        }

        let anchors = page
            .html_for_links
            .as_deref()
            .map(|html| extract_anchors(html, &page.url))
            .unwrap_or_default();
        let sections = chunk_sections(&clean, &anchors, &page.url, self.min_section_chars);

        let title = if page.title.is_empty() {
            extract_title_from_markdown(&clean).unwrap_or_else(|| UNTITLED.to_string())
        } else {
            page.title.clone()
        };
        let persona = self.tagger.persona(&page.url).to_string();
        let faq_category = self.tagger.faq_category(&page.url).map(String::from);
        let total_chunks = sections.len();

        debug!(url = %page.url, sections = total_chunks, anchors = anchors.len(), %persona, "page sectioned");

        Ok(sections
            .into_iter()
            .enumerate()
            .map(|(chunk_index, section)| ContentEntry {
                title: title.clone(),
                section_header: section.header,
                text: section.text,
                url: page.url.clone(),
                anchor_url: section.anchor_url,
                anchor_id: section.anchor_id,
                header_level: section.level,
                persona: persona.clone(),
                faq_category: faq_category.clone(),
                source_type: SourceType::Web,
                chunk_index,
                total_chunks: Some(total_chunks),
                pdf_page: None,
                total_pages: None,
                total_chunks_on_page: None,
                priority: None,
                pdf_key: None,
                scraped_at: Some(page.fetched_at),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use campuscorpus_shared::HeaderLevel;
    use chrono::Utc;

    fn page(url: &str, title: &str, html: &str) -> PageContent {
        PageContent {
            url: url.into(),
            title: title.into(),
            raw_markup: html.into(),
            html_for_links: Some(html.into()),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn sections_become_tagged_entries() {
        let html = r##"<html><body><main>
            <h2 id="apply">How to Apply</h2>
            <p>First-year students apply through the online portal before the priority deadline in March.</p>
            <h2 id="visit">Campus Visits</h2>
            <p>Tours leave the welcome center every weekday at ten and two, rain or shine, all year.</p>
        </main></body></html>"##;
        let progress = SilentProgress;
        let mut handler = WebPageHandler::new(&AppConfig::default(), &progress, 0).unwrap();

        let entries = handler
            .handle_page(page("https://www.nku.edu/admissions", "Admissions | NKU", html))
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].anchor_url, "https://www.nku.edu/admissions#apply");
        assert_eq!(entries[0].header_level, Some(HeaderLevel::H2));
        assert_eq!(entries[1].anchor_id.as_deref(), Some("visit"));
        assert_eq!(entries[1].chunk_index, 1);
        assert!(entries.iter().all(|e| e.total_chunks == Some(2)));
        assert!(entries.iter().all(|e| e.persona == "prospective"));
        assert!(entries.iter().all(|e| e.title == "Admissions | NKU"));
    }

    #[test]
    fn thin_pages_produce_nothing() {
        let html = "<html><body><main><p>Loading</p></main></body></html>";
        let progress = SilentProgress;
        let mut handler = WebPageHandler::new(&AppConfig::default(), &progress, 0).unwrap();
        let entries = handler.handle_page(page("https://www.nku.edu/x", "X", html)).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn plain_text_page_is_one_entry() {
        let text = "Parking permits are required for all vehicles on campus. ".repeat(3);
        let mut p = page("https://www.nku.edu/parking.txt", "", &text);
        p.html_for_links = None;

        let progress = SilentProgress;
        let mut handler = WebPageHandler::new(&AppConfig::default(), &progress, 0).unwrap();
        let entries = handler.handle_page(p).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, UNTITLED);
        assert!(entries[0].anchor_id.is_none());
        assert_eq!(entries[0].anchor_url, "https://www.nku.edu/parking.txt");
    }
}
