//! Header-bounded section chunking for normalized web pages.

use std::sync::LazyLock;

use regex::Regex;

use campuscorpus_shared::{Anchor, HeaderLevel};

/// One header-bounded section of a page, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Header text without the `#` markers (`None` for text before any header).
    pub header: Option<String>,
    /// Section text, header line included.
    pub text: String,
    pub anchor_id: Option<String>,
    /// Deep link to the section, or the page URL when no anchor matched.
    pub anchor_url: String,
    pub level: Option<HeaderLevel>,
}

struct OpenSection<'a> {
    header: Option<String>,
    anchor: Option<&'a Anchor>,
    level: Option<HeaderLevel>,
    lines: Vec<&'a str>,
}

impl<'a> OpenSection<'a> {
    fn untitled() -> Self {
        Self {
            header: None,
            anchor: None,
            level: None,
            lines: Vec::new(),
        }
    }

    fn text(&self) -> String {
        self.lines.join("\n").trim().to_string()
    }

    fn close(self, text: String, page_url: &str) -> Section {
        Section {
            header: self.header,
            text,
            anchor_id: self.anchor.map(|a| a.anchor_id.clone()),
            anchor_url: self
                .anchor
                .map(|a| a.anchor_url.clone())
                .unwrap_or_else(|| page_url.to_string()),
            level: self.level,
        }
    }
}

/// Split `clean` into sections at Markdown header lines.
///
/// A header closes the open section only when that section's text is longer
/// than `min_chars`; shorter text is carried into the next section so that
/// nothing is lost. A short trailing section is appended to the previous one.
/// Pages without headers (or without any long-enough section) become a
/// single section with no anchor.
pub fn chunk_sections(
    clean: &str,
    anchors: &[Anchor],
    page_url: &str,
    min_chars: usize,
) -> Vec<Section> {
    static HEADER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)").expect("valid regex"));

    let page_url = page_url
        .split_once('#')
        .map_or(page_url, |(base, _)| base);

    let whole = clean.trim();
    if whole.is_empty() {
        return Vec::new();
    }

    let mut sections: Vec<Section> = Vec::new();
    let mut open = OpenSection::untitled();

    for line in clean.lines() {
        let Some(caps) = HEADER_RE.captures(line) else {
            open.lines.push(line);
            continue;
        };

        let header_text = caps[2].trim().to_string();
        let anchor = resolve_anchor(&header_text, anchors);
        let level = HeaderLevel::from_depth(caps[1].len());

        let text = open.text();
        let carried = if text.chars().count() > min_chars {
            sections.push(open.close(text, page_url));
            Vec::new()
        } else {
            open.lines
        };

        open = OpenSection {
            header: Some(header_text),
            anchor,
            level,
            lines: carried,
        };
        open.lines.push(line);
    }

    let text = open.text();
    if text.chars().count() > min_chars {
        sections.push(open.close(text, page_url));
    } else if let Some(last) = sections.last_mut().filter(|_| !text.is_empty()) {
        last.text.push('\n');
        last.text.push_str(&text);
    }

    if sections.is_empty() {
        sections.push(Section {
            header: None,
            text: whole.to_string(),
            anchor_id: None,
            anchor_url: page_url.to_string(),
            level: None,
        });
    }

    sections
}

/// Exact header-text match first, then a whitespace- and case-insensitive one.
fn resolve_anchor<'a>(header_text: &str, anchors: &'a [Anchor]) -> Option<&'a Anchor> {
    if let Some(exact) = anchors.iter().find(|a| a.header_text == header_text) {
        return Some(exact);
    }
    let wanted = loose(header_text);
    anchors.iter().find(|a| loose(&a.header_text) == wanted)
}

fn loose(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
