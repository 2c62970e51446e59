//! HTML-to-Markdown conversion, boilerplate normalization, and section chunking.
//!
//! Fetched HTML goes through three stages here:
//! 1. [`html_to_markdown`] strips page chrome and converts with `htmd`
//! 2. [`Normalizer::normalize`] removes site boilerplate and repeated lines
//! 3. [`chunk_sections`] splits the text at headers and attaches anchors
//!    found by [`extract_anchors`]

mod cleanup;
mod normalize;
mod sections;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use campuscorpus_shared::{Anchor, CorpusError, HeaderLevel, Result};

pub use normalize::{BoilerplateRule, Normalizer};
pub use sections::{Section, chunk_sections};

/// Tags whose content never reaches the Markdown output.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "iframe", "noscript", "svg", "form", "button", "footer", "aside",
];

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert a fetched HTML page to Markdown.
///
/// 1. Picks the main content container (falls back to `<body>`)
/// 2. Pre-processes HTML tables into Markdown tables
/// 3. Converts HTML → Markdown via `htmd`
/// 4. Runs the cleanup pipeline (permalinks, images, stray tags, links)
#[instrument(skip(html), fields(url = %source_url))]
pub fn html_to_markdown(html: &str, source_url: &str) -> Result<String> {
    let content_html = extract_content_html(html);
    let content_html = preprocess_tables(&content_html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| CorpusError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw_markdown.len(), "htmd conversion complete");

    let base_url = Url::parse(source_url).ok();
    Ok(cleanup::run_pipeline(&raw_markdown, base_url.as_ref()))
}

/// Extract the main content HTML, leaving site chrome behind.
fn extract_content_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    let selectors = [
        "main",
        "[role=\"main\"]",
        "#main-content",
        "article",
        "#content",
        ".content",
        "body",
    ];

    for sel_str in &selectors {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&selector).next() {
                return el.inner_html();
            }
        }
    }

    html.to_string()
}

// ---------------------------------------------------------------------------
// Table pre-processing
// ---------------------------------------------------------------------------

/// Convert `<table>` elements to Markdown table syntax before `htmd` runs.
///
/// `htmd` 0.1 has no table support; course and fee tables would otherwise
/// collapse into a single run of cell text.
fn preprocess_tables(html: &str) -> String {
    static TABLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("table").expect("valid selector"));

    let doc = Html::parse_fragment(html);
    if doc.select(&TABLE_SEL).next().is_none() {
        return html.to_string();
    }

    let mut result = html.to_string();
    for table in doc.select(&TABLE_SEL) {
        let md_table = html_table_to_markdown(&table);
        result = result.replacen(&table.html(), &md_table, 1);
    }
    result
}

fn html_table_to_markdown(table: &ElementRef) -> String {
    static TR_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
    static CELL_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("th, td").expect("valid selector"));

    let rows: Vec<Vec<String>> = table
        .select(&TR_SEL)
        .map(|tr| {
            tr.select(&CELL_SEL)
                .map(|cell| element_text(&cell).replace('|', "/"))
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    if col_count == 0 {
        return String::new();
    }

    let render = |row: &[String]| {
        let mut cells = row.to_vec();
        cells.resize(col_count, String::new());
        format!("| {} |\n", cells.join(" | "))
    };

    let mut md = String::from("\n\n");
    md.push_str(&render(&rows[0]));
    md.push_str(&render(&vec!["---".to_string(); col_count]));
    for row in &rows[1..] {
        md.push_str(&render(row));
    }
    md.push('\n');
    md
}

// ---------------------------------------------------------------------------
// Anchors and titles
// ---------------------------------------------------------------------------

/// Collect `h1`..`h6` elements carrying an `id`, in document order.
///
/// `anchor_url` is `page_url` (fragment removed) plus `#id`.
pub fn extract_anchors(html: &str, page_url: &str) -> Vec<Anchor> {
    static HEADING_SEL: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("h1[id], h2[id], h3[id], h4[id], h5[id], h6[id]").expect("valid selector")
    });

    let base = page_url.split_once('#').map_or(page_url, |(b, _)| b);
    let doc = Html::parse_document(html);

    doc.select(&HEADING_SEL)
        .filter_map(|el| {
            let id = el.value().attr("id")?.trim();
            if id.is_empty() {
                return None;
            }
            let level = HeaderLevel::from_tag(el.value().name())?;
            let header_text = element_text(&el)
                .trim_end_matches(['¶', '§', '#'])
                .trim_end()
                .to_string();
            Some(Anchor {
                anchor_id: id.to_string(),
                header_text,
                anchor_url: format!("{base}#{id}"),
                level,
            })
        })
        .collect()
}

/// Title of an HTML page: `<title>`, else the first `<h1>`.
pub fn extract_html_title(html: &str) -> Option<String> {
    static TITLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("title").expect("valid selector"));
    static H1_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("h1").expect("valid selector"));

    let doc = Html::parse_document(html);
    [&*TITLE_SEL, &*H1_SEL]
        .into_iter()
        .filter_map(|sel| doc.select(sel).next())
        .map(|el| element_text(&el))
        .find(|t| !t.is_empty())
}

/// First H1 in a Markdown document.
pub fn extract_title_from_markdown(md: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));

    H1_RE.captures(md).map(|c| c[1].trim().to_string())
}

/// Element text with whitespace runs collapsed.
fn element_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
