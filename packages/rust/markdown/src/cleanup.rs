//! Post-conversion cleanup pipeline for Markdown output.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! The passes only fix conversion artifacts; site boilerplate is the
//! normalizer's job.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Run the full cleanup pipeline on raw Markdown text.
pub(crate) fn run_pipeline(md: &str, base_url: Option<&Url>) -> String {
    let mut result = md.to_string();

    result = strip_permalink_markers(&result);
    result = remove_images(&result);
    result = strip_leftover_html(&result);
    result = resolve_links(&result, base_url);
    result = normalize_whitespace(&result);
    result = clean_blank_lines(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Permalink markers on headings
// ---------------------------------------------------------------------------

/// Remove `[¶](#id)`-style self links and closing hashes from heading lines,
/// so the heading text matches the anchor text extracted from markup.
fn strip_permalink_markers(md: &str) -> String {
    static H_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid regex"));
    static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\s*\[(?:¶|§|#|🔗)?\]\(#[^)]*\)").expect("valid regex")
    });
    static CLOSING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+#+\s*$").expect("valid regex"));

    md.lines()
        .map(|line| match H_RE.captures(line) {
            Some(caps) => {
                let text = MARKER_RE.replace_all(&caps[2], "");
                let text = CLOSING_RE.replace(&text, "");
                format!("{} {}", &caps[1], text.trim())
            }
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Images
// ---------------------------------------------------------------------------

/// Drop image embeds; they carry no retrievable text.
fn remove_images(md: &str) -> String {
    static IMG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid regex"));

    IMG_RE.replace_all(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Strip leftover HTML tags
// ---------------------------------------------------------------------------

/// Remove stray container tags that survived the conversion, keeping their
/// inner text. Fenced code is left alone.
fn strip_leftover_html(md: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|details|summary|font|center)(?:\s[^>]*)?>")
            .expect("valid regex")
    });

    let mut out = Vec::new();
    let mut in_code_block = false;

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            out.push(line.to_string());
            continue;
        }
        if in_code_block {
            out.push(line.to_string());
        } else {
            out.push(HTML_TAG_RE.replace_all(line, "").to_string());
        }
    }

    out.join("\n")
}

// ---------------------------------------------------------------------------
// Pass 4: Resolve relative links
// ---------------------------------------------------------------------------

/// Resolve relative URLs in Markdown links against the page URL.
fn resolve_links(md: &str, base_url: Option<&Url>) -> String {
    let Some(base) = base_url else {
        return md.to_string();
    };

    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"));

    LINK_RE
        .replace_all(md, |caps: &regex::Captures| {
            let text = &caps[1];
            let href = &caps[2];

            if href.starts_with("http://")
                || href.starts_with("https://")
                || href.starts_with('#')
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
            {
                return caps[0].to_string();
            }

            match base.join(href) {
                Ok(resolved) => format!("[{text}]({resolved})"),
                Err(_) => caps[0].to_string(),
            }
        })
        .to_string()
}

// ---------------------------------------------------------------------------
// Pass 5: Whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace and replace non-breaking spaces.
fn normalize_whitespace(md: &str) -> String {
    md.lines()
        .map(|line| line.replace('\u{a0}', " ").trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse runs of 3+ blank lines into one blank line.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permalink_markers_removed_from_headings() {
        let input = "## Admissions[¶](#admissions)\n\nText [link](#x) stays\n### Tuition ##";
        let result = strip_permalink_markers(input);
        assert_eq!(result, "## Admissions\n\nText [link](#x) stays\n### Tuition");
    }

    #[test]
    fn images_are_dropped() {
        let input = "Intro ![Campus photo](/img/campus.jpg) text";
        assert_eq!(remove_images(input), "Intro  text");
    }

    #[test]
    fn strip_leftover_html_keeps_inner_text() {
        let input = "<div class=\"note\">Important info</div>\n```html\n<div>Preserved</div>\n```";
        let result = strip_leftover_html(input);
        assert!(result.contains("Important info"));
        assert!(!result.starts_with("<div"));
        assert!(result.contains("<div>Preserved</div>"));
    }

    #[test]
    fn resolve_links_relative_resolved() {
        let base = Url::parse("https://www.example.edu/admissions/apply").unwrap();
        let result = resolve_links("[Visit](/visit) [Aid](https://aid.example.edu/)", Some(&base));
        assert_eq!(
            result,
            "[Visit](https://www.example.edu/visit) [Aid](https://aid.example.edu/)"
        );
    }

    #[test]
    fn resolve_links_keeps_fragments_and_mail() {
        let base = Url::parse("https://www.example.edu/page").unwrap();
        let input = "[Top](#top) [Mail](mailto:info@example.edu)";
        assert_eq!(resolve_links(input, Some(&base)), input);
    }

    #[test]
    fn full_pipeline_cleans_markdown() {
        let input = "# Title [#](#title)\n\n\n\n\n## Section   \n\n<span>Some\u{a0}content</span>\n";
        let base = Url::parse("https://example.edu/page").unwrap();
        let result = run_pipeline(input, Some(&base));

        assert_eq!(result, "# Title\n\n## Section\n\nSome content");
    }
}
