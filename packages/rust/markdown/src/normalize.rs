//! Boilerplate removal and line de-duplication for extracted page text.
//!
//! The normalizer is a fixed, ordered list of `pattern -> replacement`
//! rules. Rules are line-scoped (no dot-matches-newline), so a pattern can
//! never swallow the rest of a page.

use regex::Regex;

use campuscorpus_shared::{CorpusError, Result};

/// Upper bound on rule/cleanup rounds before giving up on a fixpoint.
const MAX_PASSES: usize = 8;

/// A single declarative boilerplate rule.
#[derive(Debug, Clone)]
pub struct BoilerplateRule {
    pattern: Regex,
    replacement: String,
}

impl BoilerplateRule {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| CorpusError::config(format!("invalid boilerplate rule '{pattern}': {e}")))?;
        Ok(Self {
            pattern,
            replacement: replacement.into(),
        })
    }

    /// A rule that deletes every match, case-insensitively.
    pub fn remove(pattern: &str) -> Result<Self> {
        Self::new(&format!("(?i){pattern}"), "")
    }

    fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, self.replacement.as_str())
            .into_owned()
    }
}

/// Built-in rules for common university-site chrome.
const DEFAULT_RULES: &[&str] = &[
    // Cookie banners.
    r"(?m)^.*\b(?:this (?:website|site)|we) uses? cookies\b.*$",
    r"This website uses cookies!.*?Accept",
    // Skip links and navigation chrome.
    r"\[Skip to (?:main )?content\]\([^)]*\)",
    r"Skip to (?:main )?content",
    r"Toggle navigation",
    r"\[QUICK LINKS\]\([^)]*\)",
    // Copyright footers.
    r"©\s*\d{4}[^\n]*?All rights reserved\.?",
    r"Connect with us on social media:?",
    // Search prompts and loaders.
    r"Enter the search term(?: or name)?",
    r"Loading - JavaScript",
    r"↑\s+top",
];

/// Pure text normalizer.
#[derive(Debug, Clone)]
pub struct Normalizer {
    rules: Vec<BoilerplateRule>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

fn default_rules() -> Vec<BoilerplateRule> {
    DEFAULT_RULES
        .iter()
        .filter_map(|p| BoilerplateRule::remove(p).ok())
        .collect()
}

impl Normalizer {
    /// Built-in rules followed by `extra` removal patterns from config.
    pub fn with_extra_rules(extra: &[String]) -> Result<Self> {
        let mut rules = default_rules();
        for pattern in extra {
            rules.push(BoilerplateRule::remove(pattern)?);
        }
        Ok(Self { rules })
    }

    /// Build a normalizer from explicit rules only.
    pub fn from_rules(rules: Vec<BoilerplateRule>) -> Self {
        Self { rules }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Strip boilerplate, drop blank lines, and collapse consecutive
    /// duplicate lines (compared trimmed, first occurrence kept).
    ///
    /// `normalize(normalize(x)) == normalize(x)` holds as long as the rules
    /// converge within a few rounds.
    pub fn normalize(&self, raw: &str) -> String {
        let mut current = raw.to_string();
        for _ in 0..MAX_PASSES {
            let next = collapse_lines(&self.apply_rules(&current));
            if next == current {
                return next;
            }
            current = next;
        }
        tracing::debug!(rules = self.rules.len(), "normalizer hit pass limit");
        current
    }

    fn apply_rules(&self, text: &str) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_PASSES {
            let next = self
                .rules
                .iter()
                .fold(current.clone(), |acc, rule| rule.apply(&acc));
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}

fn collapse_lines(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut prev: Option<&str> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if prev != Some(trimmed) {
            kept.push(line.trim_end());
        }
        prev = Some(trimmed);
    }

    kept.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_cookie_banner_and_skip_link() {
        let raw = "[Skip to main content](#main)\nThis website uses cookies to improve your experience.\n# Admissions\nApply today.";
        let clean = Normalizer::default().normalize(raw);
        assert_eq!(clean, "# Admissions\nApply today.");
    }

    #[test]
    fn removes_copyright_footer_without_eating_following_lines() {
        let raw = "Body text here.\n© 2025 Example University. All rights reserved.\nContact the registrar.";
        let clean = Normalizer::default().normalize(raw);
        assert_eq!(clean, "Body text here.\nContact the registrar.");
    }

    #[test]
    fn collapses_consecutive_duplicates_only() {
        let raw = "Menu\n  Menu  \n\nMenu\nNews\nMenu";
        let clean = Normalizer::default().normalize(raw);
        assert_eq!(clean, "Menu\nNews\nMenu");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "Toggle navigation\nToggle navigation\n## Housing\n\n\nLiving on campus is fun.\nLiving on campus is fun.",
            "  leading\nEnter the search term or name\n↑ top\ntrailing  ",
            "Loading - JavaScript\nLoading - JavaScript\n",
            "",
        ];
        let n = Normalizer::default();
        for raw in inputs {
            let once = n.normalize(raw);
            assert_eq!(n.normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn rule_exposing_duplicates_still_converges() {
        // Removing "X" makes the two "A" lines adjacent.
        let n = Normalizer::from_rules(vec![BoilerplateRule::remove("(?m)^X$").unwrap()]);
        let clean = n.normalize("A\nX\nA\nB");
        assert_eq!(clean, "A\nB");
        assert_eq!(n.normalize(&clean), clean);
    }

    #[test]
    fn extra_rules_from_config() {
        let n = Normalizer::with_extra_rules(&[r"Nunn Drive \| Highland Heights".into()]).unwrap();
        assert_eq!(n.rule_count(), DEFAULT_RULES.len() + 1);
        assert_eq!(n.normalize("Address: Nunn Drive | Highland Heights\nHello"), "Address:\nHello");
    }

    #[test]
    fn invalid_extra_rule_is_config_error() {
        let err = Normalizer::with_extra_rules(&["(unclosed".into()]).unwrap_err();
        assert!(matches!(err, CorpusError::Config { .. }));
    }
}
