//! URL-based persona and FAQ tagging.

use campuscorpus_shared::{AppConfig, FaqLink, PersonaRule};

/// Label used when no persona keyword matches.
pub const DEFAULT_PERSONA: &str = "all";

/// First persona group with a keyword contained in `url` (case-insensitive),
/// or [`DEFAULT_PERSONA`].
pub fn detect_persona<'a>(url: &str, rules: &'a [PersonaRule]) -> &'a str {
    let url = url.to_lowercase();
    rules
        .iter()
        .find(|rule| {
            rule.keywords
                .iter()
                .any(|k| !k.is_empty() && url.contains(&k.to_lowercase()))
        })
        .map_or(DEFAULT_PERSONA, |rule| rule.label.as_str())
}

/// Category of the first quick link whose URL is contained in `url`.
pub fn match_faq_category<'a>(url: &str, links: &'a [FaqLink]) -> Option<&'a str> {
    links
        .iter()
        .find(|link| !link.url.is_empty() && url.contains(link.url.as_str()))
        .map(|link| link.category.as_str())
}

/// Persona rules and FAQ links bundled for per-page tagging.
#[derive(Debug, Clone, Default)]
pub struct EntryTagger {
    personas: Vec<PersonaRule>,
    faq_links: Vec<FaqLink>,
}

impl EntryTagger {
    pub fn new(personas: Vec<PersonaRule>, faq_links: Vec<FaqLink>) -> Self {
        Self { personas, faq_links }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.personas.clone(), config.faq_links.clone())
    }

    pub fn persona(&self, url: &str) -> &str {
        detect_persona(url, &self.personas)
    }

    pub fn faq_category(&self, url: &str) -> Option<&str> {
        match_faq_category(url, &self.faq_links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagger() -> EntryTagger {
        EntryTagger::from_config(&AppConfig::default())
    }

    #[test]
    fn persona_by_keyword() {
        let t = tagger();
        assert_eq!(t.persona("https://www.nku.edu/admissions/visit.html"), "prospective");
        assert_eq!(t.persona("https://www.nku.edu/Financial-Aid/grants"), "financial");
        assert_eq!(t.persona("https://www.nku.edu/housing/halls"), "housing");
        assert_eq!(t.persona("https://www.nku.edu/athletics"), "all");
    }

    #[test]
    fn first_matching_group_wins() {
        // "apply" (prospective) and "scholarships" (financial) both match.
        let t = tagger();
        assert_eq!(t.persona("https://www.nku.edu/scholarships/apply"), "prospective");
    }

    #[test]
    fn faq_category_by_containment() {
        let t = tagger();
        assert_eq!(
            t.faq_category("https://www.nku.edu/registrar/transcripts.html"),
            Some("registrar")
        );
        assert_eq!(t.faq_category("https://www.nku.edu/map"), Some("campus_map"));
        assert_eq!(t.faq_category("https://www.nku.edu/athletics"), None);
    }

    #[test]
    fn custom_rules() {
        let rules = vec![PersonaRule {
            label: "alumni".into(),
            keywords: vec!["Alumni".into()],
        }];
        assert_eq!(detect_persona("https://x.edu/alumni/events", &rules), "alumni");
        assert_eq!(detect_persona("https://x.edu/", &[]), DEFAULT_PERSONA);
    }
}
