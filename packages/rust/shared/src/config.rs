//! Application configuration for campuscorpus.
//!
//! Config is read from `--config <path>`, else `./campuscorpus.toml`, else
//! `~/.campuscorpus/campuscorpus.toml`. Every field has a default, so a
//! missing file means "run with defaults".

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CorpusError, Result};
use crate::types::Priority;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "campuscorpus.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".campuscorpus";

// ---------------------------------------------------------------------------
// Config structs (matching campuscorpus.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub crawl: CrawlSettings,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub pdf: PdfConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub normalizer: NormalizerConfig,

    #[serde(default)]
    pub merge: MergeConfig,

    /// Ordered persona keyword groups; first match wins.
    #[serde(default = "default_personas")]
    pub personas: Vec<PersonaRule>,

    /// Known high-traffic URLs tagged with a FAQ category.
    #[serde(default = "default_faq_links")]
    pub faq_links: Vec<FaqLink>,

    /// Documents fed to the PDF pipeline.
    #[serde(default = "default_documents")]
    pub documents: Vec<DocumentSource>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            crawl: CrawlSettings::default(),
            checkpoint: CheckpointConfig::default(),
            memory: MemoryConfig::default(),
            pdf: PdfConfig::default(),
            output: OutputConfig::default(),
            normalizer: NormalizerConfig::default(),
            merge: MergeConfig::default(),
            personas: default_personas(),
            faq_links: default_faq_links(),
            documents: default_documents(),
        }
    }
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    /// Seed URLs.
    #[serde(default = "default_start_urls")]
    pub start_urls: Vec<String>,

    /// Hosts (and their subdomains) the crawler may visit.
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,

    /// Path extensions never fetched by the web crawler.
    #[serde(default = "default_ignored_extensions")]
    pub ignored_extensions: Vec<String>,

    /// URL path include globs (if non-empty, one must match).
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// URL path exclude globs.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Global budget of successful fetches (including restored ones).
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum concurrent fetches overall.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Maximum concurrent fetches per host.
    #[serde(default = "default_per_host_concurrency")]
    pub per_host_concurrency: usize,

    /// Lower bound of the random politeness delay.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the random politeness delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries granted to a transient failure before it becomes permanent.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// User-Agent strings rotated randomly per request.
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            start_urls: default_start_urls(),
            allowed_domains: default_allowed_domains(),
            ignored_extensions: default_ignored_extensions(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            max_pages: default_max_pages(),
            concurrency: default_concurrency(),
            per_host_concurrency: default_per_host_concurrency(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            user_agents: default_user_agents(),
        }
    }
}

fn default_start_urls() -> Vec<String> {
    vec!["https://www.nku.edu".into()]
}
fn default_allowed_domains() -> Vec<String> {
    [
        "nku.edu",
        "inside.nku.edu",
        "catalog.nku.edu",
        "kb.nku.edu",
        "news.nku.edu",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_ignored_extensions() -> Vec<String> {
    [
        "pdf", "jpg", "jpeg", "png", "gif", "svg", "ico", "mp4", "avi", "mov", "doc", "docx",
        "ppt", "pptx", "xls", "xlsx", "zip", "rar", "exe", "css", "js", "xml", "json",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_max_pages() -> usize {
    5000
}
fn default_concurrency() -> usize {
    4
}
fn default_per_host_concurrency() -> usize {
    1
}
fn default_min_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    3000
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_base_ms() -> u64 {
    500
}
fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".into(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15".into(),
        "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0".into(),
    ]
}

/// `[checkpoint]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Checkpoint file location.
    #[serde(default = "default_checkpoint_path")]
    pub path: String,

    /// Save after every N successful pages.
    #[serde(default = "default_checkpoint_interval")]
    pub interval: usize,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint_path(),
            interval: default_checkpoint_interval(),
        }
    }
}

fn default_checkpoint_path() -> String {
    "var/crawl_checkpoint.json".into()
}
fn default_checkpoint_interval() -> usize {
    100
}

/// `[memory]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Resident memory that triggers a warning.
    #[serde(default = "default_warning_mb")]
    pub warning_mb: u64,

    /// Resident memory that stops the crawl.
    #[serde(default = "default_limit_mb")]
    pub limit_mb: u64,

    /// Sampling period.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            warning_mb: default_warning_mb(),
            limit_mb: default_limit_mb(),
            check_interval_secs: default_check_interval_secs(),
        }
    }
}

fn default_warning_mb() -> u64 {
    400
}
fn default_limit_mb() -> u64 {
    500
}
fn default_check_interval_secs() -> u64 {
    15
}

/// `[pdf]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Where downloaded documents are kept between runs.
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    /// Target chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Pages with less cleaned text than this are skipped.
    #[serde(default = "default_min_page_chars")]
    pub min_page_chars: usize,

    /// Documents processed concurrently.
    #[serde(default = "default_pdf_workers")]
    pub workers: usize,

    /// Running headers/footers removed from every page (regex, case-insensitive).
    #[serde(default = "default_noise_patterns")]
    pub noise_patterns: Vec<String>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_page_chars: default_min_page_chars(),
            workers: default_pdf_workers(),
            noise_patterns: default_noise_patterns(),
        }
    }
}

fn default_download_dir() -> String {
    "var/pdf_downloads".into()
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    100
}
fn default_min_page_chars() -> usize {
    50
}
fn default_pdf_workers() -> usize {
    2
}
fn default_noise_patterns() -> Vec<String> {
    [
        r"NKU Catalog \d{4}-\d{4}",
        r"Northern Kentucky University",
        r"Page \d+ of \d+",
        r"www\.nku\.edu",
        r"Printed on:.*",
        r"Generated from.*",
        r"\d+\s*$",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Incrementally appended web entries.
    #[serde(default = "default_web_entries")]
    pub web_entries: String,

    /// PDF entries.
    #[serde(default = "default_pdf_entries")]
    pub pdf_entries: String,

    /// Final merged corpus.
    #[serde(default = "default_corpus")]
    pub corpus: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            web_entries: default_web_entries(),
            pdf_entries: default_pdf_entries(),
            corpus: default_corpus(),
        }
    }
}

fn default_web_entries() -> String {
    "var/campus_data.jsonl".into()
}
fn default_pdf_entries() -> String {
    "var/campus_pdfs.jsonl".into()
}
fn default_corpus() -> String {
    "var/combined_campus_data.jsonl".into()
}

/// `[normalizer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Extra boilerplate regexes removed after the built-in rules.
    #[serde(default = "default_extra_rules")]
    pub extra_rules: Vec<String>,

    /// Pages whose cleaned text is not longer than this are dropped.
    #[serde(default = "default_min_page_text")]
    pub min_page_chars: usize,

    /// Sections whose text is not longer than this are merged away.
    #[serde(default = "default_min_section_chars")]
    pub min_section_chars: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            extra_rules: default_extra_rules(),
            min_page_chars: default_min_page_text(),
            min_section_chars: default_min_section_chars(),
        }
    }
}

fn default_extra_rules() -> Vec<String> {
    [
        r"NKU uses cookies on this website.*",
        r"\[!\[Canvas online learning\][^\n]*?Search the NKU Site",
        r"(?m)^\* \[Prospective Students\].*$",
        r"Northern Kentucky University\s+Nunn Drive \| Highland Heights, Kentucky 41099\s+Phone: \(859\) 572-5100",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_min_page_text() -> usize {
    100
}
fn default_min_section_chars() -> usize {
    50
}

/// `[merge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Substrings marking an entry as an error page (case-insensitive).
    #[serde(default = "default_error_indicators")]
    pub error_indicators: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            error_indicators: default_error_indicators(),
        }
    }
}

fn default_error_indicators() -> Vec<String> {
    [
        "page not found",
        "404",
        "error",
        "not available",
        "does not exist",
        "could not be found",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[[personas]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaRule {
    pub label: String,
    pub keywords: Vec<String>,
}

fn default_personas() -> Vec<PersonaRule> {
    let groups: [(&str, &[&str]); 5] = [
        (
            "prospective",
            &["admissions", "apply", "visit", "future-students", "undergraduate-admissions"],
        ),
        (
            "student",
            &["current-students", "registrar", "myportal", "canvas", "student-life"],
        ),
        ("faculty", &["faculty", "staff", "inside.nku.edu", "faculty-resources"]),
        (
            "financial",
            &["tuition", "financial-aid", "bursar", "scholarships", "cost"],
        ),
        ("housing", &["housing", "residence", "dorms", "living-on-campus"]),
    ];
    groups
        .into_iter()
        .map(|(label, keywords)| PersonaRule {
            label: label.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        })
        .collect()
}

/// `[[faq_links]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqLink {
    pub category: String,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_faq_links() -> Vec<FaqLink> {
    [
        ("campus_map", "https://www.nku.edu/map", "Campus Map"),
        ("mynku_portal", "https://www.nku.edu/mynku", "MyNKU Student Portal"),
        ("financial_aid", "https://www.nku.edu/financialaid", "Financial Aid & Tuition"),
        ("registrar", "https://www.nku.edu/registrar", "Registrar's Office"),
        (
            "academic_calendar",
            "https://www.nku.edu/academics/calendar",
            "Academic Calendar",
        ),
    ]
    .into_iter()
    .map(|(category, url, title)| FaqLink {
        category: category.into(),
        url: url.into(),
        title: title.into(),
        description: None,
    })
    .collect()
}

/// `[[documents]]` entry: one PDF in the static document source list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSource {
    /// Stable key, also the local file stem.
    pub key: String,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub persona: Vec<String>,
    #[serde(default)]
    pub faq_category: Option<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl DocumentSource {
    /// Persona tags as stored on entries (`"all"` when none are configured).
    pub fn persona_label(&self) -> String {
        if self.persona.is_empty() {
            "all".into()
        } else {
            self.persona.join(",")
        }
    }
}

/// Local cache file name for a document key: the key with everything
/// outside `[A-Za-z0-9_-]` replaced by `_`, plus `.pdf`.
pub fn cache_file_name(key: &str) -> String {
    let safe: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{safe}.pdf")
}

fn default_documents() -> Vec<DocumentSource> {
    vec![
        DocumentSource {
            key: "undergraduate_catalog".into(),
            url: "https://catalog.nku.edu/content.php?catoid=49&navoid=2687&print".into(),
            title: "Undergraduate Catalog 2025-2026".into(),
            persona: vec!["prospective".into(), "student".into()],
            faq_category: None,
            priority: Priority::Critical,
        },
        DocumentSource {
            key: "graduate_catalog".into(),
            url: "https://catalog.nku.edu/content.php?catoid=50&navoid=2688&print".into(),
            title: "Graduate Catalog 2025-2026".into(),
            persona: vec!["prospective".into(), "student".into()],
            faq_category: None,
            priority: Priority::Critical,
        },
    ]
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, derived from AppConfig)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration with parsed durations.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub start_urls: Vec<String>,
    pub allowed_domains: Vec<String>,
    pub ignored_extensions: Vec<String>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_pages: usize,
    pub concurrency: usize,
    pub per_host_concurrency: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub user_agents: Vec<String>,
    pub checkpoint_interval: usize,
    pub memory_warning_mb: u64,
    pub memory_limit_mb: u64,
    pub memory_check_interval: Duration,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        let crawl = &config.crawl;
        Self {
            start_urls: crawl.start_urls.clone(),
            allowed_domains: crawl.allowed_domains.clone(),
            ignored_extensions: crawl.ignored_extensions.clone(),
            include_patterns: crawl.include_patterns.clone(),
            exclude_patterns: crawl.exclude_patterns.clone(),
            max_pages: crawl.max_pages,
            concurrency: crawl.concurrency.max(1),
            per_host_concurrency: crawl.per_host_concurrency.max(1),
            min_delay: Duration::from_millis(crawl.min_delay_ms),
            max_delay: Duration::from_millis(crawl.max_delay_ms.max(crawl.min_delay_ms)),
            timeout: Duration::from_secs(crawl.timeout_secs.max(1)),
            max_retries: crawl.max_retries,
            backoff_base: Duration::from_millis(crawl.backoff_base_ms),
            user_agents: crawl.user_agents.clone(),
            checkpoint_interval: config.checkpoint.interval.max(1),
            memory_warning_mb: config.memory.warning_mb,
            memory_limit_mb: config.memory.limit_mb,
            memory_check_interval: Duration::from_secs(config.memory.check_interval_secs.max(1)),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.campuscorpus/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| CorpusError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.campuscorpus/campuscorpus.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Find the config file to use, if any.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    config_file_path().ok().filter(|p| p.exists())
}

/// Load and validate the application config.
///
/// An explicitly requested file must exist; otherwise defaults are used when
/// no config file is found.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = resolve_config_path(explicit) else {
        tracing::debug!("config file not found, using defaults");
        return Ok(AppConfig::default());
    };

    if !path.exists() {
        return Err(CorpusError::config(format!(
            "config file {} does not exist",
            path.display()
        )));
    }

    let config = load_config_from(&path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CorpusError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file to `path` (or the user config location).
/// Returns the path to the created file.
pub fn init_config(path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| CorpusError::io(dir, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| CorpusError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CorpusError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configurations that would fail later in the run.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    for raw in &config.crawl.start_urls {
        Url::parse(raw)
            .map_err(|e| CorpusError::config(format!("invalid start url '{raw}': {e}")))?;
    }

    if config.pdf.chunk_size == 0 || config.pdf.chunk_overlap >= config.pdf.chunk_size {
        return Err(CorpusError::config(format!(
            "pdf.chunk_overlap ({}) must be smaller than pdf.chunk_size ({})",
            config.pdf.chunk_overlap, config.pdf.chunk_size
        )));
    }

    if config.memory.warning_mb > config.memory.limit_mb {
        return Err(CorpusError::config(
            "memory.warning_mb must not exceed memory.limit_mb",
        ));
    }

    let mut keys = HashSet::new();
    let mut files: HashMap<String, &str> = HashMap::new();
    for doc in &config.documents {
        if doc.key.trim().is_empty() {
            return Err(CorpusError::config("document with empty key"));
        }
        if !keys.insert(doc.key.as_str()) {
            return Err(CorpusError::config(format!("duplicate document key '{}'", doc.key)));
        }
        let file = cache_file_name(&doc.key);
        if let Some(other) = files.insert(file.clone(), doc.key.as_str()) {
            return Err(CorpusError::config(format!(
                "document keys '{other}' and '{}' share the cache file {file}",
                doc.key
            )));
        }
        Url::parse(&doc.url).map_err(|e| {
            CorpusError::config(format!("document '{}' has invalid url: {e}", doc.key))
        })?;
    }

    for pattern in config.pdf.noise_patterns.iter().chain(&config.normalizer.extra_rules) {
        regex::Regex::new(pattern)
            .map_err(|e| CorpusError::config(format!("invalid pattern '{pattern}': {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("start_urls"));
        assert!(toml_str.contains("[[documents]]"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.crawl.max_pages, 5000);
        assert_eq!(parsed.pdf.chunk_size, 1000);
        assert_eq!(parsed.personas.len(), 5);
        assert!(validate_config(&parsed).is_ok());
    }

    #[test]
    fn config_with_documents() {
        let toml_str = r#"
[crawl]
start_urls = ["https://www.example.edu"]
allowed_domains = ["example.edu"]

[[documents]]
key = "handbook"
url = "https://www.example.edu/handbook.pdf"
title = "Student Handbook"
persona = ["student"]
priority = "high"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.documents.len(), 1);
        assert_eq!(config.documents[0].priority, Priority::High);
        assert_eq!(config.documents[0].persona_label(), "student");
        // Unspecified sections keep their defaults.
        assert_eq!(config.checkpoint.interval, 100);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn duplicate_document_keys_rejected() {
        let mut config = AppConfig::default();
        let dup = config.documents[0].clone();
        config.documents.push(dup);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate document key"));
    }

    #[test]
    fn cache_file_names_are_sanitized() {
        assert_eq!(cache_file_name("undergrad_catalog"), "undergrad_catalog.pdf");
        assert_eq!(cache_file_name("grad/catalog 2025"), "grad_catalog_2025.pdf");
    }

    #[test]
    fn keys_sharing_a_cache_file_rejected() {
        let mut config = AppConfig::default();
        let mut slash = config.documents[0].clone();
        slash.key = "grad/catalog".into();
        let mut space = config.documents[0].clone();
        space.key = "grad catalog".into();
        config.documents = vec![slash, space];

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("grad_catalog.pdf"));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = AppConfig::default();
        config.pdf.chunk_overlap = config.pdf.chunk_size;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn crawl_config_from_app_config() {
        let app = AppConfig::default();
        let crawl = CrawlConfig::from(&app);
        assert_eq!(crawl.concurrency, 4);
        assert_eq!(crawl.per_host_concurrency, 1);
        assert_eq!(crawl.timeout, Duration::from_secs(30));
        assert_eq!(crawl.checkpoint_interval, 100);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let path = std::env::temp_dir().join(format!("cc-missing-{}.toml", uuid::Uuid::now_v7()));
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, CorpusError::Config { .. }));
    }

    #[test]
    fn document_without_persona_is_tagged_all() {
        let doc = DocumentSource {
            key: "k".into(),
            url: "https://x.edu/k.pdf".into(),
            title: "K".into(),
            persona: vec![],
            faq_category: None,
            priority: Priority::Low,
        };
        assert_eq!(doc.persona_label(), "all");
    }
}
