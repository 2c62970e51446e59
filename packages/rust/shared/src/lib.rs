//! Shared types, error model, and configuration for campuscorpus.
//!
//! This crate is the foundation depended on by all other campuscorpus crates.
//! It provides:
//! - [`CorpusError`]: the unified error type
//! - Domain types ([`ContentEntry`], [`CrawlTarget`], [`FrontierState`], [`Anchor`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CheckpointConfig, CrawlConfig, CrawlSettings, DocumentSource, FaqLink,
    MemoryConfig, MergeConfig, NormalizerConfig, OutputConfig, PdfConfig, PersonaRule,
    cache_file_name, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_config_path, validate_config,
};
pub use error::{CorpusError, Result};
pub use types::{
    Anchor, CURRENT_SCHEMA_VERSION, CheckpointSnapshot, ContentEntry, CrawlTarget, Fingerprint,
    FrontierState, HeaderLevel, PageContent, Priority, RunId, SourceType, citation_base,
    normalize_url,
};
