//! Core pipeline orchestration and domain logic for campuscorpus.
//!
//! This crate ties together crawling, page normalization and sectioning,
//! PDF extraction, tagging, and the final merge into end-to-end workflows
//! (see [`pipeline::CorpusPipeline`]).

pub mod merge;
pub mod pipeline;
pub mod tagger;
pub mod web;

pub use merge::{ErrorFilter, MergeStats, merge, merge_files};
pub use pipeline::{
    CorpusPipeline, PdfSummary, ProgressReporter, RunMode, RunSummary, SilentProgress,
};
pub use tagger::{EntryTagger, detect_persona, match_faq_category};
pub use web::WebPageHandler;
