//! Polite, resumable web crawling for the campus corpus.
//!
//! This crate provides:
//! - [`frontier`]: the to-visit queue with checkpoint/restore
//! - [`scope`]: domain, extension, and glob filtering
//! - [`engine`]: the concurrent crawl coordinator
//! - [`memory`]: process memory sampling used to stop runaway crawls
//! - [`backoff`]: retry delays

pub mod backoff;
pub mod engine;
mod fetch;
pub mod frontier;
pub mod memory;
pub mod scope;

pub use backoff::ExponentialBackoff;
pub use engine::{CrawlReport, CrawlSinks, Crawler, PageHandler, StopReason};
pub use fetch::FetchReport;
pub use frontier::{Disposition, FetchOutcome, Frontier};
pub use memory::{MemoryGuard, MemoryProbe, MemoryStatus, SysinfoProbe};
pub use scope::CrawlScope;
