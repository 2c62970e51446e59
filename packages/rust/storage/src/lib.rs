//! File-backed storage for campuscorpus.
//!
//! - [`EntryWriter`] / [`read_entries`] / [`write_entries`]: JSONL entry
//!   files for the web, PDF, and merged corpus streams
//! - [`CheckpointStore`]: atomic, versioned crawl checkpoint
//!
//! **Access rules:** a checkpoint path and an entry file each have a single
//! writer (the crawl coordinator or the merger); readers may run any time.

mod checkpoint;
mod entries;

pub use checkpoint::CheckpointStore;
pub use entries::{EntryWriter, read_entries, write_entries};
