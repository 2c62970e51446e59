//! Error types for campuscorpus.
//!
//! Library crates use [`CorpusError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all campuscorpus operations.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    /// Configuration loading or validation error. Fatal at startup.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during crawl or document download.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// PDF loading or page extraction error.
    #[error("pdf error: {0}")]
    Pdf(String),

    /// Entry file or corpus storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Checkpoint read/write error. Never fatal on its own.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Hard resource limit crossed (process memory).
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CorpusError>;

impl CorpusError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should abort the whole run rather than skip a unit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::ResourceExhausted(_))
    }
}
