//! Error types for lyricsmith.
//!
//! Library crates use [`LyricsmithError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all lyricsmith operations.
#[derive(Debug, thiserror::Error)]
pub enum LyricsmithError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport or HTTP-level failure talking to an external capability.
    #[error("provider error: {0}")]
    Provider(String),

    /// An external call exceeded its time bound.
    #[error("{operation} timed out after {after_secs}s")]
    Timeout { operation: String, after_secs: u64 },

    /// The provider answered but the answer carried no content.
    #[error("empty response from {0}")]
    EmptyResponse(String),

    /// Encyclopedia miss: no page, or an ambiguous title.
    #[error("not found: {0}")]
    NotFound(String),

    /// Response parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or cache layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LyricsmithError>;

impl LyricsmithError {
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

    /// Create a not-found error from any displayable message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a provider-level failure (transport, timeout,
    /// or empty response).
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::Provider(_) | Self::Timeout { .. } | Self::EmptyResponse(_)
        )
    }
}
