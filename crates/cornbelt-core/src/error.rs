//! Error types for cornbelt-core.
//!
//! Fetch and file-read failures surface as [`Error`]. The collection pipeline
//! turns them into per-step `false` results and the persistence writer never
//! returns them at all, so callers only see these errors from the lower-level
//! building blocks.
//!
//! ## Retry classification
//!
//! | Error | Retried |
//! |-------|---------|
//! | [`Error::Http`] timeout or connect failure | yes |
//! | [`Error::Api`] with status 429 or 5xx | yes |
//! | [`Error::Api`] with any other status | no |
//! | [`Error::InvalidResponse`] | no |
//! | [`Error::Validation`] | no |
//!
//! A retryable [`Error::Api`] may carry the server's `Retry-After` hint,
//! which takes the place of the computed backoff delay.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use cornbelt_types::ValidationError;

use crate::config::ConfigError;

/// Errors produced by the fetch client, the file reader and configuration.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The weather API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Reason reported by the API, or the status text.
        message: String,
        /// Wait requested by the server through `Retry-After`.
        retry_after: Option<Duration>,
    },

    /// The API answered 200 but the body could not be decoded into records.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Bad input to a request (coordinates, missing parameters).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A record file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record file contained malformed JSON.
    #[error("Malformed JSON in {path} (line {line}): {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The run was interrupted.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Server-requested wait before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
