//! Error taxonomy for corpus operations.
//!
//! Every single-shot action converts a [`CorpusError`] into exactly one
//! user-visible notification at the action boundary (see
//! [`manager`](crate::manager)). Per-file failures inside a bulk ingestion
//! are not errors at all: they are collected as
//! [`FailedItem`](crate::ingest::FailedItem)s in the summary.

use thiserror::Error;

/// Shown for HTTP 413 when the server sends no message of its own.
pub const DEFAULT_TOO_LARGE_MESSAGE: &str = "File too large. Maximum allowed size is 16MB.";
/// Shown for HTTP 429 when the server sends no message of its own.
pub const DEFAULT_RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

#[derive(Debug, Error)]
pub enum CorpusError {
    /// Transport failure or non-success status from the remote store.
    #[error("{0}")]
    Fetch(String),

    /// Rejected locally before upload, or HTTP 413 from the store.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// HTTP 429 from the store.
    #[error("{0}")]
    RateLimited(String),

    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    #[error("archive contains no supported files")]
    EmptyArchive,

    #[error("{0}")]
    InvalidSelection(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("invalid CSV: {0}")]
    InvalidCsv(String),

    #[error("missing required field(s): {}", .0.join(", "))]
    MissingField(Vec<String>),

    #[error("invalid value for {field}: '{value}'")]
    InvalidValue { field: String, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CorpusResult<T> = std::result::Result<T, CorpusError>;

/// Map an unsuccessful HTTP status to the matching error variant.
///
/// The server's own `message` wins when present; otherwise 413 and 429 get
/// fixed defaults and anything else names the operation and status.
pub fn classify_status(status: u16, server_message: Option<String>, operation: &str) -> CorpusError {
    match status {
        413 => CorpusError::PayloadTooLarge(
            server_message.unwrap_or_else(|| DEFAULT_TOO_LARGE_MESSAGE.to_string()),
        ),
        429 => CorpusError::RateLimited(
            server_message.unwrap_or_else(|| DEFAULT_RATE_LIMITED_MESSAGE.to_string()),
        ),
        _ => CorpusError::Fetch(
            server_message.unwrap_or_else(|| format!("{} failed: HTTP {}", operation, status)),
        ),
    }
}
