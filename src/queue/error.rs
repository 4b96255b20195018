//! Error types for queue construction.

use thiserror::Error;

/// Errors that reject a batch before any download starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Nothing was left after trimming and discarding blank lines.
    #[error("no URLs entered\n  Suggestion: provide at least one URL, one per line")]
    EmptyQueue,

    /// Strict mode found lines that are not web URLs.
    #[error("invalid URL on line {line} '{url}': {reason}\n  Suggestion: use http:// or https:// URLs")]
    InvalidUrl {
        /// 1-based line number in the raw input.
        line: usize,
        /// The offending (trimmed) line.
        url: String,
        /// Why the URL was rejected.
        reason: String,
    },
}

impl ValidationError {
    /// Creates an `InvalidUrl` error.
    #[must_use]
    pub fn invalid_url(line: usize, url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            line,
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
