//! Errors that reject a batch before any download starts.

use thiserror::Error;

use super::MAX_WORKERS;

/// The batch cannot start with the given configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A request has no target directory and none is configured.
    #[error("no output directory configured for {url}")]
    MissingOutputDir {
        /// The first request without a usable directory.
        url: String,
    },

    /// Worker count outside the supported range.
    #[error("invalid worker count {value}: must be between 1 and {MAX_WORKERS}")]
    InvalidWorkers {
        /// The rejected value.
        value: usize,
    },

    /// `run` was called with no requests.
    #[error("batch contains no requests")]
    EmptyBatch,
}

impl ConfigurationError {
    /// Creates a missing output directory error for `url`.
    #[must_use]
    pub fn missing_output_dir(url: impl Into<String>) -> Self {
        Self::MissingOutputDir { url: url.into() }
    }
}
