//! Error types for the retrieval engine boundary.
//!
//! Every variant describes the failure of a single job. The orchestrator
//! records them and moves on; none of them aborts a batch.

use std::path::PathBuf;

use thiserror::Error;

/// Errors a [`RetrievalEngine`](super::RetrievalEngine) reports for one URL.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine program could not be started.
    #[error("failed to start engine program {}: {source}", .program.display())]
    Spawn {
        /// The program that failed to launch.
        program: PathBuf,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The engine ran and exited unsuccessfully.
    #[error("engine failed for {url} ({}): {message}", describe_exit(.code))]
    ExitStatus {
        /// The URL being downloaded.
        url: String,
        /// Process exit code, if the process exited normally.
        code: Option<i32>,
        /// Last error message the engine printed.
        message: String,
    },

    /// Reading engine output or waiting on it failed.
    #[error("IO error while running engine for {url}: {source}")]
    Io {
        /// The URL being downloaded.
        url: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A request's option override had the wrong shape.
    #[error("invalid engine option '{key}': {reason}")]
    InvalidOption {
        /// The override key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The transfer was aborted through the cancellation flag.
    #[error("download of {url} was cancelled")]
    Cancelled {
        /// The URL being downloaded.
        url: String,
    },

    /// Any other retrieval failure reported by an engine implementation.
    #[error("{message}")]
    Failed {
        /// The URL being downloaded.
        url: String,
        /// Human readable failure description.
        message: String,
    },
}

impl EngineError {
    /// Creates a spawn error.
    pub fn spawn(program: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Creates an exit status error.
    pub fn exit_status(url: impl Into<String>, code: Option<i32>, message: impl Into<String>) -> Self {
        Self::ExitStatus {
            url: url.into(),
            code,
            message: message.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid option error.
    pub fn invalid_option(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Creates a generic retrieval failure.
    pub fn failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error came from cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

#[allow(clippy::ref_option)]
fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
