//! The unit of work handed to the orchestrator.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

/// One URL to download, with optional per-request settings.
///
/// Immutable once built; the orchestrator only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadRequest {
    url: String,
    target_dir: Option<PathBuf>,
    options_override: BTreeMap<String, Value>,
}

impl DownloadRequest {
    /// Creates a request with no target directory and no overrides.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            target_dir: None,
            options_override: BTreeMap::new(),
        }
    }

    /// Sets the directory this request downloads into.
    #[must_use]
    pub fn with_target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target_dir = Some(dir.into());
        self
    }

    /// Replaces the options override map.
    ///
    /// Unrecognized keys reach the engine as raw flags; only pass trusted
    /// overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: BTreeMap<String, Value>) -> Self {
        self.options_override = overrides;
        self
    }

    /// Returns the source URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the request-specific target directory, if any.
    #[must_use]
    pub fn target_dir(&self) -> Option<&Path> {
        self.target_dir.as_deref()
    }

    /// Returns engine option overrides keyed by option name.
    #[must_use]
    pub fn options_override(&self) -> &BTreeMap<String, Value> {
        &self.options_override
    }
}

impl fmt::Display for DownloadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}
