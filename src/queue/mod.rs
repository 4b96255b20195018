//! Input normalization into an ordered download queue.
//!
//! The [`UrlQueueBuilder`] turns raw user input (one URL per line) into the
//! ordered sequence of [`DownloadRequest`]s the orchestrator executes.
//!
//! # Rules
//!
//! - Each line is trimmed; blank lines are discarded
//! - Duplicates are dropped, keeping the position of the first occurrence
//!   (exact, case-sensitive match)
//! - An empty result is a [`ValidationError::EmptyQueue`]
//!
//! Building is pure: the same input always yields the same queue.
//!
//! # Example
//!
//! ```
//! use mediabatch_core::queue::UrlQueueBuilder;
//!
//! let queue = UrlQueueBuilder::new().build(["a", " b ", "", "a"]).unwrap();
//! let urls: Vec<_> = queue.iter().map(|r| r.url()).collect();
//! assert_eq!(urls, ["a", "b"]);
//! ```

mod error;
mod request;

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

pub use error::ValidationError;
pub use request::DownloadRequest;

/// Result of planning a queue: the requests plus what was discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuePlan {
    /// Requests in first-seen order.
    pub requests: Vec<DownloadRequest>,
    /// Duplicate lines that were dropped, in input order.
    pub duplicates: Vec<String>,
}

impl QueuePlan {
    /// Returns the number of duplicate lines that were dropped.
    #[must_use]
    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates.len()
    }
}

/// Builds an ordered, deduplicated queue of download requests.
#[derive(Debug, Clone, Default)]
pub struct UrlQueueBuilder {
    target_dir: Option<PathBuf>,
    overrides: BTreeMap<String, Value>,
    require_web_urls: bool,
}

impl UrlQueueBuilder {
    /// Creates a builder with no target directory and no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target directory stamped onto every request.
    #[must_use]
    pub fn target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target_dir = Some(dir.into());
        self
    }

    /// Adds an engine option override stamped onto every request.
    ///
    /// Keys the engine options do not model become raw engine flags (see
    /// [`EngineOptions::extra`](crate::engine::EngineOptions::extra)), so
    /// overrides must come from trusted input.
    #[must_use]
    pub fn option_override(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Rejects lines that are not absolute `http`/`https` URLs.
    #[must_use]
    pub fn require_web_urls(mut self, enabled: bool) -> Self {
        self.require_web_urls = enabled;
        self
    }

    /// Builds the queue from raw lines.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyQueue`] when no non-blank line remains,
    /// or [`ValidationError::InvalidUrl`] in strict mode.
    pub fn build<I, S>(&self, raw_lines: I) -> Result<Vec<DownloadRequest>, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.plan(raw_lines).map(|plan| plan.requests)
    }

    /// Builds the queue from a newline-separated block of text.
    ///
    /// # Errors
    ///
    /// Same as [`UrlQueueBuilder::build`].
    pub fn from_text(&self, text: &str) -> Result<QueuePlan, ValidationError> {
        self.plan(text.lines())
    }

    /// Builds the queue and reports the duplicates that were dropped.
    ///
    /// # Errors
    ///
    /// Same as [`UrlQueueBuilder::build`].
    #[instrument(level = "debug", skip_all)]
    pub fn plan<I, S>(&self, raw_lines: I) -> Result<QueuePlan, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut requests = Vec::new();
        let mut duplicates = Vec::new();

        for (line_index, raw) in raw_lines.into_iter().enumerate() {
            let url = raw.as_ref().trim();
            if url.is_empty() {
                continue;
            }
            if self.require_web_urls {
                check_web_url(line_index + 1, url)?;
            }
            if !seen.insert(url.to_string()) {
                debug!(url, "dropping duplicate URL");
                duplicates.push(url.to_string());
                continue;
            }

            let mut request = DownloadRequest::new(url).with_overrides(self.overrides.clone());
            if let Some(dir) = &self.target_dir {
                request = request.with_target_dir(dir.clone());
            }
            requests.push(request);
        }

        if requests.is_empty() {
            return Err(ValidationError::EmptyQueue);
        }

        debug!(
            queued = requests.len(),
            duplicates = duplicates.len(),
            "queue planned"
        );
        Ok(QueuePlan {
            requests,
            duplicates,
        })
    }
}

fn check_web_url(line: usize, candidate: &str) -> Result<(), ValidationError> {
    let parsed =
        Url::parse(candidate).map_err(|e| ValidationError::invalid_url(line, candidate, e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ValidationError::invalid_url(
                line,
                candidate,
                format!("scheme '{other}' is not supported"),
            ));
        }
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::invalid_url(line, candidate, "URL has no host"));
    }
    Ok(())
}
