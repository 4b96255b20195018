//! Orchestrator configuration and the shared engine options template.

use std::path::{Path, PathBuf};

use crate::engine::{EngineOptions, OverwritePolicy};

use super::{ConfigurationError, DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS};

/// Best stream up to 720p, merged with best audio, dropping to 480p.
pub const DEFAULT_FORMAT_SELECTOR: &str =
    "bestvideo[height<=720]+bestaudio/best[height<=720]/best[height<=480]";

/// File naming pattern inside the target directory.
pub const DEFAULT_OUTPUT_PATTERN: &str = "%(title)s.%(ext)s";

/// Container for merged audio and video streams.
pub const DEFAULT_MERGE_FORMAT: &str = "mp4";

/// Options shared by every job in a batch.
///
/// Turned into per-job [`EngineOptions`] once the job's target directory is
/// known.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsTemplate {
    /// Quality/codec preference expression.
    pub format_selector: String,
    /// File naming pattern, relative to the target directory unless absolute.
    pub output_pattern: String,
    /// Container for merged streams.
    pub merge_format: String,
    /// Behavior for pre-existing output files.
    pub overwrite_policy: OverwritePolicy,
    /// Cookie file passed through to the engine.
    pub cookie_file: Option<PathBuf>,
    /// Engine-level leniency for recoverable errors.
    pub ignore_recoverable_errors: bool,
    /// Merge helper location.
    pub engine_binary_path: Option<PathBuf>,
}

impl Default for OptionsTemplate {
    fn default() -> Self {
        Self {
            format_selector: DEFAULT_FORMAT_SELECTOR.to_string(),
            output_pattern: DEFAULT_OUTPUT_PATTERN.to_string(),
            merge_format: DEFAULT_MERGE_FORMAT.to_string(),
            overwrite_policy: OverwritePolicy::SkipExisting,
            cookie_file: None,
            ignore_recoverable_errors: true,
            engine_binary_path: None,
        }
    }
}

impl OptionsTemplate {
    /// Builds the engine options for a job writing into `target_dir`.
    #[must_use]
    pub fn options_for(&self, target_dir: &Path) -> EngineOptions {
        let output_template = if Path::new(&self.output_pattern).is_absolute() {
            self.output_pattern.clone()
        } else {
            target_dir
                .join(&self.output_pattern)
                .to_string_lossy()
                .into_owned()
        };

        EngineOptions {
            format_selector: self.format_selector.clone(),
            output_template,
            merge_format: self.merge_format.clone(),
            overwrite_policy: self.overwrite_policy,
            cookie_file: self.cookie_file.clone(),
            ignore_recoverable_errors: self.ignore_recoverable_errors,
            engine_binary_path: self.engine_binary_path.clone(),
            extra: std::collections::BTreeMap::new(),
        }
    }
}

/// Everything [`DownloadOrchestrator`](super::DownloadOrchestrator) needs
/// besides the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Directory used by requests without their own target directory.
    pub output_dir: Option<PathBuf>,
    /// Number of jobs allowed to run at once.
    pub workers: usize,
    /// Shared engine options.
    pub options: OptionsTemplate,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            workers: DEFAULT_WORKERS,
            options: OptionsTemplate::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Creates a sequential configuration with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default output directory.
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Sets the worker pool size.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Replaces the shared engine options.
    #[must_use]
    pub fn options(mut self, options: OptionsTemplate) -> Self {
        self.options = options;
        self
    }

    /// Checks the values that do not depend on the requests.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidWorkers`] if the pool size is
    /// outside `1..=16`.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.workers) {
            return Err(ConfigurationError::InvalidWorkers {
                value: self.workers,
            });
        }
        Ok(())
    }
}
