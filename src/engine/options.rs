//! The options bag passed to the engine for each job.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use super::EngineError;

/// What the engine does when the output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
    /// Leave the existing file in place and skip the item.
    #[default]
    SkipExisting,
    /// Replace the existing file.
    Overwrite,
}

impl OverwritePolicy {
    /// Returns the stable string label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SkipExisting => "skip-existing",
            Self::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OverwritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip-existing" => Ok(Self::SkipExisting),
            "overwrite" => Ok(Self::Overwrite),
            _ => Err(format!("invalid overwrite policy: {s}")),
        }
    }
}

/// Fully resolved engine options for one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOptions {
    /// Quality/codec preference expression.
    pub format_selector: String,
    /// Output path pattern with item metadata placeholders.
    pub output_template: String,
    /// Container used when separate streams are merged.
    pub merge_format: String,
    /// Behavior for pre-existing output files.
    pub overwrite_policy: OverwritePolicy,
    /// Netscape-format cookie file, if any.
    pub cookie_file: Option<PathBuf>,
    /// Let the engine skip recoverable per-item problems instead of failing.
    pub ignore_recoverable_errors: bool,
    /// Location of the external merge helper.
    pub engine_binary_path: Option<PathBuf>,
    /// Engine-specific options not modelled above.
    ///
    /// Each key is passed to the engine program as a raw `--<key>` flag, and
    /// that includes flags that run commands (such as yt-dlp's `--exec`).
    /// Only fill this from trusted input.
    pub extra: BTreeMap<String, Value>,
}

impl EngineOptions {
    /// Applies a request's override map on top of these options.
    ///
    /// Relative `outputTemplate` overrides are resolved against `base_dir`.
    /// Unrecognized keys are kept in [`EngineOptions::extra`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidOption`] when a recognized key carries a
    /// value of the wrong type.
    pub fn apply_overrides(
        &mut self,
        overrides: &BTreeMap<String, Value>,
        base_dir: &Path,
    ) -> Result<(), EngineError> {
        for (key, value) in overrides {
            match key.as_str() {
                "formatSelector" => self.format_selector = expect_string(key, value)?,
                "mergeFormat" => self.merge_format = expect_string(key, value)?,
                "outputTemplate" => {
                    let pattern = expect_string(key, value)?;
                    self.output_template = if Path::new(&pattern).is_absolute() {
                        pattern
                    } else {
                        base_dir.join(pattern).to_string_lossy().into_owned()
                    };
                }
                "overwritePolicy" => {
                    self.overwrite_policy = expect_string(key, value)?
                        .parse()
                        .map_err(|reason| EngineError::invalid_option(key, reason))?;
                }
                "ignoreRecoverableErrors" => {
                    self.ignore_recoverable_errors = value.as_bool().ok_or_else(|| {
                        EngineError::invalid_option(key, "expected a boolean")
                    })?;
                }
                "cookieFile" => self.cookie_file = expect_optional_path(key, value)?,
                "engineBinaryPath" => self.engine_binary_path = expect_optional_path(key, value)?,
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }
}

fn expect_string(key: &str, value: &Value) -> Result<String, EngineError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| EngineError::invalid_option(key, "expected a string"))
}

fn expect_optional_path(key: &str, value: &Value) -> Result<Option<PathBuf>, EngineError> {
    match value {
        Value::Null => Ok(None),
        Value::String(path) => Ok(Some(PathBuf::from(path))),
        _ => Err(EngineError::invalid_option(key, "expected a path string or null")),
    }
}
