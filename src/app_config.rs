//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use mediabatch_core::MAX_WORKERS;

/// Directory name under the user's config home.
const APP_DIR: &str = "mediabatch";

/// TOML-backed file configuration for mediabatch defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileConfig {
    /// Default output directory for downloads.
    pub output_dir: Option<PathBuf>,
    /// Default cookie file.
    pub cookie_file: Option<PathBuf>,
    /// Default worker count (same range as CLI).
    pub workers: Option<u8>,
    /// Default format selector.
    pub format: Option<String>,
    /// Default merge container.
    pub merge_format: Option<String>,
    /// Default file naming pattern.
    pub output_template: Option<String>,
    /// Replace existing files by default.
    pub overwrite: Option<bool>,
    /// Skip recoverable engine errors.
    pub ignore_errors: Option<bool>,
    /// Path to the yt-dlp program.
    pub engine_bin: Option<PathBuf>,
    /// Path to the ffmpeg helper.
    pub ffmpeg_location: Option<PathBuf>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(workers) = self.workers
            && !(1..=MAX_WORKERS).contains(&usize::from(workers))
        {
            bail!("Invalid config value for `workers`: {workers}. Expected range: 1..={MAX_WORKERS}");
        }
        reject_empty("format", self.format.as_deref())?;
        reject_empty("merge_format", self.merge_format.as_deref())?;
        reject_empty("output_template", self.output_template.as_deref())?;
        Ok(())
    }
}

fn reject_empty(field: &str, value: Option<&str>) -> Result<()> {
    if value.is_some_and(|value| value.trim().is_empty()) {
        bail!("Invalid config value for `{field}`: must not be empty");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Returns the stable string label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Verbose => "verbose",
            Self::Quiet => "quiet",
            Self::Debug => "debug",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/mediabatch/config.toml`
/// 2. `$HOME/.config/mediabatch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "cookie_file" => {
                cfg.cookie_file = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "workers" => cfg.workers = Some(parse_integer_u8(value).with_context(context)?),
            "format" => cfg.format = Some(parse_string_literal(value).with_context(context)?),
            "merge_format" => {
                cfg.merge_format = Some(parse_string_literal(value).with_context(context)?);
            }
            "output_template" => {
                cfg.output_template = Some(parse_string_literal(value).with_context(context)?);
            }
            "overwrite" => cfg.overwrite = Some(parse_boolean(value).with_context(context)?),
            "ignore_errors" => {
                cfg.ignore_errors = Some(parse_boolean(value).with_context(context)?);
            }
            "engine_bin" => {
                cfg.engine_bin = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "ffmpeg_location" => {
                cfg.ffmpeg_location = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u8(raw_value: &str) -> Result<u8> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<u16>()?;
    u8::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u8"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
