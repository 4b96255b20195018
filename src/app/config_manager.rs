//! Configuration lifecycle: load file config and merge CLI overrides.

use std::path::PathBuf;

use anyhow::Result;

use crate::app::config_runtime::{self, CliValueSources};
use crate::app_config::{FileConfig, VerbositySetting, load_default_file_config};
use crate::cli::Cli;

/// Effective arguments plus where the file layer came from.
pub(crate) struct ResolvedConfig {
    pub(crate) args: Cli,
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) loaded_from_file: bool,
    pub(crate) file_verbosity: Option<&'static str>,
}

/// Loads the config file and merges it under the command line.
pub(crate) fn resolve_config(cli: Cli, cli_sources: &CliValueSources) -> Result<ResolvedConfig> {
    let loaded_config = load_default_file_config()?;
    let loaded_from_file = loaded_config.config.is_some();
    let file_verbosity = file_verbosity_label(loaded_config.config.as_ref());
    let args =
        config_runtime::apply_config_defaults(cli, cli_sources, loaded_config.config.as_ref())?;
    Ok(ResolvedConfig {
        args,
        config_path: loaded_config.path,
        loaded_from_file,
        file_verbosity,
    })
}

/// Label of the verbosity set in the config file, if any.
fn file_verbosity_label(config: Option<&FileConfig>) -> Option<&'static str> {
    config
        .and_then(|config| config.verbosity)
        .map(VerbositySetting::as_str)
}
