use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use mediabatch_core::engine::DEFAULT_HELPER_NAME;
use mediabatch_core::{
    BinaryPathStrategy, MAX_WORKERS, OptionsTemplate, OrchestratorConfig, OverwritePolicy,
    resolve_engine_binary_path,
};

use crate::app_config::{FileConfig, VerbositySetting};
use crate::cli::Cli;

/// Flags whose command-line presence must win over the config file even when
/// they hold their default value.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) workers: bool,
    pub(crate) overwrite: bool,
    pub(crate) abort_on_error: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

pub(crate) fn parse_cli_with_sources() -> (Cli, CliValueSources) {
    let command = Cli::command();
    let matches = command.get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let sources = sources_from_matches(&matches);
    (cli, sources)
}

fn sources_from_matches(matches: &ArgMatches) -> CliValueSources {
    CliValueSources {
        workers: is_commandline_value(matches, "workers"),
        overwrite: is_commandline_value(matches, "overwrite"),
        abort_on_error: is_commandline_value(matches, "abort_on_error"),
        verbose: is_commandline_value(matches, "verbose"),
        quiet: is_commandline_value(matches, "quiet"),
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

pub(crate) fn apply_config_defaults(
    mut args: Cli,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Result<Cli> {
    if let Some(file_config) = file_config {
        fill_missing(&mut args.output_dir, file_config.output_dir.as_ref());
        fill_missing(&mut args.cookies, file_config.cookie_file.as_ref());
        fill_missing(&mut args.format, file_config.format.as_ref());
        fill_missing(&mut args.merge_format, file_config.merge_format.as_ref());
        fill_missing(&mut args.output_template, file_config.output_template.as_ref());
        fill_missing(&mut args.engine_bin, file_config.engine_bin.as_ref());
        if !args.bundled {
            fill_missing(&mut args.ffmpeg, file_config.ffmpeg_location.as_ref());
        }

        if !cli_sources.workers
            && let Some(workers) = file_config.workers
        {
            args.workers = workers;
        }

        if !cli_sources.overwrite
            && let Some(overwrite) = file_config.overwrite
        {
            args.overwrite = overwrite;
        }

        if !cli_sources.abort_on_error
            && let Some(ignore_errors) = file_config.ignore_errors
        {
            args.abort_on_error = !ignore_errors;
        }

        if !cli_sources.verbose
            && !cli_sources.quiet
            && let Some(verbosity) = file_config.verbosity
        {
            apply_config_verbosity(&mut args, verbosity);
        }
    }

    if !(1..=MAX_WORKERS).contains(&usize::from(args.workers)) {
        bail!(
            "Invalid effective workers value: {}. Expected range: 1..={MAX_WORKERS}",
            args.workers
        );
    }

    Ok(args)
}

fn fill_missing<T: Clone>(slot: &mut Option<T>, fallback: Option<&T>) {
    if slot.is_none() {
        *slot = fallback.cloned();
    }
}

fn apply_config_verbosity(args: &mut Cli, verbosity: VerbositySetting) {
    match verbosity {
        VerbositySetting::Default => {
            args.quiet = false;
            args.verbose = 0;
        }
        VerbositySetting::Verbose => {
            args.quiet = false;
            args.verbose = 1;
        }
        VerbositySetting::Quiet => {
            args.quiet = true;
            args.verbose = 0;
        }
        VerbositySetting::Debug => {
            args.quiet = false;
            args.verbose = 2;
        }
    }
}

pub(crate) fn resolve_default_log_level(args: &Cli) -> &'static str {
    if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

pub(crate) fn should_force_cli_log_level(cli_sources: &CliValueSources) -> bool {
    cli_sources.verbose || cli_sources.quiet
}

/// Picks the merge helper location from `--ffmpeg`, `--bundled` or detection.
pub(crate) fn resolve_helper_path(args: &Cli) -> PathBuf {
    if let Some(path) = &args.ffmpeg {
        return path.clone();
    }
    let strategy = if args.bundled {
        BinaryPathStrategy::Bundled
    } else {
        BinaryPathStrategy::detect(DEFAULT_HELPER_NAME)
    };
    resolve_engine_binary_path(strategy, DEFAULT_HELPER_NAME)
}

/// Builds the orchestrator configuration from effective arguments.
pub(crate) fn build_orchestrator_config(args: &Cli) -> OrchestratorConfig {
    let mut options = OptionsTemplate::default();
    if let Some(format) = &args.format {
        options.format_selector.clone_from(format);
    }
    if let Some(merge_format) = &args.merge_format {
        options.merge_format.clone_from(merge_format);
    }
    if let Some(pattern) = &args.output_template {
        options.output_pattern.clone_from(pattern);
    }
    options.overwrite_policy = if args.overwrite {
        OverwritePolicy::Overwrite
    } else {
        OverwritePolicy::SkipExisting
    };
    options.cookie_file.clone_from(&args.cookies);
    options.ignore_recoverable_errors = !args.abort_on_error;
    options.engine_binary_path = Some(resolve_helper_path(args));

    OrchestratorConfig {
        output_dir: args.output_dir.clone(),
        workers: usize::from(args.workers),
        options,
    }
}
