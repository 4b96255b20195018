use std::fs;
use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use mediabatch_core::engine::DEFAULT_PROGRAM;
use mediabatch_core::{
    CancelFlag, DownloadOrchestrator, EventSink, FanoutSink, RetrievalEngine, TracingSink,
    UrlQueueBuilder, WriterSink, YtDlpEngine,
};
use tracing::{debug, info, warn};

use crate::app::{
    config_manager, config_runtime, exit_handler, input_processor, progress_manager, terminal,
    validation,
};
use crate::{ProcessExit, output};

pub(crate) async fn run_mediabatch() -> Result<ProcessExit> {
    let (cli, cli_sources) = config_runtime::parse_cli_with_sources();
    let resolved = config_manager::resolve_config(cli, &cli_sources)?;
    let args = resolved.args;

    let default_level = config_runtime::resolve_default_log_level(&args);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(&cli_sources);
    let no_color = terminal::is_no_color_requested(&args);
    terminal::init_tracing(default_level, force_cli_log_level, no_color);

    debug!(
        config_path = ?resolved.config_path,
        loaded_from_file = resolved.loaded_from_file,
        file_verbosity = resolved.file_verbosity.unwrap_or("unset"),
        "CLI arguments resolved"
    );

    let input = input_processor::process_input(&args)?;
    let Some(input_text) = input.text else {
        output::print_quick_start_guidance(input.piped_stdin_was_empty);
        return Ok(exit_handler::determine_no_input_outcome(
            input.piped_stdin_was_empty,
        ));
    };

    let plan = UrlQueueBuilder::new()
        .require_web_urls(args.strict)
        .from_text(&input_text)?;
    info!(
        urls = plan.requests.len(),
        duplicates = plan.duplicates_dropped(),
        "Parsed input"
    );
    for duplicate in &plan.duplicates {
        debug!(url = %duplicate, "Dropped duplicate URL");
    }

    validation::ensure_output_dir_usable(args.output_dir.as_deref())?;
    validation::ensure_cookie_file_exists(args.cookies.as_deref())?;

    let config = config_runtime::build_orchestrator_config(&args);
    let program = args
        .engine_bin
        .clone()
        .unwrap_or_else(|| DEFAULT_PROGRAM.into());
    if which::which(&program).is_err() {
        warn!(program = %program.display(), "engine program not found; downloads will fail");
    }
    let engine: Arc<dyn RetrievalEngine> = Arc::new(YtDlpEngine::with_program(program));

    let cancel = CancelFlag::new();
    let orchestrator = DownloadOrchestrator::new(engine, config)?.with_cancel_flag(cancel.clone());

    if let Some(dir) = &orchestrator.config().output_dir
        && !dir.exists()
    {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;
        info!(dir = %dir.display(), "Created output directory");
    }

    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_signal.cancel();
        }
    });

    let mut sink = FanoutSink::new().with(Arc::new(TracingSink::new()));
    if terminal::should_use_progress_bar(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    ) {
        sink = sink.with(Arc::new(progress_manager::ProgressBarSink::new()));
    }
    if let Some(path) = &args.log_file {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
        sink = sink.with(Arc::new(WriterSink::new(file)));
    }
    let sink: Arc<dyn EventSink> = Arc::new(sink);

    let result = orchestrator.run_plan(plan, sink).await?;

    output::print_completion_summary(&result, args.json)?;
    if let Some(path) = &args.failed_out {
        output::write_failed_urls(path, &result)?;
        if result.failed > 0 {
            info!(path = %path.display(), count = result.failed, "Wrote failed URLs");
        }
    }

    let cancelled = cancel.is_cancelled();
    if cancelled {
        warn!(
            succeeded = result.succeeded,
            skipped = result.skipped,
            "Interrupted. Re-run with the remaining URLs to continue."
        );
    }

    Ok(exit_handler::determine_exit_outcome(&result, cancelled))
}
