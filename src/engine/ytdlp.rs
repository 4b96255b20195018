//! Engine adapter for the `yt-dlp` command-line program.
//!
//! Each download runs one `yt-dlp` child process. Progress is requested as a
//! JSON line per hook call through `--progress-template`, tagged with a marker
//! so it can be told apart from the program's regular output. Every other
//! line becomes an engine log record.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::{
    CancelFlag, EngineError, EngineLogLevel, EngineOptions, EngineReporter, OverwritePolicy,
    RawStatus, RetrievalEngine,
};

/// Program name used when no explicit path is configured.
pub const DEFAULT_PROGRAM: &str = "yt-dlp";

/// Prefix on progress lines produced by our progress template.
const PROGRESS_MARKER: &str = "[mediabatch-progress]";

/// How often a running child is checked for cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Message used when the program fails without printing an error line.
const NO_ERROR_MESSAGE: &str = "engine exited without an error message";

/// Runs downloads through the `yt-dlp` program.
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    program: PathBuf,
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpEngine {
    /// Creates an engine that runs `yt-dlp` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Creates an engine that runs the given program.
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the program this engine launches.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Builds the argument list for downloading `url` with `options`.
    #[must_use]
    pub fn build_args(url: &str, options: &EngineOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--newline".into(),
            "--no-color".into(),
            "--progress".into(),
            "--progress-template".into(),
            format!("download:{PROGRESS_MARKER}%(progress)j").into(),
            "-f".into(),
            options.format_selector.clone().into(),
            "-o".into(),
            options.output_template.clone().into(),
            "--merge-output-format".into(),
            options.merge_format.clone().into(),
        ];

        args.push(match options.overwrite_policy {
            OverwritePolicy::SkipExisting => "--no-overwrites".into(),
            OverwritePolicy::Overwrite => "--force-overwrites".into(),
        });
        args.push(if options.ignore_recoverable_errors {
            "--ignore-errors".into()
        } else {
            "--abort-on-error".into()
        });
        if let Some(cookie_file) = &options.cookie_file {
            args.push("--cookies".into());
            args.push(cookie_file.clone().into_os_string());
        }
        if let Some(helper) = &options.engine_binary_path {
            args.push("--ffmpeg-location".into());
            args.push(helper.clone().into_os_string());
        }
        for (key, value) in &options.extra {
            push_extra_arg(&mut args, key, value);
        }

        // Everything after `--` is a URL, never an option.
        args.push("--".into());
        args.push(url.into());
        args
    }
}

fn push_extra_arg(args: &mut Vec<OsString>, key: &str, value: &Value) {
    let valid_name =
        !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid_name {
        warn!(key, "skipping engine option with an invalid name");
        return;
    }
    let flag = format!("--{key}");
    match value {
        Value::Bool(true) => args.push(flag.into()),
        Value::Bool(false) | Value::Null => {}
        Value::String(text) => {
            args.push(flag.into());
            args.push(text.into());
        }
        Value::Number(number) => {
            args.push(flag.into());
            args.push(number.to_string().into());
        }
        Value::Array(_) | Value::Object(_) => {
            warn!(key, "skipping engine option with a structured value");
        }
    }
}

/// What one line of program output means.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OutputLine {
    Progress(RawStatus),
    Log(EngineLogLevel, String),
    Blank,
}

pub(crate) fn classify_line(line: &str) -> OutputLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return OutputLine::Blank;
    }
    if let Some(payload) = trimmed.strip_prefix(PROGRESS_MARKER) {
        return match serde_json::from_str::<Map<String, Value>>(payload) {
            Ok(map) => OutputLine::Progress(RawStatus::from(map)),
            Err(e) => {
                debug!(error = %e, "unparseable progress line");
                OutputLine::Log(EngineLogLevel::Debug, trimmed.to_string())
            }
        };
    }
    if let Some(message) = trimmed.strip_prefix("ERROR:") {
        return OutputLine::Log(EngineLogLevel::Error, message.trim().to_string());
    }
    if let Some(message) = trimmed.strip_prefix("WARNING:") {
        return OutputLine::Log(EngineLogLevel::Warning, message.trim().to_string());
    }
    OutputLine::Log(EngineLogLevel::Debug, trimmed.to_string())
}

/// Forwards every line of `stream` to the reporter; returns the last error line.
async fn pump_lines<R>(stream: R, reporter: EngineReporter) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut last_error = None;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match classify_line(&line) {
                OutputLine::Progress(raw) => reporter.progress(raw),
                OutputLine::Log(level, message) => {
                    if level == EngineLogLevel::Error {
                        last_error = Some(message.clone());
                    }
                    reporter.log(level, message);
                }
                OutputLine::Blank => {}
            },
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "engine output stream closed with error");
                break;
            }
        }
    }
    last_error
}

#[async_trait]
impl RetrievalEngine for YtDlpEngine {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    #[instrument(skip(self, options, reporter, cancel), fields(program = %self.program.display()))]
    async fn download(
        &self,
        url: &str,
        options: &EngineOptions,
        reporter: EngineReporter,
        cancel: &CancelFlag,
    ) -> Result<(), EngineError> {
        let args = Self::build_args(url, options);
        debug!(arg_count = args.len(), "spawning engine");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::spawn(&self.program, source))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::io(url, std::io::Error::other("stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::io(url, std::io::Error::other("stderr not captured")))?;

        let stdout_task = tokio::spawn(pump_lines(stdout, reporter.clone()));
        let stderr_task = tokio::spawn(pump_lines(stderr, reporter));

        let mut poll = tokio::time::interval(CANCEL_POLL_INTERVAL);
        let status = loop {
            tokio::select! {
                status = child.wait() => break status.map_err(|e| EngineError::io(url, e))?,
                _ = poll.tick() => {
                    if cancel.is_cancelled() {
                        warn!(url, "cancelling in-flight download");
                        if let Err(e) = child.kill().await {
                            debug!(error = %e, "engine process already gone");
                        }
                        stdout_task.abort();
                        stderr_task.abort();
                        return Err(EngineError::cancelled(url));
                    }
                }
            }
        };

        let stdout_error = stdout_task.await.unwrap_or_default();
        let stderr_error = stderr_task.await.unwrap_or_default();

        if status.success() {
            debug!(url, "engine finished");
            return Ok(());
        }

        let message = stderr_error
            .or(stdout_error)
            .unwrap_or_else(|| NO_ERROR_MESSAGE.to_string());
        Err(EngineError::exit_status(url, status.code(), message))
    }
}
