//! CLI output formatting and display helpers.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use mediabatch_core::BatchResult;

/// Message when no input was provided at all.
pub const NO_INPUT_GUIDANCE: &str = "No input provided. Pipe URLs via stdin or pass as arguments.";

/// Message when stdin was piped but empty.
pub const EMPTY_STDIN_GUIDANCE: &str =
    "Received empty stdin input. Pipe URLs, one per line, or pass them as arguments.";

/// Example for piping input.
pub const INPUT_PIPE_EXAMPLE: &str =
    "Example: echo 'https://www.youtube.com/watch?v=ID' | mediabatch -o ~/Videos";

/// Example for passing URLs as arguments.
pub const INPUT_ARG_EXAMPLE: &str = "Example: mediabatch -o ~/Videos https://www.youtube.com/watch?v=ID";

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

/// Returns lines for quick-start guidance (headline + examples), truncated to width.
pub fn quick_start_guidance_lines(empty_stdin: bool, width: usize) -> Vec<String> {
    let headline = if empty_stdin {
        EMPTY_STDIN_GUIDANCE
    } else {
        NO_INPUT_GUIDANCE
    };

    vec![
        truncate_to_width(headline, width),
        truncate_to_width(INPUT_PIPE_EXAMPLE, width),
        truncate_to_width(INPUT_ARG_EXAMPLE, width),
    ]
}

/// Prints quick-start guidance to stdout (no input or empty stdin).
pub fn print_quick_start_guidance(empty_stdin: bool) {
    let width = terminal_width().min(80);
    for line in quick_start_guidance_lines(empty_stdin, width) {
        println!("{line}");
    }
}

/// Builds the human-readable end-of-batch summary.
pub fn completion_summary_lines(result: &BatchResult, width: usize) -> Vec<String> {
    let mut headline = format!(
        "Downloaded {}/{} items",
        result.succeeded, result.total
    );
    if result.failed > 0 {
        let _ = write!(headline, ", {} failed", result.failed);
    }
    if result.skipped > 0 {
        let _ = write!(headline, ", {} skipped", result.skipped);
    }
    if result.duplicates_dropped > 0 {
        let _ = write!(
            headline,
            " ({} duplicate {} ignored)",
            result.duplicates_dropped,
            if result.duplicates_dropped == 1 { "URL" } else { "URLs" }
        );
    }

    let mut lines = vec![headline];
    for failure in &result.errors {
        lines.push(truncate_to_width(
            &format!("  failed: {} ({})", failure.url, failure.message),
            width,
        ));
    }
    lines
}

/// Prints the batch summary, as text or as JSON.
pub fn print_completion_summary(result: &BatchResult, json: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(result).context("Failed to render batch result")?;
        println!("{rendered}");
        return Ok(());
    }
    for line in completion_summary_lines(result, terminal_width()) {
        println!("{line}");
    }
    Ok(())
}

/// Writes failed URLs one per line so they can be fed back as `--input`.
pub fn write_failed_urls(path: &Path, result: &BatchResult) -> Result<()> {
    let mut contents = String::new();
    for url in result.failed_urls() {
        contents.push_str(url);
        contents.push('\n');
    }
    fs::write(path, contents)
        .with_context(|| format!("Failed to write failed URLs to '{}'", path.display()))
}
