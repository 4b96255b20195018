//! Assembly of input text from URL arguments, an input file, or stdin.

use std::fs;
use std::io::{self, IsTerminal, Read};

use anyhow::{Context, Result};

use crate::app::validation;
use crate::cli::Cli;

/// Raw input for the queue builder.
#[derive(Debug, Default)]
pub(crate) struct InputText {
    /// Newline-separated input, if any source produced some.
    pub(crate) text: Option<String>,
    /// Stdin was piped but held only whitespace.
    pub(crate) piped_stdin_was_empty: bool,
}

/// Reads input from positional URLs, `--input`, or piped stdin, in that
/// order. Stdin is only read when neither of the others was given.
pub(crate) fn process_input(args: &Cli) -> Result<InputText> {
    validation::reject_mixed_url_sources(&args.urls, args.input.as_deref())?;

    if !args.urls.is_empty() {
        return Ok(InputText {
            text: Some(args.urls.join("\n")),
            piped_stdin_was_empty: false,
        });
    }

    if let Some(path) = &args.input {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file '{}'", path.display()))?;
        return Ok(InputText {
            text: Some(text),
            piped_stdin_was_empty: false,
        });
    }

    if io::stdin().is_terminal() {
        return Ok(InputText::default());
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read URLs from stdin")?;
    if buffer.trim().is_empty() {
        return Ok(InputText {
            text: None,
            piped_stdin_was_empty: true,
        });
    }
    Ok(InputText {
        text: Some(buffer),
        piped_stdin_was_empty: false,
    })
}
