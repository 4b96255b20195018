//! CLI entry point for the mediabatch tool.

use std::process::ExitCode;

mod app;
mod app_config;
mod cli;
mod output;

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every job succeeded.
    Success,
    /// Some jobs succeeded and some failed.
    Partial,
    /// Every job failed, or the batch was rejected before it started.
    Failure,
    /// Ctrl-C stopped the batch.
    Interrupted,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Partial => 1,
            Self::Failure => 2,
            Self::Interrupted => 130,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::runtime::run_mediabatch().await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(ProcessExit::Failure.code())
        }
    }
}
