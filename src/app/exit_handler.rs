//! Exit code logic for the mediabatch process.
//!
//! Single responsibility: map a batch result to the process exit outcome.

use mediabatch_core::BatchResult;

use crate::ProcessExit;

/// Determines the process exit outcome for a finished batch.
pub(crate) fn determine_exit_outcome(result: &BatchResult, cancelled: bool) -> ProcessExit {
    if cancelled {
        ProcessExit::Interrupted
    } else if result.failed == 0 {
        ProcessExit::Success
    } else if result.succeeded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

/// Determines the exit outcome when no URLs were read.
///
/// Piped input that held no URLs is an empty batch; running without any input
/// only shows guidance.
pub(crate) fn determine_no_input_outcome(piped_stdin_was_empty: bool) -> ProcessExit {
    if piped_stdin_was_empty {
        ProcessExit::Failure
    } else {
        ProcessExit::Success
    }
}
