//! Consumers of structured batch events.
//!
//! The orchestrator never touches presentation state. It hands every
//! lifecycle, progress and log event to an injected [`EventSink`] together
//! with a [`Severity`]. Sinks must never fail back into the orchestrator: one
//! that cannot display or store an event drops it.
//!
//! Sinks are shared between concurrent jobs, so implementations are
//! `Send + Sync` and serialize access internally where they need to.

mod channel;
mod memory;
mod tracing_sink;
mod writer;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::engine::EngineLogLevel;
use crate::orchestrator::BatchResult;
use crate::progress::ProgressEvent;

pub use channel::ChannelSink;
pub use memory::MemorySink;
pub use tracing_sink::TracingSink;
pub use writer::{SinkError, WriterSink};

/// How prominently an event should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Regular lifecycle information.
    Info,
    /// Transient progress updates; a presenter may overwrite the previous one.
    Progress,
    /// Failures.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Progress => "progress",
            Self::Error => "error",
        };
        write!(f, "{label}")
    }
}

/// Everything the orchestrator reports while a batch runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    /// A job is about to invoke the engine.
    Started {
        /// 1-based job index.
        index: usize,
        /// Number of jobs in the batch.
        total: usize,
        /// The job's URL.
        url: String,
    },
    /// Normalized progress for a running job.
    Progress {
        /// 1-based job index.
        index: usize,
        /// The translated progress record.
        progress: ProgressEvent,
    },
    /// A job succeeded.
    Finished {
        /// 1-based job index.
        index: usize,
        /// The job's URL.
        url: String,
    },
    /// A job failed; the batch continues.
    Failed {
        /// 1-based job index.
        index: usize,
        /// The job's URL.
        url: String,
        /// Human-readable failure.
        message: String,
    },
    /// A log record the engine produced while running a job.
    Log {
        /// 1-based job index.
        index: usize,
        /// Engine-side severity.
        level: EngineLogLevel,
        /// Record text.
        message: String,
    },
    /// The shared progress indicator goes back to 0.
    ProgressReset,
    /// The batch is over.
    BatchComplete(BatchResult),
}

impl BatchEvent {
    /// Returns the 1-based job index for job-scoped events.
    #[must_use]
    pub fn job_index(&self) -> Option<usize> {
        match self {
            Self::Started { index, .. }
            | Self::Progress { index, .. }
            | Self::Finished { index, .. }
            | Self::Failed { index, .. }
            | Self::Log { index, .. } => Some(*index),
            Self::ProgressReset | Self::BatchComplete(_) => None,
        }
    }
}

impl fmt::Display for BatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started { index, total, url } => {
                write!(f, "[{index}/{total}] Downloading: {url}")
            }
            Self::Progress { progress, .. } => write!(f, "{progress}"),
            Self::Finished { url, .. } => write!(f, "Finished: {url}"),
            Self::Failed { url, message, .. } => write!(f, "Error downloading {url}: {message}"),
            Self::Log {
                level: EngineLogLevel::Debug,
                message,
                ..
            } => write!(f, "{message}"),
            Self::Log {
                level: EngineLogLevel::Warning,
                message,
                ..
            } => write!(f, "Warning: {message}"),
            Self::Log {
                level: EngineLogLevel::Error,
                message,
                ..
            } => write!(f, "Error: {message}"),
            Self::ProgressReset => write!(f, "Progress reset"),
            Self::BatchComplete(result) => write!(
                f,
                "All downloads complete: {} succeeded, {} failed, {} skipped",
                result.succeeded, result.failed, result.skipped
            ),
        }
    }
}

/// A destination for batch events.
pub trait EventSink: Send + Sync {
    /// Accepts one event. Must not panic or block for long, and has no
    /// failure mode visible to the caller.
    fn emit(&self, event: &BatchEvent, severity: Severity);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: &BatchEvent, severity: Severity) {
        (**self).emit(event, severity);
    }
}

/// Broadcasts every event to several sinks, in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    /// Creates an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a downstream sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the number of downstream sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if there are no downstream sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &BatchEvent, severity: Severity) {
        for sink in &self.sinks {
            sink.emit(event, severity);
        }
    }
}
