//! The retrieval engine capability the orchestrator delegates downloads to.
//!
//! An engine accepts a URL plus an [`EngineOptions`] bag, performs the
//! transfer, and reports what happens through an [`EngineReporter`]. The
//! reporter only enqueues; it never waits on whoever consumes the events, so
//! engines may call it from any thread or task.
//!
//! # Cancellation
//!
//! Engines receive a [`CancelFlag`]. Honoring it is optional: an engine that
//! can abort an in-flight transfer should poll it and return
//! [`EngineError::Cancelled`].

mod binary;
mod error;
mod options;
mod ytdlp;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

pub use binary::{
    BinaryPathStrategy, DEFAULT_HELPER_NAME, bundled_path_for, resolve_engine_binary_path,
};
pub use error::EngineError;
pub use options::{EngineOptions, OverwritePolicy};
pub use ytdlp::{DEFAULT_PROGRAM, YtDlpEngine};

/// A raw, loosely-typed progress notification from the engine.
///
/// Carries a `status` key (`downloading`, `finished`, ...) plus whatever
/// fields the engine attaches (`_percent_str`, `_speed_str`, `_eta_str`,
/// byte counts).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawStatus(Map<String, Value>);

impl RawStatus {
    /// Creates an empty status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the status with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns the `status` kind, if it is a string.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.str_field("status")
    }

    /// Returns a string field.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns a numeric field as `f64`.
    #[must_use]
    pub fn number_field(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }
}

impl From<Map<String, Value>> for RawStatus {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Severity of a log record emitted by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineLogLevel {
    /// Informational chatter.
    Debug,
    /// Something recoverable went wrong.
    Warning,
    /// Something failed.
    Error,
}

impl fmt::Display for EngineLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Debug => "debug",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        write!(f, "{label}")
    }
}

/// One callback invocation from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Raw progress notification.
    Progress(RawStatus),
    /// Engine log record.
    Log {
        /// Record severity.
        level: EngineLogLevel,
        /// Record text.
        message: String,
    },
}

/// The engine's view of the progress and log callbacks.
///
/// Sending never blocks. Events sent after the receiving side has gone away
/// are dropped.
#[derive(Debug, Clone)]
pub struct EngineReporter {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineReporter {
    /// Creates a reporter and the receiver its events arrive on.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Reports a raw progress status.
    pub fn progress(&self, raw: RawStatus) {
        let _ = self.tx.send(EngineEvent::Progress(raw));
    }

    /// Reports an engine log record.
    pub fn log(&self, level: EngineLogLevel, message: impl Into<String>) {
        let _ = self.tx.send(EngineEvent::Log {
            level,
            message: message.into(),
        });
    }
}

/// Cooperative cancellation flag shared between a caller and running jobs.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl From<Arc<AtomicBool>> for CancelFlag {
    fn from(flag: Arc<AtomicBool>) -> Self {
        Self(flag)
    }
}

/// A capability that downloads one URL.
#[async_trait]
pub trait RetrievalEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Downloads `url` with `options`, reporting through `reporter`.
    ///
    /// The reporter is owned by the call; dropping it signals that no more
    /// events will follow.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when this URL could not be retrieved.
    async fn download(
        &self,
        url: &str,
        options: &EngineOptions,
        reporter: EngineReporter,
        cancel: &CancelFlag,
    ) -> Result<(), EngineError>;
}
