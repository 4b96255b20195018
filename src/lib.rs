//! Mediabatch Core Library
//!
//! This library drives batches of media downloads through an external
//! retrieval engine, translating the engine's raw progress notifications into
//! normalized events and isolating per-item failures so a bad URL never
//! aborts the rest of the batch.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`queue`] - Input normalization into an ordered, deduplicated queue
//! - [`orchestrator`] - Batch execution, job lifecycle and result aggregation
//! - [`progress`] - Translation of raw engine progress into [`ProgressEvent`]s
//! - [`sink`] - The [`EventSink`] abstraction and stock sink implementations
//! - [`engine`] - The [`RetrievalEngine`] capability, its options, and the
//!   `yt-dlp` adapter

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod orchestrator;
pub mod progress;
pub mod queue;
pub mod sink;

// Re-export commonly used types
pub use engine::{
    BinaryPathStrategy, CancelFlag, EngineError, EngineLogLevel, EngineOptions, EngineReporter,
    OverwritePolicy, RawStatus, RetrievalEngine, YtDlpEngine, resolve_engine_binary_path,
};
pub use orchestrator::{
    BatchResult, ConfigurationError, DEFAULT_WORKERS, DownloadJob, DownloadOrchestrator,
    JobFailure, JobStatus, MAX_WORKERS, OrchestratorConfig, OptionsTemplate,
};
pub use progress::{Phase, ProgressEvent, ProgressTranslator};
pub use queue::{DownloadRequest, QueuePlan, UrlQueueBuilder, ValidationError};
pub use sink::{
    BatchEvent, ChannelSink, EventSink, FanoutSink, MemorySink, Severity, SinkError, TracingSink,
    WriterSink,
};
