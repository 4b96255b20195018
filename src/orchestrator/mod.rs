//! Batch execution, job lifecycle and result aggregation.
//!
//! The [`DownloadOrchestrator`] takes an ordered list of requests and drives
//! each one through a [`RetrievalEngine`], one at a time or through a bounded
//! pool of workers.
//!
//! # Concurrency Model
//!
//! - Each job runs in its own Tokio task
//! - A semaphore permit is acquired, in queue order, before a job starts
//! - The cancellation flag is checked after each permit is acquired
//! - With one worker the next job starts only after the previous one emitted
//!   its final event, so jobs run strictly in order
//!
//! # Failure Isolation
//!
//! An engine error, an invalid option override or a panic inside a job is
//! recorded on that job alone. The batch always runs to the end and reports a
//! [`BatchResult`].

mod config;
mod error;
mod forwarder;
mod job;
mod result;

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::engine::{CancelFlag, EngineError, EngineReporter, RetrievalEngine};
use crate::queue::{DownloadRequest, QueuePlan};
use crate::sink::{BatchEvent, EventSink, Severity};

pub use config::{
    DEFAULT_FORMAT_SELECTOR, DEFAULT_MERGE_FORMAT, DEFAULT_OUTPUT_PATTERN, OptionsTemplate,
    OrchestratorConfig,
};
pub use error::ConfigurationError;
pub use job::{DownloadJob, JobStatus};
pub use result::{BatchResult, JobFailure};

use forwarder::Forwarder;

/// Default number of workers: strictly sequential.
pub const DEFAULT_WORKERS: usize = 1;

/// Minimum number of workers.
pub const MIN_WORKERS: usize = 1;

/// Maximum number of workers.
pub const MAX_WORKERS: usize = 16;

/// Message recorded for a job whose task panicked.
const PANICKED_MESSAGE: &str = "job task panicked";

/// Runs batches of downloads through one engine.
pub struct DownloadOrchestrator {
    engine: Arc<dyn RetrievalEngine>,
    config: OrchestratorConfig,
    cancel: CancelFlag,
}

impl std::fmt::Debug for DownloadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadOrchestrator")
            .field("engine", &self.engine.name())
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl DownloadOrchestrator {
    /// Creates an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidWorkers`] if the pool size is
    /// outside `1..=16`.
    #[instrument(level = "debug", skip(engine), fields(engine = engine.name()))]
    pub fn new(
        engine: Arc<dyn RetrievalEngine>,
        config: OrchestratorConfig,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        debug!(
            workers = config.workers,
            output_dir = ?config.output_dir,
            "creating download orchestrator"
        );
        Ok(Self {
            engine,
            config,
            cancel: CancelFlag::new(),
        })
    }

    /// Uses an externally owned cancellation flag.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the flag that cancels running batches.
    #[must_use]
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs every request and reports the outcome.
    ///
    /// Per-job failures never make this fail; they are recorded in the
    /// returned [`BatchResult`] and emitted to `sink` at error severity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::EmptyBatch`] for an empty list, or
    /// [`ConfigurationError::MissingOutputDir`] if some request has no target
    /// directory and none is configured. Nothing is downloaded in either case.
    pub async fn run(
        &self,
        requests: Vec<DownloadRequest>,
        sink: Arc<dyn EventSink>,
    ) -> Result<BatchResult, ConfigurationError> {
        self.run_batch(requests, 0, sink).await
    }

    /// Runs a queue plan, carrying its duplicate count into the result.
    ///
    /// # Errors
    ///
    /// Same as [`DownloadOrchestrator::run`].
    pub async fn run_plan(
        &self,
        plan: QueuePlan,
        sink: Arc<dyn EventSink>,
    ) -> Result<BatchResult, ConfigurationError> {
        let duplicates = plan.duplicates_dropped();
        self.run_batch(plan.requests, duplicates, sink).await
    }

    #[instrument(
        skip(self, requests, sink),
        fields(jobs = requests.len(), workers = self.config.workers, engine = self.engine.name())
    )]
    async fn run_batch(
        &self,
        requests: Vec<DownloadRequest>,
        duplicates_dropped: usize,
        sink: Arc<dyn EventSink>,
    ) -> Result<BatchResult, ConfigurationError> {
        if requests.is_empty() {
            return Err(ConfigurationError::EmptyBatch);
        }

        let prepared = self.prepare(requests)?;
        let total = prepared.len();
        info!(total, duplicates_dropped, "starting batch");

        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let mut jobs: Vec<DownloadJob> = Vec::with_capacity(total);
        let mut handles: Vec<(usize, JoinHandle<DownloadJob>)> = Vec::with_capacity(total);

        for (job, target_dir) in prepared {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                warn!(job = job.index(), "worker pool closed; skipping job");
                jobs.push(job);
                continue;
            };

            if self.cancel.is_cancelled() {
                debug!(job = job.index(), url = %job.url(), "batch cancelled; skipping job");
                jobs.push(job);
                continue;
            }

            let task = JobTask {
                engine: Arc::clone(&self.engine),
                options: self.config.options.clone(),
                sink: Arc::clone(&sink),
                cancel: self.cancel.clone(),
                target_dir,
                total,
            };
            let slot = jobs.len();
            jobs.push(job.clone());
            handles.push((
                slot,
                tokio::spawn(async move {
                    let _permit = permit;
                    task.run_isolated(job).await
                }),
            ));
        }

        debug!(task_count = handles.len(), "waiting for jobs to complete");

        for (slot, handle) in handles {
            match handle.await {
                Ok(finished) => jobs[slot] = finished,
                Err(e) => {
                    let job = &mut jobs[slot];
                    warn!(job = job.index(), url = %job.url(), error = %e, "job task did not complete");
                    job.fail(PANICKED_MESSAGE);
                    sink.emit(
                        &BatchEvent::Failed {
                            index: job.index(),
                            url: job.url().to_string(),
                            message: PANICKED_MESSAGE.to_string(),
                        },
                        Severity::Error,
                    );
                }
            }
        }

        let result = BatchResult::from_jobs(&jobs).with_duplicates_dropped(duplicates_dropped);
        info!(
            total = result.total,
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            "batch complete"
        );

        sink.emit(&BatchEvent::ProgressReset, Severity::Progress);
        sink.emit(&BatchEvent::BatchComplete(result.clone()), Severity::Info);
        Ok(result)
    }

    /// Assigns indices and resolves every job's directory up front.
    fn prepare(
        &self,
        requests: Vec<DownloadRequest>,
    ) -> Result<Vec<(DownloadJob, PathBuf)>, ConfigurationError> {
        requests
            .into_iter()
            .enumerate()
            .map(|(position, request)| {
                let target_dir = request
                    .target_dir()
                    .map(Path::to_path_buf)
                    .or_else(|| self.config.output_dir.clone())
                    .ok_or_else(|| ConfigurationError::missing_output_dir(request.url()))?;
                Ok((DownloadJob::new(request, position + 1), target_dir))
            })
            .collect()
    }
}

/// What a spawned job needs, detached from the orchestrator's lifetime.
struct JobTask {
    engine: Arc<dyn RetrievalEngine>,
    options: OptionsTemplate,
    sink: Arc<dyn EventSink>,
    cancel: CancelFlag,
    target_dir: PathBuf,
    total: usize,
}

impl JobTask {
    /// Runs the job, recording a panic as that job's failure.
    ///
    /// The failure is emitted while the worker permit is still held, so with
    /// one worker it precedes the next job's events.
    async fn run_isolated(self, job: DownloadJob) -> DownloadJob {
        let mut fallback = job.clone();
        let sink = Arc::clone(&self.sink);
        match AssertUnwindSafe(self.run(job)).catch_unwind().await {
            Ok(finished) => finished,
            Err(_) => {
                warn!(job = fallback.index(), url = %fallback.url(), "job task panicked");
                fallback.fail(PANICKED_MESSAGE);
                sink.emit(
                    &BatchEvent::Failed {
                        index: fallback.index(),
                        url: fallback.url().to_string(),
                        message: PANICKED_MESSAGE.to_string(),
                    },
                    Severity::Error,
                );
                fallback
            }
        }
    }

    #[instrument(skip(self, job), fields(job = job.index(), url = %job.url()))]
    async fn run(self, mut job: DownloadJob) -> DownloadJob {
        job.start();
        self.sink.emit(
            &BatchEvent::Started {
                index: job.index(),
                total: self.total,
                url: job.url().to_string(),
            },
            Severity::Info,
        );

        match self.download(&job).await {
            Ok(()) => {
                job.succeed();
                info!("download completed");
                self.sink.emit(
                    &BatchEvent::Finished {
                        index: job.index(),
                        url: job.url().to_string(),
                    },
                    Severity::Info,
                );
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, cancelled = e.is_cancelled(), "download failed");
                job.fail(message.clone());
                self.sink.emit(
                    &BatchEvent::Failed {
                        index: job.index(),
                        url: job.url().to_string(),
                        message,
                    },
                    Severity::Error,
                );
            }
        }
        job
    }

    async fn download(&self, job: &DownloadJob) -> Result<(), EngineError> {
        let mut options = self.options.options_for(&self.target_dir);
        options.apply_overrides(job.request().options_override(), &self.target_dir)?;

        let (reporter, events) = EngineReporter::channel();
        let forwarder = Forwarder::spawn(job.index(), events, Arc::clone(&self.sink));
        let outcome = self
            .engine
            .download(job.url(), &options, reporter, &self.cancel)
            .await;
        let mut translator = forwarder.finish().await;

        if outcome.is_ok() {
            self.sink.emit(
                &BatchEvent::Progress {
                    index: job.index(),
                    progress: translator.finish(),
                },
                Severity::Progress,
            );
        }
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::engine::{EngineOptions, RawStatus};
    use crate::sink::MemorySink;

    /// Succeeds for every URL except those containing `fail` or `panic`.
    #[derive(Default)]
    struct StubEngine {
        seen: Mutex<Vec<(String, EngineOptions)>>,
    }

    #[async_trait]
    impl RetrievalEngine for StubEngine {
        fn name(&self) -> &str {
            "stub"
        }

        async fn download(
            &self,
            url: &str,
            options: &EngineOptions,
            reporter: EngineReporter,
            _cancel: &CancelFlag,
        ) -> Result<(), EngineError> {
            self.seen
                .lock()
                .unwrap()
                .push((url.to_string(), options.clone()));
            assert!(!url.contains("panic"), "engine blew up");
            reporter.progress(
                RawStatus::new()
                    .with("status", "downloading")
                    .with("_percent_str", "50.0%"),
            );
            if url.contains("fail") {
                return Err(EngineError::failed(url, "Video unavailable"));
            }
            Ok(())
        }
    }

    fn orchestrator(engine: Arc<StubEngine>) -> DownloadOrchestrator {
        DownloadOrchestrator::new(engine, OrchestratorConfig::new().output_dir("/tmp/out")).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_workers() {
        let engine: Arc<dyn RetrievalEngine> = Arc::new(StubEngine::default());
        let err = DownloadOrchestrator::new(engine, OrchestratorConfig::new().workers(0))
            .unwrap_err();
        assert_eq!(err, ConfigurationError::InvalidWorkers { value: 0 });
    }

    #[tokio::test]
    async fn test_run_rejects_empty_batch() {
        let engine = Arc::new(StubEngine::default());
        let sink = Arc::new(MemorySink::new());
        let err = orchestrator(Arc::clone(&engine))
            .run(Vec::new(), sink.clone())
            .await
            .unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyBatch);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_missing_output_dir_fails_before_any_download() {
        let engine = Arc::new(StubEngine::default());
        let orchestrator =
            DownloadOrchestrator::new(engine.clone(), OrchestratorConfig::new()).unwrap();
        let sink = Arc::new(MemorySink::new());
        let requests = vec![
            DownloadRequest::new("http://x/1").with_target_dir("/tmp/a"),
            DownloadRequest::new("http://x/2"),
        ];
        let err = orchestrator.run(requests, sink.clone()).await.unwrap_err();
        assert_eq!(err, ConfigurationError::missing_output_dir("http://x/2"));
        assert!(engine.seen.lock().unwrap().is_empty());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_request_target_dir_overrides_output_dir() {
        let engine = Arc::new(StubEngine::default());
        let sink = Arc::new(MemorySink::new());
        orchestrator(Arc::clone(&engine))
            .run(
                vec![DownloadRequest::new("http://x/1").with_target_dir("/srv/own")],
                sink,
            )
            .await
            .unwrap();
        let seen = engine.seen.lock().unwrap();
        assert!(
            Path::new(&seen[0].1.output_template).starts_with("/srv/own"),
            "template {}",
            seen[0].1.output_template
        );
    }

    #[tokio::test]
    async fn test_invalid_override_fails_only_that_job() {
        let engine = Arc::new(StubEngine::default());
        let sink = Arc::new(MemorySink::new());
        let mut bad = BTreeMap::new();
        bad.insert("ignoreRecoverableErrors".to_string(), json!("yes"));
        let requests = vec![
            DownloadRequest::new("http://x/1").with_overrides(bad),
            DownloadRequest::new("http://x/2"),
        ];
        let result = orchestrator(Arc::clone(&engine))
            .run(requests, sink)
            .await
            .unwrap();
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].url, "http://x/1");
        assert_eq!(engine.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_job_is_isolated() {
        let engine = Arc::new(StubEngine::default());
        let sink = Arc::new(MemorySink::new());
        let requests = vec![
            DownloadRequest::new("http://x/panic"),
            DownloadRequest::new("http://x/2"),
            DownloadRequest::new("http://x/3"),
        ];
        let result = orchestrator(Arc::clone(&engine))
            .run(requests, sink.clone())
            .await
            .unwrap();
        assert_eq!(result.total, 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].message, PANICKED_MESSAGE);
        assert!(sink.events().iter().any(|(event, severity)| matches!(
            event,
            BatchEvent::Failed { index: 1, .. }
        ) && *severity == Severity::Error));
    }

    #[tokio::test]
    async fn test_panicked_job_failure_precedes_next_job() {
        let engine = Arc::new(StubEngine::default());
        let sink = Arc::new(MemorySink::new());
        let requests = vec![
            DownloadRequest::new("http://x/panic"),
            DownloadRequest::new("http://x/2"),
            DownloadRequest::new("http://x/3"),
        ];
        orchestrator(engine).run(requests, sink.clone()).await.unwrap();

        let lifecycle: Vec<String> = sink
            .events()
            .into_iter()
            .filter_map(|(event, _)| match event {
                BatchEvent::Started { index, .. } => Some(format!("S{index}")),
                BatchEvent::Finished { index, .. } => Some(format!("F{index}")),
                BatchEvent::Failed { index, .. } => Some(format!("X{index}")),
                _ => None,
            })
            .collect();
        assert_eq!(lifecycle, ["S1", "X1", "S2", "F2", "S3", "F3"]);
    }

    #[tokio::test]
    async fn test_successful_job_ends_with_finished_progress() {
        let engine = Arc::new(StubEngine::default());
        let sink = Arc::new(MemorySink::new());
        orchestrator(engine)
            .run(vec![DownloadRequest::new("http://x/1")], sink.clone())
            .await
            .unwrap();

        let events: Vec<_> = sink.events().into_iter().map(|(e, _)| e).collect();
        assert!(matches!(events[0], BatchEvent::Started { index: 1, total: 1, .. }));
        assert!(matches!(events[1], BatchEvent::Progress { .. }));
        match &events[2] {
            BatchEvent::Progress { progress, .. } => {
                assert_eq!(progress.phase, crate::progress::Phase::Finished);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(events[3], BatchEvent::Finished { index: 1, .. }));
        assert_eq!(events[4], BatchEvent::ProgressReset);
        assert!(matches!(events[5], BatchEvent::BatchComplete(_)));
        assert_eq!(events.len(), 6);
    }

    #[tokio::test]
    async fn test_cancelled_batch_skips_remaining_jobs() {
        let engine = Arc::new(StubEngine::default());
        let sink = Arc::new(MemorySink::new());
        let orchestrator = orchestrator(Arc::clone(&engine));
        orchestrator.cancel_flag().cancel();
        let result = orchestrator
            .run(
                vec![
                    DownloadRequest::new("http://x/1"),
                    DownloadRequest::new("http://x/2"),
                ],
                sink,
            )
            .await
            .unwrap();
        assert_eq!(result.skipped, 2);
        assert_eq!(result.total, 2);
        assert!(engine.seen.lock().unwrap().is_empty());
    }
}
