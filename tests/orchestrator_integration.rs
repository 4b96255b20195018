//! Integration tests for batch orchestration.
//!
//! These tests drive the orchestrator end to end against a scripted engine.

mod support;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mediabatch_core::{
    BatchEvent, ChannelSink, ConfigurationError, DownloadOrchestrator, DownloadRequest,
    EngineLogLevel, EventSink, JobFailure, MemorySink, OrchestratorConfig, Phase, RetrievalEngine,
    Severity, UrlQueueBuilder,
};
use support::{ScriptedEngine, Step, job_events, job_percents};
use tempfile::TempDir;

fn orchestrator(engine: &Arc<ScriptedEngine>, dir: &Path, workers: usize) -> DownloadOrchestrator {
    let config = OrchestratorConfig::new().output_dir(dir).workers(workers);
    let engine: Arc<dyn RetrievalEngine> = engine.clone();
    DownloadOrchestrator::new(engine, config).expect("valid config")
}

fn requests(urls: &[&str]) -> Vec<DownloadRequest> {
    urls.iter().map(|url| DownloadRequest::new(*url)).collect()
}

// ==================== End-to-end ====================

#[tokio::test]
async fn test_duplicate_input_with_one_failure() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let engine = Arc::new(ScriptedEngine::new().fail("http://x/2", "Video unavailable"));
    let sink = Arc::new(MemorySink::new());

    let plan = UrlQueueBuilder::new()
        .plan(["http://x/1", "http://x/1", "http://x/2"])
        .expect("queue should build");
    let result = orchestrator(&engine, temp_dir.path(), 1)
        .run_plan(plan, sink.clone())
        .await
        .expect("batch should run");

    assert_eq!(result.total, 2);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.skipped, 0);
    assert_eq!(result.duplicates_dropped, 1);
    assert_eq!(
        result.errors,
        vec![JobFailure {
            url: "http://x/2".to_string(),
            message: "Video unavailable".to_string(),
        }]
    );
    assert_eq!(engine.called_urls(), vec!["http://x/1", "http://x/2"]);

    let events = sink.events();
    let failed: Vec<_> = events
        .iter()
        .filter(|(event, _)| matches!(event, BatchEvent::Failed { .. }))
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].1, Severity::Error);
}

#[tokio::test]
async fn test_batch_ends_with_reset_then_complete() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let engine = Arc::new(ScriptedEngine::new());
    let sink = Arc::new(MemorySink::new());

    let result = orchestrator(&engine, temp_dir.path(), 1)
        .run(requests(&["http://x/1", "http://x/2"]), sink.clone())
        .await
        .expect("batch should run");

    let events = sink.events();
    let n = events.len();
    assert!(n >= 2);
    assert_eq!(events[n - 2].0, BatchEvent::ProgressReset);
    assert_eq!(events[n - 1].0, BatchEvent::BatchComplete(result.clone()));
    assert_eq!(result.succeeded, 2);
}

// ==================== Failure isolation ====================

#[tokio::test]
async fn test_failing_job_does_not_stop_later_jobs() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let engine = Arc::new(ScriptedEngine::new().fail("http://x/2", "HTTP Error 403: Forbidden"));
    let sink = Arc::new(MemorySink::new());
    let urls = ["http://x/1", "http://x/2", "http://x/3", "http://x/4", "http://x/5"];

    let result = orchestrator(&engine, temp_dir.path(), 1)
        .run(requests(&urls), sink.clone())
        .await
        .expect("batch should run");

    assert_eq!(result.total, 5);
    assert_eq!(result.succeeded, 4);
    assert_eq!(result.failed, 1);
    assert_eq!(engine.called_urls(), urls.to_vec());

    let job_two = job_events(&sink.events(), 2);
    assert!(matches!(
        job_two.last(),
        Some(BatchEvent::Failed { message, .. }) if message == "HTTP Error 403: Forbidden"
    ));
}

#[tokio::test]
async fn test_every_job_failing_still_completes_batch() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let engine = Arc::new(
        ScriptedEngine::new()
            .fail("http://x/1", "a")
            .fail("http://x/2", "b"),
    );
    let sink = Arc::new(MemorySink::new());

    let result = orchestrator(&engine, temp_dir.path(), 1)
        .run(requests(&["http://x/1", "http://x/2"]), sink.clone())
        .await
        .expect("batch should run");

    assert!(result.all_failed());
    assert_eq!(
        result.failed_urls().collect::<Vec<_>>(),
        vec!["http://x/1", "http://x/2"]
    );
}

// ==================== Ordering and progress ====================

#[tokio::test]
async fn test_single_worker_runs_jobs_strictly_in_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let engine = Arc::new(ScriptedEngine::new().delay(Duration::from_millis(10)));
    let sink = Arc::new(MemorySink::new());

    orchestrator(&engine, temp_dir.path(), 1)
        .run(requests(&["http://x/1", "http://x/2", "http://x/3"]), sink.clone())
        .await
        .expect("batch should run");

    let order: Vec<usize> = sink
        .events()
        .iter()
        .filter_map(|(event, _)| event.job_index())
        .collect();
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(order, sorted, "job events must not interleave");
    assert_eq!(engine.max_active(), 1);
}

#[tokio::test]
async fn test_job_event_stream_shape() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let engine = Arc::new(ScriptedEngine::new());
    let sink = Arc::new(MemorySink::new());

    orchestrator(&engine, temp_dir.path(), 1)
        .run(requests(&["http://x/1", "http://x/2"]), sink.clone())
        .await
        .expect("batch should run");

    let job = job_events(&sink.events(), 2);
    assert!(matches!(
        &job[0],
        BatchEvent::Started { index: 2, total: 2, url } if url == "http://x/2"
    ));
    let phases: Vec<Phase> = job
        .iter()
        .filter_map(|event| match event {
            BatchEvent::Progress { progress, .. } => Some(progress.phase),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![Phase::Downloading, Phase::Merging, Phase::Finished]
    );
    assert!(matches!(job.last(), Some(BatchEvent::Finished { index: 2, .. })));
}

#[tokio::test]
async fn test_percent_is_monotonic_within_job_and_resets_between_jobs() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let engine = Arc::new(
        ScriptedEngine::new()
            .steps(
                "http://x/1",
                vec![
                    Step::Percent(" 10.0%"),
                    Step::Percent(" 60.0%"),
                    Step::Percent(" 30.0%"),
                    Step::Percent("garbage"),
                    Step::Finished,
                ],
            )
            .steps("http://x/2", vec![Step::Percent("\u{1b}[0;94m  5.0%\u{1b}[0m")]),
    );
    let sink = Arc::new(MemorySink::new());

    orchestrator(&engine, temp_dir.path(), 1)
        .run(requests(&["http://x/1", "http://x/2"]), sink.clone())
        .await
        .expect("batch should run");

    let events = sink.events();
    let first = job_percents(&events, 1);
    assert_eq!(first, vec![10.0, 60.0, 60.0, 60.0, 100.0, 100.0]);

    let second = job_percents(&events, 2);
    assert_eq!(second, vec![5.0, 100.0]);
}

#[tokio::test]
async fn test_malformed_percent_reads_as_zero() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let engine = Arc::new(ScriptedEngine::new().steps("http://x/1", vec![Step::Percent("N/A")]));
    let sink = Arc::new(MemorySink::new());

    orchestrator(&engine, temp_dir.path(), 1)
        .run(requests(&["http://x/1"]), sink.clone())
        .await
        .expect("batch should run");

    assert_eq!(job_percents(&sink.events(), 1), vec![0.0, 100.0]);
}

#[tokio::test]
async fn test_engine_logs_reach_sink_with_mapped_severity() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let engine = Arc::new(ScriptedEngine::new().steps(
        "http://x/1",
        vec![
            Step::Log(EngineLogLevel::Debug, "[youtube] abc: Downloading webpage"),
            Step::Log(EngineLogLevel::Warning, "falling back to generic extractor"),
        ],
    ));
    let sink = Arc::new(MemorySink::new());

    orchestrator(&engine, temp_dir.path(), 1)
        .run(requests(&["http://x/1"]), sink.clone())
        .await
        .expect("batch should run");

    let logs: Vec<_> = sink
        .events()
        .into_iter()
        .filter(|(event, _)| matches!(event, BatchEvent::Log { .. }))
        .map(|(_, severity)| severity)
        .collect();
    assert_eq!(logs, vec![Severity::Info, Severity::Error]);
}

// ==================== Worker pool ====================

#[tokio::test]
async fn test_worker_pool_bounds_concurrency() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let engine = Arc::new(ScriptedEngine::new().delay(Duration::from_millis(50)));
    let sink = Arc::new(MemorySink::new());
    let urls: Vec<String> = (1..=6).map(|i| format!("http://x/{i}")).collect();
    let requests: Vec<_> = urls.iter().map(DownloadRequest::new).collect();

    let result = orchestrator(&engine, temp_dir.path(), 3)
        .run(requests, sink.clone())
        .await
        .expect("batch should run");

    assert_eq!(result.succeeded, 6);
    assert!(engine.max_active() <= 3, "max active {}", engine.max_active());
    assert!(engine.max_active() > 1, "pool should overlap jobs");

    // Each job's own stream stays ordered.
    let events = sink.events();
    for index in 1..=6 {
        let job = job_events(&events, index);
        assert!(matches!(job.first(), Some(BatchEvent::Started { .. })));
        assert!(matches!(job.last(), Some(BatchEvent::Finished { .. })));
    }
}

// ==================== Cancellation ====================

#[tokio::test]
async fn test_cancellation_skips_jobs_not_started() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let engine = Arc::new(ScriptedEngine::new().steps("http://x/1", vec![Step::Cancel]));
    let sink = Arc::new(MemorySink::new());

    let orchestrator = orchestrator(&engine, temp_dir.path(), 1);
    let result = orchestrator
        .run(requests(&["http://x/1", "http://x/2", "http://x/3"]), sink.clone())
        .await
        .expect("batch should run");

    assert!(orchestrator.cancel_flag().is_cancelled());
    assert_eq!(result.total, 3);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.skipped, 2);
    assert_eq!(result.total, result.succeeded + result.failed + result.skipped);
    assert_eq!(engine.called_urls(), vec!["http://x/1"]);
    assert!(job_events(&sink.events(), 2).is_empty());
}

// ==================== Configuration ====================

#[tokio::test]
async fn test_missing_output_dir_rejects_batch() {
    let engine = Arc::new(ScriptedEngine::new());
    let dyn_engine: Arc<dyn RetrievalEngine> = engine.clone();
    let orchestrator = DownloadOrchestrator::new(dyn_engine, OrchestratorConfig::new())
        .expect("valid config");
    let sink = Arc::new(MemorySink::new());

    let err = orchestrator
        .run(requests(&["http://x/1"]), sink.clone())
        .await
        .expect_err("batch should be rejected");

    assert!(matches!(err, ConfigurationError::MissingOutputDir { .. }));
    assert!(engine.called_urls().is_empty());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_options_template_reaches_engine() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let engine = Arc::new(ScriptedEngine::new());
    let sink = Arc::new(MemorySink::new());

    let plan = UrlQueueBuilder::new()
        .option_override("mergeFormat", "mkv")
        .plan(["http://x/1"])
        .expect("queue should build");
    orchestrator(&engine, temp_dir.path(), 1)
        .run_plan(plan, sink)
        .await
        .expect("batch should run");

    let options = engine.options_for("http://x/1").expect("engine was called");
    assert_eq!(options.merge_format, "mkv");
    assert!(options.ignore_recoverable_errors);
    assert!(Path::new(&options.output_template).starts_with(temp_dir.path()));
    assert!(options.output_template.ends_with("%(title)s.%(ext)s"));
}

#[tokio::test]
async fn test_channel_sink_receives_batch_stream() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let engine = Arc::new(ScriptedEngine::new());
    let (sink, mut rx) = ChannelSink::new();
    let sink: Arc<dyn EventSink> = Arc::new(sink);

    orchestrator(&engine, temp_dir.path(), 1)
        .run(requests(&["http://x/1"]), sink)
        .await
        .expect("batch should run");

    let mut last = None;
    while let Ok((event, _)) = rx.try_recv() {
        last = Some(event);
    }
    assert!(matches!(last, Some(BatchEvent::BatchComplete(result)) if result.succeeded == 1));
}
