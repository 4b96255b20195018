//! Shared test doubles for orchestrator integration tests.
//!
//! `ScriptedEngine` plays back canned progress and log events per URL and
//! records what it was asked to do, so tests can assert ordering, options and
//! concurrency without spawning a real engine program.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mediabatch_core::{
    BatchEvent, CancelFlag, EngineError, EngineLogLevel, EngineOptions, EngineReporter, RawStatus,
    RetrievalEngine, Severity,
};

/// One scripted step the engine reports while "downloading".
#[derive(Debug, Clone)]
pub enum Step {
    /// A `downloading` status with the given percent label.
    Percent(&'static str),
    /// A `finished` status.
    Finished,
    /// An engine log record.
    Log(EngineLogLevel, &'static str),
    /// Request cancellation of the whole batch.
    Cancel,
}

#[derive(Debug, Clone)]
struct Script {
    steps: Vec<Step>,
    failure: Option<String>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            steps: vec![Step::Percent(" 50.0%"), Step::Finished],
            failure: None,
        }
    }
}

/// Engine double driven by per-URL scripts.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    scripts: HashMap<String, Script>,
    delay: Duration,
    calls: Mutex<Vec<(String, EngineOptions)>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `url` fail with `message` after its steps.
    pub fn fail(mut self, url: &str, message: &str) -> Self {
        self.scripts.entry(url.to_string()).or_default().failure = Some(message.to_string());
        self
    }

    /// Replaces the steps reported for `url`.
    pub fn steps(mut self, url: &str, steps: Vec<Step>) -> Self {
        self.scripts.entry(url.to_string()).or_default().steps = steps;
        self
    }

    /// Holds every download open for `delay`.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// URLs in the order the engine was invoked.
    pub fn called_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Options the engine received for `url`.
    pub fn options_for(&self, url: &str) -> Option<EngineOptions> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(called, _)| called == url)
            .map(|(_, options)| options.clone())
    }

    /// Highest number of simultaneous downloads observed.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RetrievalEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn download(
        &self,
        url: &str,
        options: &EngineOptions,
        reporter: EngineReporter,
        cancel: &CancelFlag,
    ) -> Result<(), EngineError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), options.clone()));
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let script = self.scripts.get(url).cloned().unwrap_or_default();
        for step in script.steps {
            match step {
                Step::Percent(label) => reporter.progress(
                    RawStatus::new()
                        .with("status", "downloading")
                        .with("_percent_str", label)
                        .with("_speed_str", "1.00MiB/s")
                        .with("_eta_str", "00:05"),
                ),
                Step::Finished => reporter.progress(RawStatus::new().with("status", "finished")),
                Step::Log(level, message) => reporter.log(level, message),
                Step::Cancel => cancel.cancel(),
            }
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        match script.failure {
            Some(message) => Err(EngineError::failed(url, message)),
            None => Ok(()),
        }
    }
}

/// Events for job `index`, in emission order.
pub fn job_events(events: &[(BatchEvent, Severity)], index: usize) -> Vec<BatchEvent> {
    events
        .iter()
        .filter(|(event, _)| event.job_index() == Some(index))
        .map(|(event, _)| event.clone())
        .collect()
}

/// Percent values of every progress event for job `index`.
pub fn job_percents(events: &[(BatchEvent, Severity)], index: usize) -> Vec<f64> {
    job_events(events, index)
        .into_iter()
        .filter_map(|event| match event {
            BatchEvent::Progress { progress, .. } => Some(progress.percent),
            _ => None,
        })
        .collect()
}
