//! Progress event emission for batch recomputes.
//!
//! Provides lightweight, structured progress events for pollers and
//! dashboards. Events are dispatched through an in-process event bus that
//! supports multiple subscribers, or written as JSONL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{mpsc, Arc, Mutex};
use std::time::Instant;

use crate::driver::{BatchProgressSink, BatchReport, FailedEntity};
use mr_common::JobId;

/// Standard progress event names.
pub mod event_names {
    pub const BATCH_STARTED: &str = "batch_started";
    pub const BATCH_PROGRESS: &str = "batch_progress";
    pub const BATCH_ENTITY_FAILED: &str = "batch_entity_failed";
    pub const BATCH_COMPLETE: &str = "batch_complete";
    pub const BATCH_CANCELLED: &str = "batch_cancelled";
}

/// Phase of a batch a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Catalog acquired and corpus context built.
    Prepare,
    /// Entities being recomputed.
    Recompute,
    /// Batch finished or cancelled.
    Finish,
}

/// Progress counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Structured progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub event: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, Value>,
}

impl ProgressEvent {
    pub fn new(event: impl Into<String>, phase: Phase) -> Self {
        Self {
            event: event.into(),
            timestamp: Utc::now(),
            job_id: None,
            phase,
            progress: None,
            elapsed_ms: None,
            details: HashMap::new(),
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_progress(mut self, current: u64, total: Option<u64>) -> Self {
        self.progress = Some(Progress { current, total });
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.insert(key.into(), v);
        }
        self
    }

    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"serialization_failed","event":"{}"}}"#,
                self.event
            )
        })
    }
}

/// Trait for emitting progress events.
pub trait ProgressEmitter: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Broadcast event bus supporting multiple subscribers.
#[derive(Debug, Default)]
pub struct EventBus {
    senders: Mutex<Vec<mpsc::Sender<ProgressEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to receive progress events.
    pub fn subscribe(&self) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(tx);
        }
        rx
    }

    /// Emit a progress event to all subscribers. Dropped receivers are pruned.
    pub fn emit(&self, event: ProgressEvent) {
        if let Ok(mut senders) = self.senders.lock() {
            senders.retain(|sender| sender.send(event.clone()).is_ok());
        }
    }
}

impl ProgressEmitter for EventBus {
    fn emit(&self, event: ProgressEvent) {
        EventBus::emit(self, event);
    }
}

/// JSONL writer for progress events.
pub struct JsonlWriter<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> ProgressEmitter for JsonlWriter<W> {
    fn emit(&self, event: ProgressEvent) {
        let line = event.to_jsonl();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}

/// Forwards events to several emitters.
pub struct FanoutEmitter {
    emitters: Vec<Arc<dyn ProgressEmitter>>,
}

impl FanoutEmitter {
    pub fn new(emitters: Vec<Arc<dyn ProgressEmitter>>) -> Self {
        Self { emitters }
    }
}

impl ProgressEmitter for FanoutEmitter {
    fn emit(&self, event: ProgressEvent) {
        for emitter in &self.emitters {
            emitter.emit(event.clone());
        }
    }
}

/// Attaches a job id to every event that lacks one.
pub struct JobEmitter {
    job_id: String,
    inner: Arc<dyn ProgressEmitter>,
}

impl JobEmitter {
    pub fn new(job_id: impl Into<String>, inner: Arc<dyn ProgressEmitter>) -> Self {
        Self {
            job_id: job_id.into(),
            inner,
        }
    }
}

impl ProgressEmitter for JobEmitter {
    fn emit(&self, mut event: ProgressEvent) {
        if event.job_id.is_none() {
            event.job_id = Some(self.job_id.clone());
        }
        self.inner.emit(event);
    }
}

/// Turns batch callbacks into progress events.
///
/// Progress events are throttled to one every `every` entities plus the
/// final one. Failures and lifecycle events are always emitted.
pub struct EmitterSink {
    emitter: Arc<dyn ProgressEmitter>,
    every: usize,
    started: Mutex<Option<Instant>>,
}

impl EmitterSink {
    pub fn new(emitter: Arc<dyn ProgressEmitter>, every: usize) -> Self {
        Self {
            emitter,
            every: every.max(1),
            started: Mutex::new(None),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started
            .lock()
            .ok()
            .and_then(|s| *s)
            .map(|at| at.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }
}

impl BatchProgressSink for EmitterSink {
    fn report_started(&self, job_id: &JobId, total: usize) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        self.emitter.emit(
            ProgressEvent::new(event_names::BATCH_STARTED, Phase::Prepare)
                .with_job_id(job_id.to_string())
                .with_progress(0, Some(total as u64)),
        );
    }

    fn report_progress(&self, done: usize, total: usize) {
        if done % self.every != 0 && done != total {
            return;
        }
        self.emitter.emit(
            ProgressEvent::new(event_names::BATCH_PROGRESS, Phase::Recompute)
                .with_progress(done as u64, Some(total as u64))
                .with_elapsed_ms(self.elapsed_ms()),
        );
    }

    fn report_failure(&self, failure: &FailedEntity) {
        self.emitter.emit(
            ProgressEvent::new(event_names::BATCH_ENTITY_FAILED, Phase::Recompute)
                .with_detail("entity_id", failure.entity_id)
                .with_detail("code", failure.code)
                .with_detail("category", failure.category)
                .with_detail("message", &failure.message),
        );
    }

    fn report_finished(&self, report: &BatchReport) {
        let name = if report.cancelled {
            event_names::BATCH_CANCELLED
        } else {
            event_names::BATCH_COMPLETE
        };
        self.emitter.emit(
            ProgressEvent::new(name, Phase::Finish)
                .with_job_id(report.job_id.to_string())
                .with_progress(report.attempted() as u64, Some(report.total as u64))
                .with_elapsed_ms(report.timings.elapsed_ms)
                .with_detail("processed", report.processed)
                .with_detail("skipped", report.skipped)
                .with_detail("failed", report.failed.len()),
        );
    }
}
