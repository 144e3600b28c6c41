//! Per-request tracker.
//!
//! Stage transitions are one-way (PENDING → RUNNING → COMPLETED/FAILED/CANCELLED) and each
//! terminal state is recorded once. The summary is built and reported by whichever finishing
//! call wins the `finished` flag.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use dialogue_core::Clock;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::reporter::PipelineReporter;
use super::stage::{PipelineStage, PipelineStatus, StageStatus};

const MAX_LLM_OUTPUTS: usize = 20;
const PREVIEW_LIMIT: usize = 80;
const NO_RESPONSE: i64 = i64::MIN;

pub type Attributes = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSnapshot {
    pub stage: PipelineStage,
    pub status: StageStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// -1 unless both timestamps are set.
    pub duration_ms: i64,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub pipeline_id: String,
    pub status: PipelineStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_duration_ms: i64,
    pub attributes: Attributes,
    pub stages: Vec<StageSnapshot>,
    pub llm_outputs: Vec<String>,
    pub first_response_latency_ms: Option<i64>,
    pub last_response_latency_ms: Option<i64>,
}

impl PipelineSummary {
    pub fn stage(&self, stage: PipelineStage) -> Option<&StageSnapshot> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

#[derive(Debug)]
struct StageMetric {
    status: StageStatus,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    attributes: Attributes,
}

impl StageMetric {
    fn new() -> Self {
        Self {
            status: StageStatus::Pending,
            started_at: None,
            finished_at: None,
            attributes: Attributes::new(),
        }
    }

    fn start(&mut self, at: DateTime<Utc>) {
        if self.status == StageStatus::Pending {
            self.status = StageStatus::Running;
            self.started_at = Some(at);
        }
    }

    fn complete(&mut self, at: DateTime<Utc>) {
        if self.status == StageStatus::Running {
            self.status = StageStatus::Completed;
            self.finished_at = Some(at);
        }
    }

    fn fail(&mut self, at: DateTime<Utc>, error: String) {
        if matches!(self.status, StageStatus::Pending | StageStatus::Running) {
            self.status = StageStatus::Failed;
            self.finished_at = Some(at);
            self.attributes
                .entry("error".to_string())
                .or_insert(Value::String(error));
        }
    }

    fn cancel(&mut self, at: DateTime<Utc>) {
        if self.status == StageStatus::Running {
            self.status = StageStatus::Cancelled;
            self.finished_at = Some(at);
        }
    }

    fn snapshot(&self, stage: PipelineStage) -> StageSnapshot {
        let duration_ms = match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds(),
            _ => -1,
        };
        StageSnapshot {
            stage,
            status: self.status,
            started_at: self.started_at,
            finished_at: self.finished_at,
            duration_ms,
            attributes: self.attributes.clone(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn preview(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.chars().count() <= PREVIEW_LIMIT {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(PREVIEW_LIMIT - 3).collect();
    out.push_str("...");
    out
}

pub struct DialoguePipelineTracker {
    pipeline_id: String,
    reporter: Arc<dyn PipelineReporter>,
    clock: Arc<dyn Clock>,
    started_at: DateTime<Utc>,
    stages: Mutex<BTreeMap<PipelineStage, StageMetric>>,
    attributes: Mutex<Attributes>,
    llm_outputs: Mutex<Vec<String>>,
    first_response_ms: AtomicI64,
    last_response_ms: AtomicI64,
    finished: AtomicBool,
}

impl DialoguePipelineTracker {
    pub fn new(input: &str, reporter: Arc<dyn PipelineReporter>, clock: Arc<dyn Clock>) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert("input.length".to_string(), input.chars().count().into());
        attributes.insert("input.preview".to_string(), preview(input).into());
        Self {
            pipeline_id: Uuid::new_v4().to_string(),
            reporter,
            started_at: clock.now(),
            clock,
            stages: Mutex::new(BTreeMap::new()),
            attributes: Mutex::new(attributes),
            llm_outputs: Mutex::new(Vec::new()),
            first_response_ms: AtomicI64::new(NO_RESPONSE),
            last_response_ms: AtomicI64::new(NO_RESPONSE),
            finished: AtomicBool::new(false),
        }
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn with_stage<R>(&self, stage: PipelineStage, f: impl FnOnce(&mut StageMetric) -> R) -> R {
        let mut stages = lock(&self.stages);
        f(stages.entry(stage).or_insert_with(StageMetric::new))
    }

    pub fn start_stage(&self, stage: PipelineStage) {
        let now = self.clock.now();
        self.with_stage(stage, |m| m.start(now));
    }

    pub fn complete_stage(&self, stage: PipelineStage) {
        let now = self.clock.now();
        self.with_stage(stage, |m| m.complete(now));
    }

    pub fn fail_stage(&self, stage: PipelineStage, error: &dyn Display) {
        let now = self.clock.now();
        let message = error.to_string();
        self.with_stage(stage, |m| m.fail(now, message));
    }

    pub fn cancel_stage(&self, stage: PipelineStage) {
        let now = self.clock.now();
        self.with_stage(stage, |m| m.cancel(now));
    }

    /// Starts `stage`; the guard cancels it if dropped before completing or failing.
    pub fn begin_stage(&self, stage: PipelineStage) -> StageGuard<'_> {
        self.start_stage(stage);
        StageGuard {
            tracker: self,
            stage,
            done: false,
        }
    }

    /// Runs `future` as `stage`.
    pub async fn trace<T, E, F>(&self, stage: PipelineStage, future: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        let guard = self.begin_stage(stage);
        match future.await {
            Ok(value) => {
                guard.complete();
                Ok(value)
            }
            Err(e) => {
                guard.fail(&e);
                Err(e)
            }
        }
    }

    pub fn stage_status(&self, stage: PipelineStage) -> StageStatus {
        lock(&self.stages)
            .get(&stage)
            .map(|m| m.status)
            .unwrap_or(StageStatus::Pending)
    }

    pub fn record_pipeline_attribute(&self, key: &str, value: impl Into<Value>) {
        lock(&self.attributes).insert(key.to_string(), value.into());
    }

    pub fn record_stage_attribute(&self, stage: PipelineStage, key: &str, value: impl Into<Value>) {
        let value = value.into();
        self.with_stage(stage, |m| {
            m.attributes.insert(key.to_string(), value);
        });
    }

    pub fn increment_stage_counter(&self, stage: PipelineStage, key: &str, delta: i64) {
        self.with_stage(stage, |m| {
            let current = m.attributes.get(key).and_then(Value::as_i64).unwrap_or(0);
            m.attributes.insert(key.to_string(), (current + delta).into());
        });
    }

    /// Keeps the first 20 non-blank outputs.
    pub fn record_llm_output(&self, output: &str) {
        if output.trim().is_empty() {
            return;
        }
        let mut outputs = lock(&self.llm_outputs);
        if outputs.len() < MAX_LLM_OUTPUTS {
            outputs.push(output.to_string());
        }
    }

    /// Called for every item handed to the consumer.
    pub fn mark_response_emission(&self) {
        let latency = (self.clock.now() - self.started_at).num_milliseconds();
        let _ = self.first_response_ms.compare_exchange(
            NO_RESPONSE,
            latency,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        self.last_response_ms.store(latency, Ordering::SeqCst);
    }

    /// Finishes the request. Only the first call builds and reports a summary; returns whether
    /// this call was it. Stages still running are marked cancelled.
    pub fn finish(&self, status: PipelineStatus, error: Option<&dyn Display>) -> bool {
        if self
            .finished
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        if let Some(error) = error {
            self.record_pipeline_attribute("error", error.to_string());
        }

        let finished_at = self.clock.now();
        let stages: Vec<StageSnapshot> = {
            let mut stages = lock(&self.stages);
            stages
                .iter_mut()
                .map(|(stage, metric)| {
                    metric.cancel(finished_at);
                    metric.snapshot(*stage)
                })
                .collect()
        };

        let latency = |value: i64| (value != NO_RESPONSE).then_some(value);
        let summary = PipelineSummary {
            pipeline_id: self.pipeline_id.clone(),
            status,
            started_at: self.started_at,
            finished_at,
            total_duration_ms: (finished_at - self.started_at).num_milliseconds(),
            attributes: lock(&self.attributes).clone(),
            stages,
            llm_outputs: lock(&self.llm_outputs).clone(),
            first_response_latency_ms: latency(self.first_response_ms.load(Ordering::SeqCst)),
            last_response_latency_ms: latency(self.last_response_ms.load(Ordering::SeqCst)),
        };
        self.reporter.report(summary);
        true
    }
}

/// Running stage owned by a scope. Dropping it unfinished marks the stage cancelled.
pub struct StageGuard<'a> {
    tracker: &'a DialoguePipelineTracker,
    stage: PipelineStage,
    done: bool,
}

impl StageGuard<'_> {
    pub fn complete(mut self) {
        self.done = true;
        self.tracker.complete_stage(self.stage);
    }

    pub fn fail(mut self, error: &dyn Display) {
        self.done = true;
        self.tracker.fail_stage(self.stage, error);
    }
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.tracker.cancel_stage(self.stage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_input() {
        assert_eq!(preview("  short  "), "short");
        let long = "x".repeat(100);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 80);
        assert!(p.ends_with("..."));
        assert_eq!(preview(&"y".repeat(80)), "y".repeat(80));
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let korean = "안".repeat(81);
        let p = preview(&korean);
        assert_eq!(p.chars().count(), 80);
    }

    #[test]
    fn stage_metric_is_one_way() {
        let t0 = Utc::now();
        let mut m = StageMetric::new();
        m.complete(t0);
        assert_eq!(m.status, StageStatus::Pending);
        m.start(t0);
        m.complete(t0);
        m.fail(t0, "late".to_string());
        m.cancel(t0);
        assert_eq!(m.status, StageStatus::Completed);
        assert!(!m.attributes.contains_key("error"));
        assert_eq!(m.snapshot(PipelineStage::Retrieval).duration_ms, 0);
    }
}
