//! Lightweight trace-id and span-sequence assembly for the reasoning
//! runtime (spec §6 "Trace output").
//!
//! Grounded on the teacher's `restflow_ai::agent::trace::TraceEvent`
//! (timestamp + event_type + JSON payload) and generalized into a
//! `Tracer` that assembles a run-scoped trace id plus an ordered sequence
//! of named spans with start/end status, rather than one-off floating
//! events. `raconteur-ai` emits its own `tracing` spans/events for live
//! observability (see `tracing::info_span!` call sites in
//! `agent::reasoning::runner`); this crate instead produces the
//! *returned* trace payload callers get back in a run's result bundle,
//! independent of whatever `tracing` subscriber is (or isn't) installed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed span names used by the reasoning runtime (spec §6).
pub const SPAN_AGENT_RUN: &str = "agent_run";
pub const SPAN_INTENT_RECOGNITION: &str = "intent_recognition";
pub const SPAN_TASK_DECOMPOSITION: &str = "task_decomposition";
pub const SPAN_PLANNING: &str = "planning";
pub const SPAN_EXECUTE_STEP: &str = "execute_step";
pub const SPAN_TOOL_EXECUTION: &str = "tool_execution";
pub const SPAN_OBSERVATION_PROCESSING: &str = "observation_processing";
pub const SPAN_REFLECTION: &str = "reflection";
pub const SPAN_SYNTHESIS: &str = "synthesis";
pub const SPAN_REPLANNING: &str = "replanning";

/// Status of a completed span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpanStatus {
    Ok,
    Error,
}

/// One start/end span recorded during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSpan {
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub status: SpanStatus,
    pub message: Option<String>,
}

/// A named event recorded inside a run (e.g. `long_term_memory_retrieved`,
/// `context_stabilized`, `task_decomposed`, `tool_result`,
/// `interaction_learned`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl TraceEvent {
    pub fn new(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Accumulates spans and events for a single run and freezes them into a
/// [`Trace`] at the end of the run. Not `Clone` — a tracer belongs to
/// exactly one in-flight run.
#[derive(Debug, Default)]
pub struct Tracer {
    trace_id: String,
    spans: Vec<TraceSpan>,
    events: Vec<TraceEvent>,
    open: Vec<(String, DateTime<Utc>)>,
}

impl Tracer {
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            spans: Vec::new(),
            events: Vec::new(),
            open: Vec::new(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Open a span; must be matched by a later `end_span` call with the
    /// same name (spans do not nest in this lightweight model — the
    /// fixed span list in spec §6 is already flat).
    pub fn start_span(&mut self, name: &str) {
        self.open.push((name.to_string(), Utc::now()));
    }

    pub fn end_span(&mut self, name: &str, status: SpanStatus, message: Option<String>) {
        let started_at = self
            .open
            .iter()
            .rposition(|(n, _)| n == name)
            .map(|idx| self.open.remove(idx).1)
            .unwrap_or_else(Utc::now);
        self.spans.push(TraceSpan {
            name: name.to_string(),
            started_at,
            ended_at: Utc::now(),
            status,
            message,
        });
    }

    pub fn event(&mut self, name: &str, data: serde_json::Value) {
        self.events.push(TraceEvent::new(name, data));
    }

    pub fn finish(self) -> Trace {
        Trace {
            trace_id: self.trace_id,
            spans: self.spans,
            events: self.events,
        }
    }
}

/// The frozen trace output for one run: trace id plus the ordered span
/// and event sequences (spec §6 "Trace output").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: String,
    pub spans: Vec<TraceSpan>,
    pub events: Vec<TraceEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_record_start_and_end_in_order() {
        let mut tracer = Tracer::new();
        tracer.start_span(SPAN_AGENT_RUN);
        tracer.start_span(SPAN_PLANNING);
        tracer.event("context_stabilized", serde_json::json!({"tokens": 42}));
        tracer.end_span(SPAN_PLANNING, SpanStatus::Ok, None);
        tracer.end_span(SPAN_AGENT_RUN, SpanStatus::Ok, None);

        let trace = tracer.finish();
        assert_eq!(trace.spans.len(), 2);
        assert_eq!(trace.spans[0].name, SPAN_PLANNING);
        assert_eq!(trace.spans[1].name, SPAN_AGENT_RUN);
        assert_eq!(trace.events.len(), 1);
        assert!(!trace.trace_id.is_empty());
    }

    #[test]
    fn error_span_carries_a_message() {
        let mut tracer = Tracer::new();
        tracer.start_span(SPAN_SYNTHESIS);
        tracer.end_span(SPAN_SYNTHESIS, SpanStatus::Error, Some("llm timeout".into()));
        let trace = tracer.finish();
        assert_eq!(trace.spans[0].status, SpanStatus::Error);
        assert_eq!(trace.spans[0].message.as_deref(), Some("llm timeout"));
    }
}
