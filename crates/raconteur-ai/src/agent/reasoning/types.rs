//! Shared data model for the reasoning runtime: planned steps, step
//! results, processed observations, and the per-invocation agent context.
//!
//! Generalizes the teacher's `agent::step::ExecutionStep` / `agent::trace`
//! shapes into the spec's richer `PlannedStep`/`StepResult`/
//! `ProcessedObservation` triad.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What should happen when a planned step fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FailurePolicy {
    Abort,
    Skip,
    Retry { max_retries: u32 },
    Fallback { action: String },
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Retry { max_retries: 1 }
    }
}

/// A single step in a plan. In the ReAct runner the plan is a single
/// virtual `REACT_LOOP` step that unrolls dynamically (§4.2 Planning).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedStep {
    pub id: String,
    pub order: u32,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output_shape: Option<String>,
    pub max_retries: u32,
    pub timeout_ms: u64,
    pub failure_policy: FailurePolicy,
}

impl PlannedStep {
    pub fn react_loop(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            order: 0,
            action: "REACT_LOOP".to_string(),
            tool_id: None,
            input: Value::Null,
            expected_output_shape: None,
            max_retries: 0,
            timeout_ms: 30_000,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

/// The outcome of executing one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tokens_used: u64,
    /// Cost in hundredths of a currency unit (cents). Never floating point,
    /// so budget comparisons stay exact.
    pub cost_cents: u64,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Value>,
}

impl StepResult {
    pub fn ok(step_id: impl Into<String>, output: Value, tokens: u64, cost_cents: u64) -> Self {
        Self {
            step_id: step_id.into(),
            success: true,
            output: Some(output),
            error: None,
            tokens_used: tokens,
            cost_cents,
            duration_ms: 0,
            trace: None,
        }
    }

    pub fn failed(step_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            success: false,
            output: None,
            error: Some(error.into()),
            tokens_used: 0,
            cost_cents: 0,
            duration_ms: 0,
            trace: None,
        }
    }
}

/// Classification of a processed observation (§3 Data Model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationKind {
    Information,
    Confirmation,
    Contradiction,
    Discovery,
    Error,
    Insufficient,
}

/// The structured interpretation of a tool result produced by the
/// observation-processing handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedObservation {
    pub kind: ObservationKind,
    pub insight: String,
    pub confidence: f64,
    pub invalidates_plan: bool,
    pub raw: Value,
}

impl ProcessedObservation {
    pub fn new(kind: ObservationKind, insight: impl Into<String>, confidence: f64) -> Self {
        Self {
            kind,
            insight: insight.into(),
            confidence: confidence.clamp(0.0, 1.0),
            invalidates_plan: false,
            raw: Value::Null,
        }
    }

    pub fn invalidating(mut self) -> Self {
        self.invalidates_plan = true;
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    /// Tool-error-marker detection used by the Observation handler (§4.2):
    /// `observation contains an error marker`.
    pub fn looks_like_error(text: &str) -> bool {
        text.starts_with("Error:") || text.starts_with("error:")
    }
}

/// Per-invocation, caller-supplied, immutable bundle (§3 Data Model).
/// Created by the outer host (an HTTP handler or channel dispatcher in the
/// host application) and discarded after the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContext {
    pub user_id: String,
    pub session_id: String,
    /// Recent messages, ordered, newest last.
    pub recent_messages: Vec<ContextMessage>,
    /// Bounded set of retrieved long-term memories.
    pub retrieved_memories: Vec<RetrievedMemory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedMemory {
    pub text: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl AgentContext {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            recent_messages: Vec::new(),
            retrieved_memories: Vec::new(),
        }
    }
}

/// The intent-recognition handler's parsed verdict (§4.2): a coarse label
/// plus the model's confidence in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedIntent {
    pub label: String,
    pub confidence: f64,
}

/// One parsed turn of the text ReAct loop (§4.2 Executing): the model's
/// reasoning, the action it chose, and that action's input. `action ==
/// "Final Answer"` is the literal sentinel the handler checks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactStep {
    pub thought: String,
    pub action: String,
    #[serde(rename = "actionInput")]
    pub action_input: Value,
}

pub const FINAL_ANSWER_ACTION: &str = "Final Answer";
