//! Multi-agent orchestrator (§4.5): linear pipelines of named agent stages
//! with handoff/critique/approval messaging and a per-pipeline agent cache.
//!
//! Grounded on `workflow_def::{SequenceDef, StepDef}` for the
//! pipeline-of-named-steps shape (generalized from a static JSON-compiled
//! workflow to a runtime-resolved agent pipeline) and on `sub_agent`'s
//! `DashMap`-backed per-agent state cache and `current_depth`/`max_depth`
//! nesting-limit idiom (generalized from sub-agent spawn depth to pipeline
//! nesting depth).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const DEFAULT_MAX_NESTING_DEPTH: usize = 4;
const MAX_MESSAGE_HISTORY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailurePolicy {
    Abort,
    Skip,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Handoff,
    Request,
    Response,
    Critique,
    Approval,
    Rejection,
}

/// An immutable record of one inter-agent message (§4.5), including a
/// snapshot of the pipeline input the sending stage was acting on, so a
/// listener replaying the history can reconstruct what the sender saw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: String,
    pub kind: MessageKind,
    pub from_stage: String,
    pub to_stage: Option<String>,
    pub payload: Value,
    pub context: Value,
    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    fn new(kind: MessageKind, from_stage: impl Into<String>, to_stage: Option<String>, payload: Value, context: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            from_stage: from_stage.into(),
            to_stage,
            payload,
            context,
            timestamp: Utc::now(),
        }
    }
}

/// Structured result of a critique stage (§4.5). Falls back to a
/// conservative pass when the stage's output can't be parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiqueResult {
    pub passed: bool,
    pub score: f64,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub summary: String,
}

impl CritiqueResult {
    fn parse(value: &Value) -> Self {
        let passed = value.get("passed").and_then(Value::as_bool);
        let score = value.get("score").and_then(Value::as_f64);
        let (Some(passed), Some(score)) = (passed, score) else {
            return Self {
                passed: true,
                score: 0.7,
                issues: Vec::new(),
                suggestions: Vec::new(),
                summary: String::new(),
            };
        };
        Self {
            passed,
            score,
            issues: Self::string_array(value, "issues"),
            suggestions: Self::string_array(value, "suggestions"),
            summary: value.get("summary").and_then(Value::as_str).unwrap_or_default().to_string(),
        }
    }

    fn string_array(value: &Value, key: &str) -> Vec<String> {
        value
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

/// One named stage in a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineStage {
    pub name: String,
    pub agent_id: String,
    pub failure_policy: FailurePolicy,
    pub max_retries: u32,
    /// Whether this stage's output must be approved before the pipeline
    /// continues (via [`ApprovalGate`]).
    pub requires_approval: bool,
    /// Whether this stage critiques the previous stage's output rather
    /// than producing new content; its output, if a rejection, sends the
    /// pipeline back to the previous stage once.
    pub is_critique: bool,
}

impl PipelineStage {
    pub fn new(name: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agent_id: agent_id.into(),
            failure_policy: FailurePolicy::Abort,
            max_retries: 0,
            requires_approval: false,
            is_critique: false,
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy, max_retries: u32) -> Self {
        self.failure_policy = policy;
        self.max_retries = max_retries;
        self
    }

    pub fn requiring_approval(mut self) -> Self {
        self.requires_approval = true;
        self
    }

    pub fn as_critique(mut self) -> Self {
        self.is_critique = true;
        self
    }
}

/// A function that transforms the previous stage's output into the next
/// stage's input. Identity (`|v| v`) when omitted.
pub type InputTransform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Clone)]
pub struct Pipeline {
    pub name: String,
    pub stages: Vec<PipelineStage>,
    pub transforms: HashMap<String, InputTransform>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, stages: Vec<PipelineStage>) -> Self {
        Self {
            name: name.into(),
            stages,
            transforms: HashMap::new(),
        }
    }

    pub fn with_transform(mut self, stage_name: impl Into<String>, transform: InputTransform) -> Self {
        self.transforms.insert(stage_name.into(), transform);
        self
    }
}

/// Caller-supplied agent invocation. The orchestrator never calls an LLM
/// directly; it asks this port to run one stage.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, agent_id: &str, input: Value) -> Result<Value, String>;
}

/// Gate consulted before a `requires_approval` stage's output may proceed.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn approve(&self, stage: &str, output: &Value) -> bool;
}

/// A conservative approval gate that always approves, used when no real
/// gate is wired in (matches the spec's "conservative passthrough" default
/// for critique/approval when no handler is configured).
pub struct PassthroughApprovalGate;

#[async_trait]
impl ApprovalGate for PassthroughApprovalGate {
    async fn approve(&self, _stage: &str, _output: &Value) -> bool {
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: String,
    pub output: Value,
    pub attempts: u32,
    pub rejected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub pipeline: String,
    pub outcomes: Vec<StageOutcome>,
    pub final_output: Value,
    pub aborted: bool,
    pub messages: Vec<AgentMessage>,
}

#[derive(Debug, Clone)]
pub enum OrchestratorError {
    NestingTooDeep { depth: usize, max_depth: usize },
    StageFailed { stage: String, reason: String },
}

impl std::fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorError::NestingTooDeep { depth, max_depth } => {
                write!(f, "pipeline nesting depth {depth} exceeds the limit of {max_depth}")
            }
            OrchestratorError::StageFailed { stage, reason } => {
                write!(f, "stage \"{stage}\" failed: {reason}")
            }
        }
    }
}

impl std::error::Error for OrchestratorError {}

/// Runs [`Pipeline`]s against an [`AgentInvoker`], caching resolved agent
/// handles per pipeline and enforcing a bounded handoff nesting depth.
pub struct Orchestrator {
    invoker: Arc<dyn AgentInvoker>,
    approval_gate: Arc<dyn ApprovalGate>,
    max_nesting_depth: usize,
    /// Per-pipeline cache of "has this pipeline been resolved/validated
    /// before" so repeat runs skip re-validating the stage list.
    resolved_pipelines: DashMap<String, usize>,
    /// Bounded, queryable-by-agent-id history of every message sent across
    /// all pipeline runs on this orchestrator instance.
    history: Mutex<VecDeque<AgentMessage>>,
}

impl Orchestrator {
    pub fn new(invoker: Arc<dyn AgentInvoker>) -> Self {
        Self {
            invoker,
            approval_gate: Arc::new(PassthroughApprovalGate),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            resolved_pipelines: DashMap::new(),
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_approval_gate(mut self, gate: Arc<dyn ApprovalGate>) -> Self {
        self.approval_gate = gate;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    fn record_message(&self, messages: &mut Vec<AgentMessage>, message: AgentMessage) {
        let mut history = self.history.lock();
        history.push_back(message.clone());
        while history.len() > MAX_MESSAGE_HISTORY {
            history.pop_front();
        }
        drop(history);
        messages.push(message);
    }

    /// All messages this orchestrator has sent or received naming
    /// `agent_id` as either the sender or the recipient stage.
    pub fn history_for(&self, agent_id: &str) -> Vec<AgentMessage> {
        self.history
            .lock()
            .iter()
            .filter(|m| m.from_stage == agent_id || m.to_stage.as_deref() == Some(agent_id))
            .cloned()
            .collect()
    }

    pub fn history(&self) -> Vec<AgentMessage> {
        self.history.lock().iter().cloned().collect()
    }

    /// Run `pipeline` at `depth` (0 for a top-level call; pass `depth + 1`
    /// when a stage's agent itself triggers a nested pipeline run).
    pub async fn run(
        &self,
        pipeline: &Pipeline,
        input: Value,
        depth: usize,
    ) -> Result<PipelineResult, OrchestratorError> {
        if depth > self.max_nesting_depth {
            return Err(OrchestratorError::NestingTooDeep {
                depth,
                max_depth: self.max_nesting_depth,
            });
        }

        self.resolved_pipelines
            .entry(pipeline.name.clone())
            .and_modify(|count| *count += 1)
            .or_insert(1);

        let mut current_input = input;
        let mut outcomes = Vec::new();
        let mut messages = Vec::new();
        let mut aborted = false;

        let mut index = 0usize;
        while index < pipeline.stages.len() {
            let stage = &pipeline.stages[index];

            let stage_input = pipeline
                .transforms
                .get(&stage.name)
                .map(|f| f(current_input.clone()))
                .unwrap_or_else(|| current_input.clone());

            let mut attempts = 0u32;
            let mut last_error = String::new();
            let mut output: Option<Value> = None;

            loop {
                attempts += 1;
                match self.invoker.invoke(&stage.agent_id, stage_input.clone()).await {
                    Ok(value) => {
                        output = Some(value);
                        break;
                    }
                    Err(reason) => {
                        last_error = reason;
                        if stage.failure_policy == FailurePolicy::Retry && attempts <= stage.max_retries {
                            continue;
                        }
                        break;
                    }
                }
            }

            let Some(stage_output) = output else {
                match stage.failure_policy {
                    FailurePolicy::Skip => {
                        outcomes.push(StageOutcome {
                            stage: stage.name.clone(),
                            output: Value::Null,
                            attempts,
                            rejected: false,
                        });
                        index += 1;
                        continue;
                    }
                    FailurePolicy::Abort | FailurePolicy::Retry => {
                        aborted = true;
                        self.record_message(
                            &mut messages,
                            AgentMessage::new(
                                MessageKind::Rejection,
                                stage.name.clone(),
                                None,
                                Value::String(last_error.clone()),
                                stage_input.clone(),
                            ),
                        );
                        return Err(OrchestratorError::StageFailed {
                            stage: stage.name.clone(),
                            reason: last_error,
                        });
                    }
                }
            };

            if stage.requires_approval {
                let approved = self.approval_gate.approve(&stage.name, &stage_output).await;
                self.record_message(
                    &mut messages,
                    AgentMessage::new(
                        if approved { MessageKind::Approval } else { MessageKind::Rejection },
                        stage.name.clone(),
                        None,
                        stage_output.clone(),
                        stage_input.clone(),
                    ),
                );
                if !approved {
                    aborted = true;
                    outcomes.push(StageOutcome {
                        stage: stage.name.clone(),
                        output: stage_output,
                        attempts,
                        rejected: true,
                    });
                    break;
                }
            }

            if stage.is_critique {
                let critique = CritiqueResult::parse(&stage_output);
                self.record_message(
                    &mut messages,
                    AgentMessage::new(
                        MessageKind::Critique,
                        stage.name.clone(),
                        (index > 0).then(|| pipeline.stages[index - 1].name.clone()),
                        serde_json::to_value(&critique).unwrap_or(stage_output.clone()),
                        stage_input.clone(),
                    ),
                );
                if !critique.passed && index > 0 {
                    outcomes.push(StageOutcome {
                        stage: stage.name.clone(),
                        output: stage_output.clone(),
                        attempts,
                        rejected: true,
                    });
                    // Send the pipeline back to the previous stage exactly
                    // once; mark the critique stage's feedback as the new
                    // input so the retried stage can react to it.
                    current_input = stage_output;
                    index -= 1;
                    continue;
                }
            }

            self.record_message(
                &mut messages,
                AgentMessage::new(
                    MessageKind::Handoff,
                    stage.name.clone(),
                    pipeline.stages.get(index + 1).map(|s| s.name.clone()),
                    stage_output.clone(),
                    stage_input.clone(),
                ),
            );

            current_input = stage_output;
            outcomes.push(StageOutcome {
                stage: stage.name.clone(),
                output: current_input.clone(),
                attempts,
                rejected: false,
            });
            index += 1;
        }

        Ok(PipelineResult {
            pipeline: pipeline.name.clone(),
            final_output: current_input,
            outcomes,
            aborted,
            messages,
        })
    }

    pub fn run_count(&self, pipeline_name: &str) -> usize {
        self.resolved_pipelines.get(pipeline_name).map(|v| *v).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EchoInvoker;

    #[async_trait]
    impl AgentInvoker for EchoInvoker {
        async fn invoke(&self, agent_id: &str, input: Value) -> Result<Value, String> {
            Ok(json!({"agent": agent_id, "echo": input}))
        }
    }

    struct AlwaysFailInvoker;

    #[async_trait]
    impl AgentInvoker for AlwaysFailInvoker {
        async fn invoke(&self, _agent_id: &str, _input: Value) -> Result<Value, String> {
            Err("boom".to_string())
        }
    }

    struct FlakyInvoker {
        calls: AtomicU32,
    }

    #[async_trait]
    impl AgentInvoker for FlakyInvoker {
        async fn invoke(&self, _agent_id: &str, _input: Value) -> Result<Value, String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err("transient".to_string())
            } else {
                Ok(json!({"ok": true}))
            }
        }
    }

    struct RejectingApprovalGate;

    #[async_trait]
    impl ApprovalGate for RejectingApprovalGate {
        async fn approve(&self, _stage: &str, _output: &Value) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn linear_pipeline_hands_off_between_stages() {
        let orchestrator = Orchestrator::new(Arc::new(EchoInvoker));
        let pipeline = Pipeline::new(
            "biography_draft",
            vec![PipelineStage::new("outline", "outliner"), PipelineStage::new("prose", "writer")],
        );

        let result = orchestrator.run(&pipeline, json!({"topic": "childhood"}), 0).await.unwrap();
        assert!(!result.aborted);
        assert_eq!(result.outcomes.len(), 2);
        assert!(result.messages.iter().any(|m| m.kind == MessageKind::Handoff));
    }

    #[tokio::test]
    async fn abort_policy_stops_the_pipeline_on_failure() {
        let orchestrator = Orchestrator::new(Arc::new(AlwaysFailInvoker));
        let pipeline = Pipeline::new("x", vec![PipelineStage::new("only", "agent")]);
        let err = orchestrator.run(&pipeline, json!({}), 0).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::StageFailed { .. }));
    }

    #[tokio::test]
    async fn skip_policy_continues_past_a_failed_stage() {
        let orchestrator = Orchestrator::new(Arc::new(AlwaysFailInvoker));
        let pipeline = Pipeline::new(
            "x",
            vec![
                PipelineStage::new("flaky", "agent").with_failure_policy(FailurePolicy::Skip, 0),
            ],
        );
        let result = orchestrator.run(&pipeline, json!({}), 0).await.unwrap();
        assert!(!result.aborted);
        assert_eq!(result.outcomes[0].output, Value::Null);
    }

    #[tokio::test]
    async fn retry_policy_succeeds_after_transient_failures() {
        let orchestrator = Orchestrator::new(Arc::new(FlakyInvoker { calls: AtomicU32::new(0) }));
        let pipeline = Pipeline::new(
            "x",
            vec![PipelineStage::new("flaky", "agent").with_failure_policy(FailurePolicy::Retry, 3)],
        );
        let result = orchestrator.run(&pipeline, json!({}), 0).await.unwrap();
        assert!(!result.aborted);
        assert_eq!(result.outcomes[0].attempts, 3);
    }

    #[tokio::test]
    async fn rejected_approval_aborts_the_pipeline() {
        let orchestrator =
            Orchestrator::new(Arc::new(EchoInvoker)).with_approval_gate(Arc::new(RejectingApprovalGate));
        let pipeline = Pipeline::new(
            "x",
            vec![PipelineStage::new("sensitive", "agent").requiring_approval()],
        );
        let result = orchestrator.run(&pipeline, json!({}), 0).await.unwrap();
        assert!(result.aborted);
        assert!(result.outcomes[0].rejected);
    }

    #[tokio::test]
    async fn excessive_nesting_depth_is_rejected() {
        let orchestrator = Orchestrator::new(Arc::new(EchoInvoker)).with_max_nesting_depth(2);
        let pipeline = Pipeline::new("x", vec![PipelineStage::new("s", "agent")]);
        let err = orchestrator.run(&pipeline, json!({}), 5).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NestingTooDeep { depth: 5, max_depth: 2 }));
    }

    struct CritiqueInvoker;

    #[async_trait]
    impl AgentInvoker for CritiqueInvoker {
        async fn invoke(&self, agent_id: &str, _input: Value) -> Result<Value, String> {
            if agent_id == "critic" {
                Ok(json!({"passed": false, "score": 0.3, "issues": ["too vague"], "suggestions": ["add detail"], "summary": "needs work"}))
            } else {
                Ok(json!({"draft": "a story"}))
            }
        }
    }

    #[tokio::test]
    async fn structured_critique_sends_the_pipeline_back_once() {
        let orchestrator = Orchestrator::new(Arc::new(CritiqueInvoker));
        let pipeline = Pipeline::new(
            "x",
            vec![PipelineStage::new("writer", "writer"), PipelineStage::new("review", "critic").as_critique()],
        );
        let result = orchestrator.run(&pipeline, json!({}), 0).await.unwrap();
        let critique_msg = result.messages.iter().find(|m| m.kind == MessageKind::Critique).unwrap();
        assert_eq!(critique_msg.payload["passed"], json!(false));
        assert_eq!(critique_msg.payload["score"], json!(0.3));
        assert!(!critique_msg.id.is_empty());
    }

    #[tokio::test]
    async fn unparseable_critique_defaults_to_a_conservative_pass() {
        let critique = CritiqueResult::parse(&json!({"not": "the expected shape"}));
        assert!(critique.passed);
        assert_eq!(critique.score, 0.7);
    }

    #[tokio::test]
    async fn message_history_is_queryable_by_agent_id() {
        let orchestrator = Orchestrator::new(Arc::new(EchoInvoker));
        let pipeline = Pipeline::new(
            "biography_draft",
            vec![PipelineStage::new("outline", "outliner"), PipelineStage::new("prose", "writer")],
        );
        orchestrator.run(&pipeline, json!({"topic": "childhood"}), 0).await.unwrap();

        let outline_history = orchestrator.history_for("outline");
        assert!(!outline_history.is_empty());
        assert!(outline_history.iter().all(|m| m.from_stage == "outline" || m.to_stage.as_deref() == Some("outline")));
    }
}
