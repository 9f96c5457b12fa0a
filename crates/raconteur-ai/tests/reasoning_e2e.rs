//! Black-box coverage of the reasoning runtime's public surface: a full
//! runner pass plus a multi-stage pipeline that gets rejected by its
//! critique stage and retries before giving up.

use std::sync::Arc;

use async_trait::async_trait;
use raconteur_ai::{
    AgentInvoker, ContractRegistry, EnhancedReActRunner, MockLlmClient, MockStep,
    OrchestratorError, Permission, Phase, PipelineFailurePolicy, PipelineStage, ReasoningContext,
    ToolContract, ToolContractMeta, ToolExecutionContext,
};
use raconteur_ai::agent::reasoning::{Orchestrator, Pipeline};
use serde_json::{Value, json};

struct EchoTool {
    meta: ToolContractMeta,
}

#[async_trait]
impl ToolContract for EchoTool {
    fn meta(&self) -> &ToolContractMeta {
        &self.meta
    }
    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }
    fn output_schema(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(&self, input: Value, _ctx: &ToolExecutionContext) -> Result<Value, String> {
        Ok(input)
    }
}

#[tokio::test]
async fn recall_session_round_trips_through_the_public_runner_api() {
    let llm = Arc::new(MockLlmClient::from_steps(
        "mock",
        vec![MockStep::text("Your first car was a blue Ford Fiesta.")],
    ));
    let mut registry = ContractRegistry::new();
    registry.register(Arc::new(EchoTool {
        meta: ToolContractMeta::new("echo").with_default_permission(Permission::Allowed),
    }));

    let runner = EnhancedReActRunner::new(llm, Arc::new(registry));
    let ctx = ReasoningContext::new("grandma-1", "call-42");
    let outcome = runner.run("what was my first car?", &ctx).await;

    assert_eq!(outcome.phase, Phase::Done);
    assert_eq!(
        outcome.final_answer.as_deref(),
        Some("Your first car was a blue Ford Fiesta.")
    );
}

struct ScriptedInvoker {
    drafts: std::sync::Mutex<u32>,
}

#[async_trait]
impl AgentInvoker for ScriptedInvoker {
    async fn invoke(&self, agent_id: &str, input: Value) -> Result<Value, String> {
        match agent_id {
            "drafter" => Ok(json!({ "draft": "Grew up in Ohio, moved west in 1962." })),
            "critic" => {
                let mut drafts = self.drafts.lock().unwrap();
                *drafts += 1;
                if *drafts < 2 {
                    Err("rejected: needs more detail about the move".to_string())
                } else {
                    Ok(input)
                }
            }
            other => Err(format!("unknown agent: {other}")),
        }
    }
}

#[tokio::test]
async fn pipeline_retries_after_a_critique_rejection_then_succeeds() {
    let invoker = Arc::new(ScriptedInvoker {
        drafts: std::sync::Mutex::new(0),
    });
    let orchestrator = Orchestrator::new(invoker);

    let pipeline = Pipeline::new(
        "biography-chapter",
        vec![
            PipelineStage::new("draft", "drafter"),
            PipelineStage::new("critique", "critic")
                .as_critique()
                .with_failure_policy(PipelineFailurePolicy::Retry, 3),
        ],
    );

    let result = orchestrator
        .run(&pipeline, json!({ "topic": "childhood" }), 0)
        .await
        .expect("pipeline should eventually succeed after a retry");

    assert!(!result.aborted);
    assert_eq!(result.outcomes.len(), 2);
    assert!(result.outcomes[1].attempts >= 2, "critic should have retried once after rejection");
}

#[tokio::test]
async fn pipeline_aborts_when_a_stage_has_no_retry_budget() {
    struct AlwaysFails;

    #[async_trait]
    impl AgentInvoker for AlwaysFails {
        async fn invoke(&self, _agent_id: &str, _input: Value) -> Result<Value, String> {
            Err("transcription service unavailable".to_string())
        }
    }

    let orchestrator = Orchestrator::new(Arc::new(AlwaysFails));
    let pipeline = Pipeline::new(
        "transcribe-and-summarize",
        vec![
            PipelineStage::new("transcribe", "transcriber")
                .with_failure_policy(PipelineFailurePolicy::Abort, 0),
        ],
    );

    let error = orchestrator
        .run(&pipeline, json!({ "audio": "clip.wav" }), 0)
        .await
        .expect_err("a stage with no retry budget and Abort policy must fail the pipeline");

    match error {
        OrchestratorError::StageFailed { stage, .. } => assert_eq!(stage, "transcribe"),
        other => panic!("expected StageFailed, got {other:?}"),
    }
}
