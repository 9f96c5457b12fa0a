//! Enhanced ReAct reasoning runtime: a state-machine-driven agent runner,
//! a typed tool contract pipeline, a complexity-aware model router, a
//! multi-agent orchestrator, a wellbeing/scam guard, a session continuity
//! cache, a self-improvement pattern miner, and a context budget manager.
//!
//! This module composes around the existing `LlmClient` port and the
//! existing `Tool`/`ToolRegistry` machinery elsewhere in this crate rather
//! than replacing them; see `runner::EnhancedReActRunner` for the
//! composition root.

pub mod contracts;
pub mod context_budget;
pub mod fsm;
pub mod orchestrator;
pub mod router;
pub mod runner;
pub mod self_improvement;
pub mod session_continuity;
pub mod types;
pub mod wellbeing;

pub use contracts::{
    AuditEntry, ContractRegistry, Permission, ToolCallError, ToolContract, ToolContractMeta,
    ToolErrorCode, ToolExecutionContext, ToolStats,
};
pub use context_budget::{ContentSource, ContextBudgetManager, OptimizedContext};
pub use fsm::{Budget, HaltReason, Phase, StateMachineContext, StateSnapshot, Trigger};
pub use orchestrator::{
    AgentInvoker, AgentMessage, ApprovalGate, CritiqueResult, FailurePolicy as PipelineFailurePolicy,
    MessageKind, Orchestrator, OrchestratorError, Pipeline, PipelineResult, PipelineStage,
};
pub use router::{Complexity, ModelCandidate, RoutingBudget, RoutingDecision, route};
pub use raconteur_telemetry::{Trace, TraceSpan};
pub use runner::{EnhancedReActRunner, RunOutcome, RunnerConfig};
pub use self_improvement::{ExecutionRecord, LearnedPattern, SelfImprovementMiner, Suggestion};
pub use session_continuity::{SessionContinuityCache, SessionSnapshot};
pub use types::{
    AgentContext as ReasoningContext, FailurePolicy, ObservationKind, PlannedStep,
    ProcessedObservation, StepResult,
};
pub use wellbeing::{DetectedConcern, DetectedScam, Severity, WellbeingAssessment, WellbeingGuard};
