//! Raconteur AI - the agentic reasoning runtime.
//!
//! This crate provides:
//! - Core tool abstractions (Tool, ToolError, ToolRegistry, SecurityGate, etc.)
//! - The Enhanced ReAct reasoning runtime (state machine, tool contracts,
//!   model router, orchestrator, wellbeing guard, session continuity,
//!   self-improvement miner, context budget manager — see [`agent::reasoning`])
//! - Multi-provider LLM client (Anthropic, OpenAI-compatible)
//! - A sliding-window working memory and embedding-backed long-term memory

pub mod agent;
pub mod cache;
pub mod embedding;
pub mod error;
pub mod http_client;
pub mod llm;
pub mod memory;
pub mod steer;
pub mod text_utils;
pub mod tools;

pub use agent::reasoning::{
    AgentInvoker, AgentMessage, ApprovalGate, AuditEntry, Budget, Complexity, ContentSource,
    ContextBudgetManager, ContractRegistry, CritiqueResult, DetectedConcern, DetectedScam,
    EnhancedReActRunner, ExecutionRecord, FailurePolicy, HaltReason, LearnedPattern, MessageKind,
    ModelCandidate, ObservationKind, OptimizedContext, Orchestrator, OrchestratorError, Permission,
    Phase, Pipeline, PipelineFailurePolicy, PipelineResult, PipelineStage, PlannedStep,
    ProcessedObservation, ReasoningContext, RoutingBudget, RoutingDecision, RunOutcome,
    RunnerConfig, SelfImprovementMiner, SessionContinuityCache, SessionSnapshot, Severity,
    StateMachineContext, StateSnapshot, StepResult, Suggestion, ToolCallError, ToolContract,
    ToolContractMeta, ToolErrorCode, ToolExecutionContext, ToolStats, Trace, TraceSpan, Trigger,
    WellbeingAssessment, WellbeingGuard, route,
};
pub use error::{AiError, Result};
pub use llm::{
    AnthropicClient, DefaultLlmClientFactory, LlmClient, LlmClientFactory, LlmProvider,
    LlmSwitcherImpl, Message, MockLlmClient, MockStep, MockStepKind, ModelSpec, OpenAIClient,
    Role, SwappableLlm,
};
pub use raconteur_traits::network::{NetworkAllowlist, NetworkEcosystem};
pub use raconteur_traits::security::{SecurityDecision, SecurityGate, ToolAction};

/// Re-exported so downstream crates can also spell these as
/// `raconteur_ai::security::*`.
pub mod security {
    pub use raconteur_traits::security::{SecurityDecision, SecurityGate, ToolAction};
}
pub use steer::{SteerMessage, SteerSource};
pub use tools::{
    RateLimitWrapper, SecretResolver, Tool, ToolError, ToolErrorCategory, ToolOutput, ToolRegistry,
    ToolSchema, ToolWrapper, Toolset, ToolsetContext, WrappedTool, check_security,
};
