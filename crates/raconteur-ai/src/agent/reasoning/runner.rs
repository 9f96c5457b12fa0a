//! Enhanced ReAct runner (§4.2): the composition root that drives the state
//! machine through intent recognition, decomposition, planning, execution,
//! observation, reflection, replanning, and synthesis, wiring in the
//! wellbeing guard, session continuity cache, context budget manager, model
//! router, tool contract registry, and self-improvement miner along the way.
//!
//! Grounded on `agent::executor::AgentExecutor`'s `run()` loop (LLM call,
//! inspect for tool calls, execute, append observation, repeat until a plain
//! text answer) for the overall shape, generalized to route through explicit
//! FSM phases instead of a single `while !done` loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use raconteur_telemetry::{SpanStatus, Trace, Tracer};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info_span, warn};

use crate::llm::client::{CompletionRequest, LlmClient, Message};

use super::context_budget::{ContentSource, ContextBudgetManager};
use super::contracts::{ContractRegistry, ToolExecutionContext};
use super::fsm::{Budget, HaltReason, Phase, StateMachineContext, Trigger, check_budget_limits};
use super::router::{Complexity, ModelCandidate, RoutingBudget, RoutingDecision, route};
use super::self_improvement::{ExecutionRecord, Outcome, SelfImprovementMiner};
use super::session_continuity::SessionContinuityCache;
use super::types::{
    AgentContext, FINAL_ANSWER_ACTION, ObservationKind, PlannedStep, ProcessedObservation,
    ReactStep, RecognizedIntent, StepResult,
};
use super::wellbeing::{DetectedScam, WellbeingAssessment, WellbeingGuard};

/// Rough token estimate for text we never got a provider-reported usage
/// figure for (§4.2 Executing: "approx input tokens = prompt chars / 4").
fn approx_tokens(text: &str) -> u64 {
    (text.len() as u64 / 4).max(1)
}

/// Fallback completion-token estimate when a step's usage can't be taken
/// from the provider response (§4.2 Executing).
const FALLBACK_OUTPUT_TOKENS: u64 = 200;

/// Parses `text` as JSON, tolerating a model that wrapped the object in
/// prose by looking for the outermost `{...}` span.
fn parse_json_loose<T: DeserializeOwned>(text: &str) -> Option<T> {
    if let Ok(value) = serde_json::from_str::<T>(text.trim()) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Calls `client` with `messages` and parses the response as JSON `T`. On a
/// parse failure, re-prompts once with an appended "respond with JSON only"
/// directive (§7 Error Handling, Parse category); a second failure is
/// surfaced as an `Err` for the caller to map onto the relevant `*_ERROR`
/// trigger.
async fn complete_json<T: DeserializeOwned>(
    client: &Arc<dyn LlmClient>,
    mut messages: Vec<Message>,
) -> Result<T, String> {
    let request = CompletionRequest::new(messages.clone());
    let response = client.complete(request).await.map_err(|e| e.to_string())?;
    let text = response.content.unwrap_or_default();
    if let Some(parsed) = parse_json_loose(&text) {
        return Ok(parsed);
    }

    messages.push(Message::user(
        "Respond with JSON only, matching the requested shape exactly.",
    ));
    let retry = CompletionRequest::new(messages);
    let retry_response = client.complete(retry).await.map_err(|e| e.to_string())?;
    let retry_text = retry_response.content.unwrap_or_default();
    parse_json_loose(&retry_text)
        .ok_or_else(|| "model did not return parseable JSON after one retry".to_string())
}

/// Tunable limits and routing inputs for one runner instance. Shared across
/// runs; per-run state lives in `StateMachineContext`, never here.
#[derive(Clone)]
pub struct RunnerConfig {
    pub budget: Budget,
    pub max_replan_attempts: u32,
    pub context_token_cap: usize,
    pub routing_budget: RoutingBudget,
    pub model_candidates: Vec<ModelCandidate>,
    pub complexity_hint: Option<Complexity>,
    /// Skip the model round-trip for intent recognition entirely when the
    /// goal is shorter than `simple_query_threshold` (§6 `skipIntentForSimple`).
    pub skip_intent_for_simple: bool,
    /// Goal length (chars) below which intent recognition is skipped (§6
    /// `simpleQueryThreshold`, default 50).
    pub simple_query_threshold: usize,
    /// Chain-of-thought is truncated to this length before being stored on
    /// the step result; the untruncated version still reaches the trace
    /// (§6 `maxThoughtLength`, default 1000).
    pub max_thought_length: usize,
    /// Enables wellbeing-gated synthesis post-processing: empathy
    /// adaptation, explanation adjuncts, cognitive adaptation, and
    /// session-continuity topic recording (§6 `enableCompanionFeatures`).
    pub enable_companion_features: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            budget: Budget::default(),
            max_replan_attempts: 2,
            context_token_cap: 4_000,
            routing_budget: RoutingBudget {
                remaining_cost_cents: 100,
                per_request_cap_cents: 20,
                min_quality: 0.0,
            },
            model_candidates: Vec::new(),
            complexity_hint: None,
            skip_intent_for_simple: true,
            simple_query_threshold: 50,
            max_thought_length: 1000,
            enable_companion_features: false,
        }
    }
}

impl RunnerConfig {
    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_max_replan_attempts(mut self, attempts: u32) -> Self {
        self.max_replan_attempts = attempts;
        self
    }

    pub fn with_context_token_cap(mut self, cap: usize) -> Self {
        self.context_token_cap = cap;
        self
    }

    pub fn with_routing_budget(mut self, budget: RoutingBudget) -> Self {
        self.routing_budget = budget;
        self
    }

    pub fn with_model_candidates(mut self, candidates: Vec<ModelCandidate>) -> Self {
        self.model_candidates = candidates;
        self
    }

    pub fn with_complexity_hint(mut self, hint: Complexity) -> Self {
        self.complexity_hint = Some(hint);
        self
    }

    pub fn with_skip_intent_for_simple(mut self, skip: bool) -> Self {
        self.skip_intent_for_simple = skip;
        self
    }

    pub fn with_simple_query_threshold(mut self, threshold: usize) -> Self {
        self.simple_query_threshold = threshold;
        self
    }

    pub fn with_max_thought_length(mut self, length: usize) -> Self {
        self.max_thought_length = length;
        self
    }

    pub fn with_companion_features(mut self, enabled: bool) -> Self {
        self.enable_companion_features = enabled;
        self
    }
}

/// The result of one `run()` call.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub final_answer: Option<String>,
    pub phase: Phase,
    pub halt_reason: Option<HaltReason>,
    pub steps_taken: usize,
    pub total_tokens: u64,
    pub total_cost_cents: u64,
    pub replan_count: u32,
    pub wellbeing: Option<WellbeingAssessment>,
    pub scam: Option<DetectedScam>,
    pub routing_decisions: Vec<RoutingDecision>,
    pub observations: Vec<ProcessedObservation>,
    pub trace: Trace,
}

impl RunOutcome {
    fn short_circuit(
        answer: impl Into<String>,
        wellbeing: Option<WellbeingAssessment>,
        scam: Option<DetectedScam>,
        trace: Trace,
    ) -> Self {
        Self {
            final_answer: Some(answer.into()),
            phase: Phase::Done,
            halt_reason: None,
            steps_taken: 0,
            total_tokens: 0,
            total_cost_cents: 0,
            replan_count: 0,
            wellbeing,
            scam,
            routing_decisions: Vec::new(),
            observations: Vec::new(),
            trace,
        }
    }
}

/// Composition root of the reasoning runtime. Owns no per-run state; every
/// `run()` call is independent and safe to invoke concurrently from multiple
/// callers sharing the same `Arc<EnhancedReActRunner>`.
pub struct EnhancedReActRunner {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ContractRegistry>,
    wellbeing: Arc<WellbeingGuard>,
    session_cache: Arc<SessionContinuityCache>,
    miner: Arc<SelfImprovementMiner>,
    config: RunnerConfig,
    /// Additional model clients the router's decisions can actually select
    /// between. `llm` is always the fallback when a decision names a model
    /// not present here (or when the pool is empty).
    model_pool: HashMap<String, Arc<dyn LlmClient>>,
}

impl EnhancedReActRunner {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<ContractRegistry>) -> Self {
        Self {
            llm,
            tools,
            wellbeing: Arc::new(WellbeingGuard::new()),
            session_cache: Arc::new(SessionContinuityCache::local_only()),
            miner: Arc::new(SelfImprovementMiner::new()),
            config: RunnerConfig::default(),
            model_pool: HashMap::new(),
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Wires in the clients a [`RoutingDecision`]'s `model_id` can select
    /// between. Without this, every decision still runs against the
    /// constructor's single `llm` client.
    pub fn with_model_pool(mut self, pool: HashMap<String, Arc<dyn LlmClient>>) -> Self {
        self.model_pool = pool;
        self
    }

    fn client_for(&self, model_id: &str) -> &Arc<dyn LlmClient> {
        self.model_pool.get(model_id).unwrap_or(&self.llm)
    }

    pub fn with_wellbeing_guard(mut self, guard: Arc<WellbeingGuard>) -> Self {
        self.wellbeing = guard;
        self
    }

    pub fn with_session_cache(mut self, cache: Arc<SessionContinuityCache>) -> Self {
        self.session_cache = cache;
        self
    }

    pub fn with_self_improvement_miner(mut self, miner: Arc<SelfImprovementMiner>) -> Self {
        self.miner = miner;
        self
    }

    /// Run the full reasoning lifecycle for `goal` within `ctx`.
    pub async fn run(&self, goal: &str, ctx: &AgentContext) -> RunOutcome {
        let span = info_span!("agent_run", user_id = %ctx.user_id, session_id = %ctx.session_id);
        let _enter = span.enter();

        let mut tracer = Tracer::new();
        tracer.start_span(raconteur_telemetry::SPAN_AGENT_RUN);

        let wellbeing = self.wellbeing.assess(goal, &[]);
        if wellbeing.requires_immediate_action {
            warn!(severity = ?wellbeing.overall_severity, "wellbeing guard triggered an immediate-action response");
            let answer = wellbeing.suggested_response.clone();
            tracer.end_span(raconteur_telemetry::SPAN_AGENT_RUN, SpanStatus::Ok, None);
            return RunOutcome::short_circuit(answer, Some(wellbeing), None, tracer.finish());
        }

        if let Some(scam) = self.wellbeing.detect_scam(goal) {
            warn!(category = ?scam.category, "scam guard short-circuited the run");
            let response = self.wellbeing.scam_response(&scam);
            tracer.end_span(raconteur_telemetry::SPAN_AGENT_RUN, SpanStatus::Ok, None);
            return RunOutcome::short_circuit(response, Some(wellbeing), Some(scam), tracer.finish());
        }

        if !ctx.session_id.is_empty()
            && let Some(snapshot) = self.session_cache.load_session(&ctx.user_id, &ctx.session_id).await
        {
            debug!(turns = snapshot.last_turns.len(), "long_term_memory_retrieved");
            tracer.event(
                "long_term_memory_retrieved",
                serde_json::json!({ "turns": snapshot.last_turns.len() }),
            );
        }

        let mut state = StateMachineContext::new(goal, self.config.max_replan_attempts);
        state.transition(Trigger::Start, &self.config.budget);

        let mut routing_decisions = Vec::new();
        let mut observations: Vec<ProcessedObservation> = Vec::new();
        let mut conversation: Vec<Message> = Vec::new();
        let mut final_text: Option<String> = None;
        let mut synthesis_already_failed = false;

        'lifecycle: loop {
            if state.phase().is_terminal() {
                break 'lifecycle;
            }

            match state.phase() {
                Phase::RecognizingIntent => {
                    let _span = info_span!("intent_recognition").entered();
                    tracer.start_span(raconteur_telemetry::SPAN_INTENT_RECOGNITION);

                    if self.config.skip_intent_for_simple && goal.len() < self.config.simple_query_threshold {
                        debug!("intent_recognition skipped for short goal");
                        tracer.event(
                            "intent_recognized",
                            serde_json::json!({ "label": "GREETING", "fast_tracked": true }),
                        );
                        state.transition(Trigger::SimpleIntent, &self.config.budget);
                        tracer.end_span(raconteur_telemetry::SPAN_INTENT_RECOGNITION, SpanStatus::Ok, None);
                        continue 'lifecycle;
                    }

                    let decision = route(
                        goal,
                        Some(Complexity::Classification),
                        self.config.routing_budget,
                        &self.config.model_candidates,
                    );
                    let client = self.client_for(&decision.model_id).clone();
                    routing_decisions.push(decision);

                    let prompt = vec![
                        Message::system(
                            "Classify the user's goal. Respond with JSON only: \
                             {\"label\": string, \"confidence\": number between 0 and 1}. \
                             Use label \"GREETING\" for small talk or simple pleasantries.",
                        ),
                        Message::user(goal),
                    ];
                    state.record_usage(approx_tokens(goal) + FALLBACK_OUTPUT_TOKENS, 0);

                    match complete_json::<RecognizedIntent>(&client, prompt).await {
                        Ok(intent) => {
                            debug!(label = %intent.label, confidence = intent.confidence, "intent_recognized");
                            tracer.event(
                                "intent_recognized",
                                serde_json::json!({ "label": intent.label, "confidence": intent.confidence }),
                            );
                            if intent.label.eq_ignore_ascii_case("greeting") || intent.confidence < 0.3 {
                                state.transition(Trigger::SimpleIntent, &self.config.budget);
                            } else {
                                state.transition(Trigger::IntentRecognized, &self.config.budget);
                            }
                            tracer.end_span(raconteur_telemetry::SPAN_INTENT_RECOGNITION, SpanStatus::Ok, None);
                        }
                        Err(e) => {
                            warn!(error = %e, "intent recognition failed to parse");
                            state.set_last_error(e.clone());
                            tracer.end_span(
                                raconteur_telemetry::SPAN_INTENT_RECOGNITION,
                                SpanStatus::Error,
                                Some(e),
                            );
                            state.transition(Trigger::IntentError, &self.config.budget);
                        }
                    }
                }
                Phase::DecomposingTask => {
                    let _span = info_span!("task_decomposition").entered();
                    tracer.start_span(raconteur_telemetry::SPAN_TASK_DECOMPOSITION);
                    state.set_intermediate_result(
                        "plan",
                        serde_json::json!([PlannedStep::react_loop("step-1")]),
                    );
                    debug!("task_decomposed");
                    tracer.event("task_decomposed", serde_json::json!({}));
                    state.transition(Trigger::TaskDecomposed, &self.config.budget);
                    tracer.end_span(raconteur_telemetry::SPAN_TASK_DECOMPOSITION, SpanStatus::Ok, None);
                }
                Phase::Planning => {
                    let _span = info_span!("planning").entered();
                    tracer.start_span(raconteur_telemetry::SPAN_PLANNING);
                    let mut manager = ContextBudgetManager::new();
                    manager.add(ContentSource::new("goal", "goal", goal, 100).required());
                    for (i, msg) in ctx.recent_messages.iter().enumerate() {
                        manager.add(ContentSource::new(format!("history-{i}"), "history", &msg.content, 60));
                    }
                    for (i, mem) in ctx.retrieved_memories.iter().enumerate() {
                        manager.add(ContentSource::new(format!("memory-{i}"), "memory", &mem.text, 70));
                    }
                    let optimized = manager.optimize(self.config.context_token_cap);
                    debug!(tokens = optimized.total_tokens, "context_stabilized");
                    tracer.event(
                        "context_stabilized",
                        serde_json::json!({ "tokens": optimized.total_tokens }),
                    );
                    conversation.push(Message::system(optimized.content));
                    conversation.push(Message::user(goal));
                    state.transition(Trigger::PlanReady, &self.config.budget);
                    tracer.end_span(raconteur_telemetry::SPAN_PLANNING, SpanStatus::Ok, None);
                }
                Phase::Executing => {
                    if let Some((_, reason)) = check_budget_limits(&state, &self.config.budget) {
                        state.set_halt_reason(reason);
                        break 'lifecycle;
                    }
                    let _span = info_span!("execute_step", step = state.steps.len()).entered();
                    tracer.start_span(raconteur_telemetry::SPAN_EXECUTE_STEP);

                    let decision = route(
                        goal,
                        Some(Complexity::Reasoning),
                        self.config.routing_budget,
                        &self.config.model_candidates,
                    );
                    let client = self.client_for(&decision.model_id).clone();
                    routing_decisions.push(decision);

                    let step = PlannedStep::react_loop(format!("step-{}", state.steps.len() + 1));
                    let started = Instant::now();

                    // ReAct prompt: {system prompt, tool descriptions, context, goal, last 5 steps}.
                    let tool_descriptions = self.tools.descriptions();
                    let past_steps: Vec<serde_json::Value> = state
                        .steps
                        .iter()
                        .rev()
                        .take(5)
                        .map(|(s, r)| serde_json::json!({ "action": s.action, "result": r.output }))
                        .collect::<Vec<_>>()
                        .into_iter()
                        .rev()
                        .collect();
                    let turn = serde_json::json!({
                        "goal": goal,
                        "toolDescriptions": tool_descriptions,
                        "pastSteps": past_steps,
                    })
                    .to_string();

                    let mut react_messages = conversation.clone();
                    react_messages.push(Message::system(
                        "You are in a ReAct loop. Respond with JSON only: \
                         {\"thought\": string, \"action\": string, \"actionInput\": object}. \
                         Use action \"Final Answer\" with actionInput {\"text\": string} once you're done.",
                    ));
                    react_messages.push(Message::user(turn.clone()));
                    let input_tokens = approx_tokens(&turn);
                    state.record_usage(input_tokens + FALLBACK_OUTPUT_TOKENS, 0);

                    match complete_json::<ReactStep>(&client, react_messages).await {
                        Ok(react_step) => {
                            let duration_ms = started.elapsed().as_millis() as u64;
                            let stored_thought: String =
                                react_step.thought.chars().take(self.config.max_thought_length).collect();
                            let trace = serde_json::json!({
                                "thought": stored_thought,
                                "thoughtFull": react_step.thought,
                                "action": react_step.action,
                            });
                            debug!(action = %react_step.action, "react_step");

                            if react_step.action == FINAL_ANSWER_ACTION {
                                let text = react_step
                                    .action_input
                                    .get("text")
                                    .and_then(Value::as_str)
                                    .map(str::to_string)
                                    .unwrap_or_else(|| react_step.action_input.to_string());
                                final_text = Some(text.clone());
                                conversation.push(Message::assistant(text.clone()));
                                let mut result = StepResult::ok(
                                    step.id.clone(),
                                    serde_json::json!({ "text": text }),
                                    input_tokens + FALLBACK_OUTPUT_TOKENS,
                                    0,
                                );
                                result.duration_ms = duration_ms;
                                result.trace = Some(trace);
                                state.add_step(step, result);
                                state.transition(Trigger::StepComplete, &self.config.budget);
                                let observation =
                                    ProcessedObservation::new(ObservationKind::Confirmation, "final answer produced", 0.95);
                                observations.push(observation);
                                state.transition(Trigger::PlanComplete, &self.config.budget);
                                tracer.end_span(raconteur_telemetry::SPAN_EXECUTE_STEP, SpanStatus::Ok, None);
                                continue 'lifecycle;
                            }

                            let tool_span = info_span!("tool_execution", tool = %react_step.action).entered();
                            tracer.start_span(raconteur_telemetry::SPAN_TOOL_EXECUTION);
                            let tool_ctx = ToolExecutionContext {
                                user_id: ctx.user_id.clone(),
                                session_id: ctx.session_id.clone(),
                                agent_id: "enhanced-react-runner".to_string(),
                                request_id: step.id.clone(),
                                permission_overrides: Default::default(),
                                dry_run: false,
                            };
                            let tool_result = self
                                .tools
                                .execute(&react_step.action, react_step.action_input.clone(), &tool_ctx)
                                .await;
                            drop(tool_span);

                            let (mut result, outcome, observation) = match tool_result {
                                Ok(value) => {
                                    conversation.push(Message::assistant(format!(
                                        "Thought: {}\nAction: {}",
                                        react_step.thought, react_step.action
                                    )));
                                    conversation.push(Message::user(format!("Observation: {value}")));
                                    debug!("tool_result");
                                    tracer.event(
                                        "tool_result",
                                        serde_json::json!({ "tool": react_step.action, "success": true }),
                                    );
                                    tracer.end_span(raconteur_telemetry::SPAN_TOOL_EXECUTION, SpanStatus::Ok, None);
                                    (
                                        StepResult::ok(step.id.clone(), value.clone(), input_tokens + FALLBACK_OUTPUT_TOKENS, 0),
                                        Outcome::Success,
                                        ProcessedObservation::new(ObservationKind::Information, "tool call succeeded", 0.9)
                                            .with_raw(value),
                                    )
                                }
                                Err(tool_err) => {
                                    let message = format!("Error: {}", tool_err.message);
                                    conversation.push(Message::user(format!("Observation: {message}")));
                                    tracer.event(
                                        "tool_result",
                                        serde_json::json!({ "tool": react_step.action, "success": false }),
                                    );
                                    tracer.end_span(
                                        raconteur_telemetry::SPAN_TOOL_EXECUTION,
                                        SpanStatus::Error,
                                        Some(message.clone()),
                                    );
                                    (
                                        StepResult::failed(step.id.clone(), message.clone()),
                                        Outcome::Failure,
                                        ProcessedObservation::new(ObservationKind::Error, message, 0.9).invalidating(),
                                    )
                                }
                            };
                            result.duration_ms = duration_ms;
                            result.trace = Some(trace);

                            self.miner.record(ExecutionRecord {
                                agent_name: "enhanced-react-runner".to_string(),
                                tool_name: react_step.action.clone(),
                                outcome,
                                duration_ms,
                                tokens: input_tokens + FALLBACK_OUTPUT_TOKENS,
                                cost_cents: 0,
                                satisfaction: None,
                                error: result.error.clone(),
                                timestamp: chrono::Utc::now(),
                            });
                            debug!("interaction_learned");
                            tracer.event("interaction_learned", serde_json::json!({ "tool": react_step.action }));

                            state.add_step(step, result);
                            state.transition(Trigger::StepComplete, &self.config.budget);
                            observations.push(observation.clone());
                            self.observe(&mut state, &mut tracer, observation);
                        }
                        Err(e) => {
                            state.add_step(step.clone(), StepResult::failed(step.id.clone(), e.clone()));
                            state.set_last_error(e.clone());
                            tracer.end_span(raconteur_telemetry::SPAN_EXECUTE_STEP, SpanStatus::Error, Some(e));
                            state.transition(Trigger::StepError, &self.config.budget);
                            continue 'lifecycle;
                        }
                    }
                    tracer.end_span(raconteur_telemetry::SPAN_EXECUTE_STEP, SpanStatus::Ok, None);
                }
                Phase::Replanning => {
                    let _span = info_span!("replanning").entered();
                    tracer.start_span(raconteur_telemetry::SPAN_REPLANNING);
                    state.record_replan();
                    state.transition(Trigger::ReplanReady, &self.config.budget);
                    tracer.end_span(raconteur_telemetry::SPAN_REPLANNING, SpanStatus::Ok, None);
                }
                Phase::Reflecting => {
                    let _span = info_span!("reflection").entered();
                    tracer.start_span(raconteur_telemetry::SPAN_REFLECTION);
                    if final_text.is_some() {
                        state.transition(Trigger::ReflectionComplete, &self.config.budget);
                    } else {
                        state.transition(Trigger::ReflectionInsufficient, &self.config.budget);
                    }
                    tracer.end_span(raconteur_telemetry::SPAN_REFLECTION, SpanStatus::Ok, None);
                }
                Phase::Synthesizing => {
                    let _span = info_span!("synthesis").entered();
                    tracer.start_span(raconteur_telemetry::SPAN_SYNTHESIS);
                    match &final_text {
                        Some(text) => {
                            let answer = self.postprocess_synthesis(text.clone(), &wellbeing, goal, ctx).await;
                            state.set_final_answer(answer);
                            state.transition(Trigger::AnswerReady, &self.config.budget);
                            tracer.end_span(raconteur_telemetry::SPAN_SYNTHESIS, SpanStatus::Ok, None);
                        }
                        None => {
                            let decision = route(
                                goal,
                                Some(Complexity::Summarization),
                                self.config.routing_budget,
                                &self.config.model_candidates,
                            );
                            let client = self.client_for(&decision.model_id).clone();
                            routing_decisions.push(decision);

                            let mut synth_messages = conversation.clone();
                            synth_messages.push(Message::system(
                                "Synthesize a final answer to the user's goal from the conversation \
                                 and tool observations gathered so far.",
                            ));
                            let request = CompletionRequest::new(synth_messages);
                            match client.complete(request).await {
                                Ok(response) => {
                                    let text = response.content.unwrap_or_else(|| "I wasn't able to finish that.".to_string());
                                    let answer = self.postprocess_synthesis(text, &wellbeing, goal, ctx).await;
                                    state.set_final_answer(answer);
                                    state.transition(Trigger::AnswerReady, &self.config.budget);
                                    tracer.end_span(raconteur_telemetry::SPAN_SYNTHESIS, SpanStatus::Ok, None);
                                }
                                Err(e) if !synthesis_already_failed => {
                                    synthesis_already_failed = true;
                                    state.set_last_error(e.to_string());
                                    tracer.end_span(
                                        raconteur_telemetry::SPAN_SYNTHESIS,
                                        SpanStatus::Error,
                                        Some(e.to_string()),
                                    );
                                    state.transition(Trigger::SynthesisError, &self.config.budget);
                                }
                                Err(e) => {
                                    state.set_last_error(e.to_string());
                                    tracer.end_span(
                                        raconteur_telemetry::SPAN_SYNTHESIS,
                                        SpanStatus::Error,
                                        Some(e.to_string()),
                                    );
                                    state.transition(Trigger::Unrecoverable, &self.config.budget);
                                }
                            }
                        }
                    }
                }
                Phase::Error => {
                    if synthesis_already_failed {
                        state.transition(Trigger::Unrecoverable, &self.config.budget);
                    } else {
                        state.transition(Trigger::RecoverWithFallback, &self.config.budget);
                    }
                }
                Phase::Idle | Phase::Done | Phase::Halted => break 'lifecycle,
            }
        }

        tracer.end_span(
            raconteur_telemetry::SPAN_AGENT_RUN,
            if state.phase() == Phase::Error { SpanStatus::Error } else { SpanStatus::Ok },
            None,
        );

        if !ctx.session_id.is_empty() {
            let mut turns = ctx.recent_messages.iter().map(|m| m.content.clone()).collect::<Vec<_>>();
            if let Some(answer) = state.final_answer.clone().or_else(|| final_text.clone()) {
                turns.push(answer);
            }
            self.session_cache
                .save_session(&super::session_continuity::SessionSnapshot {
                    session_id: ctx.session_id.clone(),
                    user_id: ctx.user_id.clone(),
                    last_turns: turns,
                    updated_at: chrono::Utc::now(),
                })
                .await;
        }

        RunOutcome {
            final_answer: state.final_answer.clone().or(final_text),
            phase: state.phase(),
            halt_reason: state.halt_reason,
            steps_taken: state.steps.len(),
            total_tokens: state.total_tokens,
            total_cost_cents: state.total_cost_cents,
            replan_count: state.replan_count,
            wellbeing: Some(wellbeing),
            scam: None,
            routing_decisions,
            observations,
            trace: tracer.finish(),
        }
    }

    /// Wellbeing-gated synthesis post-processing (§4.2 Synthesis, §6
    /// `enableCompanionFeatures`): empathy adaptation, explanation adjunct,
    /// cognitive adaptation, then records the goal as a session-continuity
    /// topic. A no-op passthrough when companion features are disabled.
    async fn postprocess_synthesis(
        &self,
        answer: String,
        wellbeing: &WellbeingAssessment,
        goal: &str,
        ctx: &AgentContext,
    ) -> String {
        if !self.config.enable_companion_features {
            return answer;
        }
        let answer = self.wellbeing.adapt_with_empathy(&answer, wellbeing);
        let answer = self.wellbeing.add_explanation_adjunct(&answer, wellbeing);
        let answer = self.wellbeing.adapt_for_cognition(&answer, wellbeing);
        if !ctx.session_id.is_empty() {
            let topic: String = goal.chars().take(80).collect();
            self.session_cache.record_topic(&ctx.user_id, &topic).await;
        }
        answer
    }

    /// Observation-processing handler (§4.2): decides whether the
    /// observation invalidates the current plan or lets it continue.
    fn observe(&self, state: &mut StateMachineContext, tracer: &mut Tracer, observation: ProcessedObservation) {
        let _span = info_span!("observation_processing").entered();
        tracer.start_span(raconteur_telemetry::SPAN_OBSERVATION_PROCESSING);
        if observation.invalidates_plan && state.replan_count < state.max_replan_attempts {
            state.transition(Trigger::ObservationInvalidates, &self.config.budget);
        } else {
            state.transition(Trigger::ContinuePlan, &self.config.budget);
        }
        tracer.end_span(raconteur_telemetry::SPAN_OBSERVATION_PROCESSING, SpanStatus::Ok, None);
    }
}
