//! Agent state machine (§4.1).
//!
//! A static `(from, trigger) -> to` transition table with optional guards,
//! the same shape as a hand-rolled transition table but generalized from a
//! binary "running/done" teacher concept (`agent::state::AgentStatus`) into
//! the spec's twelve-phase lifecycle. `StateMachineContext` is the owned,
//! mutation-gated counterpart of the teacher's `ResourceTracker` +
//! `ExecutionStep` list combined into one run-scoped struct.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::{PlannedStep, ProcessedObservation, StepResult};

/// A phase of the agent state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Idle,
    RecognizingIntent,
    DecomposingTask,
    Planning,
    Executing,
    Observing,
    Reflecting,
    Synthesizing,
    Replanning,
    Done,
    Halted,
    Error,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Halted | Phase::Error)
    }
}

/// Reason a run was halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HaltReason {
    MaxSteps,
    Timeout,
    TokenBudget,
    CostBudget,
    ReplanLimit,
    UserInterrupt,
    Unrecoverable,
}

/// A trigger fired at the runner's state handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trigger {
    Start,
    SimpleIntent,
    IntentRecognized,
    IntentError,
    TaskDecomposed,
    PlanReady,
    StepComplete,
    StepError,
    PlanComplete,
    ObservationInvalidates,
    ContinuePlan,
    ReflectionComplete,
    ReflectionInsufficient,
    ReplanReady,
    RecoverWithFallback,
    Unrecoverable,
    SynthesisError,
    AnswerReady,
    UserInterrupt,
}

/// The four budget guards, evaluated in this fixed order (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetGuard {
    MaxSteps,
    Timeout,
    TokenBudget,
    CostBudget,
}

/// The (max steps, max wall clock, max tokens, max cost) quadruple.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Budget {
    pub max_steps: usize,
    pub timeout_ms: u64,
    pub token_budget: u64,
    pub cost_budget_cents: u64,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_steps: 5,
            timeout_ms: 30_000,
            token_budget: 8_000,
            cost_budget_cents: 20,
        }
    }
}

type Guard = fn(&StateMachineContext, &Budget) -> bool;

struct TransitionRow {
    from: Phase,
    trigger: Trigger,
    to: Phase,
    guard: Option<Guard>,
}

fn guard_replan_available(ctx: &StateMachineContext, _budget: &Budget) -> bool {
    ctx.replan_count < ctx.max_replan_attempts
}

fn guard_replan_exhausted(ctx: &StateMachineContext, budget: &Budget) -> bool {
    !guard_replan_available(ctx, budget)
}

/// Static transition table, checked top-to-bottom; the first matching row
/// whose guard (if any) passes wins.
fn table() -> &'static [TransitionRow] {
    const ROWS: &[TransitionRow] = &[
        TransitionRow { from: Phase::Idle, trigger: Trigger::Start, to: Phase::RecognizingIntent, guard: None },
        TransitionRow { from: Phase::RecognizingIntent, trigger: Trigger::SimpleIntent, to: Phase::Synthesizing, guard: None },
        TransitionRow { from: Phase::RecognizingIntent, trigger: Trigger::IntentRecognized, to: Phase::DecomposingTask, guard: None },
        TransitionRow { from: Phase::RecognizingIntent, trigger: Trigger::IntentError, to: Phase::Error, guard: None },
        TransitionRow { from: Phase::DecomposingTask, trigger: Trigger::TaskDecomposed, to: Phase::Planning, guard: None },
        TransitionRow { from: Phase::Planning, trigger: Trigger::PlanReady, to: Phase::Executing, guard: None },
        TransitionRow { from: Phase::Executing, trigger: Trigger::StepComplete, to: Phase::Observing, guard: None },
        TransitionRow { from: Phase::Executing, trigger: Trigger::StepError, to: Phase::Error, guard: None },
        TransitionRow { from: Phase::Observing, trigger: Trigger::PlanComplete, to: Phase::Reflecting, guard: None },
        TransitionRow { from: Phase::Observing, trigger: Trigger::ObservationInvalidates, to: Phase::Replanning, guard: Some(guard_replan_available) },
        TransitionRow { from: Phase::Observing, trigger: Trigger::ObservationInvalidates, to: Phase::Executing, guard: Some(guard_replan_exhausted) },
        TransitionRow { from: Phase::Observing, trigger: Trigger::ContinuePlan, to: Phase::Executing, guard: None },
        TransitionRow { from: Phase::Reflecting, trigger: Trigger::ReflectionComplete, to: Phase::Synthesizing, guard: None },
        TransitionRow { from: Phase::Reflecting, trigger: Trigger::ReflectionInsufficient, to: Phase::Replanning, guard: Some(guard_replan_available) },
        TransitionRow { from: Phase::Reflecting, trigger: Trigger::ReflectionInsufficient, to: Phase::Synthesizing, guard: Some(guard_replan_exhausted) },
        TransitionRow { from: Phase::Replanning, trigger: Trigger::ReplanReady, to: Phase::Planning, guard: Some(guard_replan_available) },
        TransitionRow { from: Phase::Replanning, trigger: Trigger::ReplanReady, to: Phase::Halted, guard: Some(guard_replan_exhausted) },
        TransitionRow { from: Phase::Synthesizing, trigger: Trigger::AnswerReady, to: Phase::Done, guard: None },
        TransitionRow { from: Phase::Synthesizing, trigger: Trigger::SynthesisError, to: Phase::Error, guard: None },
        TransitionRow { from: Phase::Error, trigger: Trigger::RecoverWithFallback, to: Phase::Synthesizing, guard: None },
        TransitionRow { from: Phase::Error, trigger: Trigger::Unrecoverable, to: Phase::Halted, guard: None },
    ];
    ROWS
}

/// Budget-exceeded check, separate from the transition table because it is
/// evaluated proactively by the runner before every `Executing` step rather
/// than fired as an ordinary trigger.
pub fn check_budget_limits(ctx: &StateMachineContext, budget: &Budget) -> Option<(BudgetGuard, HaltReason)> {
    if ctx.steps.len() >= budget.max_steps {
        return Some((BudgetGuard::MaxSteps, HaltReason::MaxSteps));
    }
    if ctx.elapsed_ms() >= budget.timeout_ms {
        return Some((BudgetGuard::Timeout, HaltReason::Timeout));
    }
    if ctx.total_tokens >= budget.token_budget {
        return Some((BudgetGuard::TokenBudget, HaltReason::TokenBudget));
    }
    if ctx.total_cost_cents >= budget.cost_budget_cents {
        return Some((BudgetGuard::CostBudget, HaltReason::CostBudget));
    }
    None
}

/// Read-only snapshot of a run, handed to listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub phase: Phase,
    pub steps_len: usize,
    pub total_tokens: u64,
    pub total_cost_cents: u64,
    pub elapsed_ms: u64,
    pub available_triggers: Vec<Trigger>,
}

/// A listener is notified after every successful transition. Panics/errors
/// inside a listener are caught and logged; they never affect state.
pub trait StateListener: Send + Sync {
    fn on_transition(&self, from: Phase, to: Phase, snapshot: &StateSnapshot);
}

/// Owned, per-run state. Mutated only through the named operations below;
/// the machine exposes no other write path (§3 Ownership).
pub struct StateMachineContext {
    pub goal: String,
    pub steps: Vec<(PlannedStep, StepResult)>,
    pub intermediate_results: std::collections::HashMap<String, serde_json::Value>,
    pub total_tokens: u64,
    pub total_cost_cents: u64,
    pub replan_count: u32,
    pub max_replan_attempts: u32,
    pub started_at: Instant,
    pub started_at_wall: DateTime<Utc>,
    pub last_error: Option<String>,
    pub halt_reason: Option<HaltReason>,
    pub final_answer: Option<String>,
    phase: Phase,
    listeners: Vec<std::sync::Arc<dyn StateListener>>,
}

impl StateMachineContext {
    pub fn new(goal: impl Into<String>, max_replan_attempts: u32) -> Self {
        Self {
            goal: goal.into(),
            steps: Vec::new(),
            intermediate_results: std::collections::HashMap::new(),
            total_tokens: 0,
            total_cost_cents: 0,
            replan_count: 0,
            max_replan_attempts,
            started_at: Instant::now(),
            started_at_wall: Utc::now(),
            last_error: None,
            halt_reason: None,
            final_answer: None,
            phase: Phase::Idle,
            listeners: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    pub fn add_listener(&mut self, listener: std::sync::Arc<dyn StateListener>) {
        self.listeners.push(listener);
    }

    pub fn add_step(&mut self, step: PlannedStep, result: StepResult) {
        self.steps.push((step, result));
    }

    pub fn record_usage(&mut self, tokens: u64, cost_cents: u64) {
        self.total_tokens += tokens;
        self.total_cost_cents += cost_cents;
    }

    pub fn record_replan(&mut self) {
        self.replan_count += 1;
    }

    pub fn set_halt_reason(&mut self, reason: HaltReason) {
        self.halt_reason = Some(reason);
    }

    pub fn set_final_answer(&mut self, answer: impl Into<String>) {
        self.final_answer = Some(answer.into());
    }

    pub fn set_intermediate_result(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.intermediate_results.insert(key.into(), value);
    }

    pub fn set_last_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    /// Placeholder used by `ProcessedObservation`-driven handlers; kept here
    /// so callers can stash the last observation without growing the
    /// struct's public surface ad hoc.
    pub fn observations(&self) -> Vec<&StepResult> {
        self.steps.iter().map(|(_, r)| r).collect()
    }

    fn available_triggers(&self) -> Vec<Trigger> {
        table()
            .iter()
            .filter(|row| row.from == self.phase)
            .map(|row| row.trigger)
            .collect()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            phase: self.phase,
            steps_len: self.steps.len(),
            total_tokens: self.total_tokens,
            total_cost_cents: self.total_cost_cents,
            elapsed_ms: self.elapsed_ms(),
            available_triggers: self.available_triggers(),
        }
    }

    /// Locate the unique `(from=current, trigger)` row whose guard passes.
    /// If none exists, returns `false` and state is unchanged.
    pub fn transition(&mut self, trigger: Trigger, budget: &Budget) -> bool {
        if self.phase.is_terminal() {
            debug!(phase = ?self.phase, ?trigger, "transition attempted from terminal state, ignored");
            return false;
        }

        if trigger == Trigger::UserInterrupt {
            let from = self.phase;
            self.phase = Phase::Halted;
            self.halt_reason = Some(HaltReason::UserInterrupt);
            self.notify(from, self.phase);
            return true;
        }

        let row = table()
            .iter()
            .find(|row| row.from == self.phase && row.trigger == trigger && row.guard.is_none_or(|g| g(self, budget)));

        match row {
            Some(row) => {
                let from = self.phase;
                self.phase = row.to;
                debug!(?from, to = ?row.to, ?trigger, "state transition");
                self.notify(from, row.to);
                true
            }
            None => {
                warn!(phase = ?self.phase, ?trigger, "no matching transition row");
                false
            }
        }
    }

    fn notify(&self, from: Phase, to: Phase) {
        let snapshot = self.snapshot();
        for listener in &self.listeners {
            // Listener panics must never affect state; logged and ignored.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_transition(from, to, &snapshot);
            }));
            if result.is_err() {
                warn!("state listener panicked during notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_to_done() {
        let budget = Budget::default();
        let mut ctx = StateMachineContext::new("goal", 2);
        assert!(ctx.transition(Trigger::Start, &budget));
        assert_eq!(ctx.phase(), Phase::RecognizingIntent);
        assert!(ctx.transition(Trigger::IntentRecognized, &budget));
        assert!(ctx.transition(Trigger::TaskDecomposed, &budget));
        assert!(ctx.transition(Trigger::PlanReady, &budget));
        assert_eq!(ctx.phase(), Phase::Executing);
        assert!(ctx.transition(Trigger::StepComplete, &budget));
        assert!(ctx.transition(Trigger::PlanComplete, &budget));
        assert!(ctx.transition(Trigger::ReflectionComplete, &budget));
        assert!(ctx.transition(Trigger::AnswerReady, &budget));
        assert_eq!(ctx.phase(), Phase::Done);
        assert!(ctx.phase().is_terminal());
    }

    #[test]
    fn terminal_states_are_absorbing() {
        let budget = Budget::default();
        let mut ctx = StateMachineContext::new("goal", 2);
        for trigger in [
            Trigger::Start,
            Trigger::SimpleIntent,
            Trigger::AnswerReady,
        ] {
            ctx.transition(trigger, &budget);
        }
        assert_eq!(ctx.phase(), Phase::Done);
        assert!(!ctx.transition(Trigger::Start, &budget));
        assert_eq!(ctx.phase(), Phase::Done);
    }

    #[test]
    fn user_interrupt_valid_from_any_nonterminal_state() {
        let budget = Budget::default();
        let mut ctx = StateMachineContext::new("goal", 2);
        ctx.transition(Trigger::Start, &budget);
        assert!(ctx.transition(Trigger::UserInterrupt, &budget));
        assert_eq!(ctx.phase(), Phase::Halted);
        assert_eq!(ctx.halt_reason, Some(HaltReason::UserInterrupt));
    }

    #[test]
    fn replan_limit_halts_when_exhausted() {
        let budget = Budget::default();
        let mut ctx = StateMachineContext::new("goal", 1);
        ctx.transition(Trigger::Start, &budget);
        ctx.transition(Trigger::IntentRecognized, &budget);
        ctx.transition(Trigger::TaskDecomposed, &budget);
        ctx.transition(Trigger::PlanReady, &budget);
        ctx.transition(Trigger::StepComplete, &budget);
        ctx.transition(Trigger::PlanComplete, &budget);
        // First replan: allowed.
        assert!(ctx.transition(Trigger::ReflectionInsufficient, &budget));
        assert_eq!(ctx.phase(), Phase::Replanning);
        ctx.record_replan();
        assert!(ctx.transition(Trigger::ReplanReady, &budget));
        assert_eq!(ctx.phase(), Phase::Halted);
        assert_eq!(ctx.halt_reason, Some(HaltReason::ReplanLimit));
    }

    #[test]
    fn budget_check_order_is_fixed() {
        let budget = Budget {
            max_steps: 1,
            timeout_ms: 1,
            token_budget: 1,
            cost_budget_cents: 1,
        };
        let mut ctx = StateMachineContext::new("goal", 1);
        ctx.add_step(
            PlannedStep::react_loop("s1"),
            StepResult::ok("s1", serde_json::json!({}), 0, 0),
        );
        // max_steps guard fires first even though token/cost are also exceeded.
        assert_eq!(
            check_budget_limits(&ctx, &budget).map(|(g, _)| g),
            Some(BudgetGuard::MaxSteps)
        );
    }

    #[test]
    fn error_recovery_paths() {
        let budget = Budget::default();
        let mut ctx = StateMachineContext::new("goal", 2);
        ctx.transition(Trigger::Start, &budget);
        assert!(ctx.transition(Trigger::IntentError, &budget));
        assert_eq!(ctx.phase(), Phase::Error);
        assert!(ctx.transition(Trigger::RecoverWithFallback, &budget));
        assert_eq!(ctx.phase(), Phase::Synthesizing);
    }
}
