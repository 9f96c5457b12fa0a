//! Complexity-aware model router (§4.4).
//!
//! Generalizes `agent::model_router`'s `TaskTier`/`classify_task`/
//! `select_model` shape (substring-scan classifier + pure selection
//! function + `ModelSwitcher`-style active-model handle) into the spec's
//! five-tier taxonomy and budget-aware cost/quality scoring. The legacy
//! `TaskTier` router stays in place for `AgentExecutor`'s own model-switch
//! bookkeeping (see DESIGN.md); this module is the router the reasoning
//! runtime actually calls.

use serde::{Deserialize, Serialize};

/// Task complexity tier, inferred from the prompt when no hint is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Complexity {
    SafetyCritical,
    Reasoning,
    Extraction,
    Summarization,
    Classification,
}

/// Case-insensitive substring scan in fixed priority order (§4.4).
pub fn infer_complexity(prompt: &str) -> Complexity {
    let lower = prompt.to_lowercase();

    const SAFETY_SIGNALS: &[&str] = &["harm", "hurt", "emergency", "danger"];
    const REASONING_SIGNALS: &[&str] = &["plan", "reason", "step by step", "analyze"];
    const EXTRACTION_SIGNALS: &[&str] = &["extract", "list", "entities"];
    const SUMMARIZATION_SIGNALS: &[&str] = &["summarize", "tldr", "brief"];

    if SAFETY_SIGNALS.iter().any(|s| lower.contains(s)) {
        return Complexity::SafetyCritical;
    }
    if REASONING_SIGNALS.iter().any(|s| lower.contains(s)) {
        return Complexity::Reasoning;
    }
    if EXTRACTION_SIGNALS.iter().any(|s| lower.contains(s)) {
        return Complexity::Extraction;
    }
    if SUMMARIZATION_SIGNALS.iter().any(|s| lower.contains(s)) {
        return Complexity::Summarization;
    }
    if lower.len() < 100 {
        return Complexity::Classification;
    }
    Complexity::Reasoning
}

/// Remaining routing budget for the current run.
#[derive(Debug, Clone, Copy)]
pub struct RoutingBudget {
    pub remaining_cost_cents: u64,
    pub per_request_cap_cents: u64,
    pub min_quality: f64,
}

/// A model this router knows how to pick.
#[derive(Debug, Clone)]
pub struct ModelCandidate {
    pub id: String,
    /// Whether this model is in the cheap/fast "FLASH" tier.
    pub is_flash_tier: bool,
    /// Per-task quality score in `[0,1]`, keyed by `Complexity`.
    pub quality_scores: std::collections::HashMap<Complexity, f64>,
    /// Average cost per 1,000 tokens, in cents.
    pub average_cost_per_1k_cents: f64,
}

impl ModelCandidate {
    fn quality_for(&self, complexity: Complexity) -> f64 {
        self.quality_scores.get(&complexity).copied().unwrap_or(0.0)
    }
}

/// The result of a routing decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub model_id: String,
    pub complexity: Complexity,
    pub reason: String,
}

const BUDGET_FORCING_THRESHOLD_CENTS: u64 = 5;

/// Select a model for `prompt` under `budget`, given the candidate pool.
/// `hint` overrides complexity inference when present.
pub fn route(
    prompt: &str,
    hint: Option<Complexity>,
    budget: RoutingBudget,
    candidates: &[ModelCandidate],
) -> RoutingDecision {
    let complexity = hint.unwrap_or_else(|| infer_complexity(prompt));

    let qualified: Vec<&ModelCandidate> = candidates
        .iter()
        .filter(|c| c.quality_for(complexity) >= budget.min_quality)
        .collect();

    if qualified.is_empty() {
        let Some(fallback) = candidates.first() else {
            return RoutingDecision {
                model_id: String::new(),
                complexity,
                reason: "no models registered".to_string(),
            };
        };
        return RoutingDecision {
            model_id: fallback.id.clone(),
            complexity,
            reason: format!(
                "no candidate met the quality floor of {:.2} for {:?}; falling back to the first registered model",
                budget.min_quality, complexity
            ),
        };
    }

    if budget.remaining_cost_cents < BUDGET_FORCING_THRESHOLD_CENTS {
        if let Some(flash) = qualified.iter().find(|c| c.is_flash_tier) {
            return RoutingDecision {
                model_id: flash.id.clone(),
                complexity,
                reason: format!(
                    "remaining budget ({} cents) below the {}-cent floor; forcing the cheapest qualifying FLASH-tier model",
                    budget.remaining_cost_cents, BUDGET_FORCING_THRESHOLD_CENTS
                ),
            };
        }
    }

    // score = quality / (avg_cost_per_1k + 0.1); ties broken by insertion
    // order, i.e. the first maximal element found while scanning in order.
    let mut best: Option<(&ModelCandidate, f64)> = None;
    for candidate in &qualified {
        let score = candidate.quality_for(complexity) / (candidate.average_cost_per_1k_cents + 0.1);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }

    let (winner, score) = best.expect("qualified is non-empty");
    RoutingDecision {
        model_id: winner.id.clone(),
        complexity,
        reason: format!("cost-normalized quality score {score:.3} for {complexity:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn candidate(id: &str, quality: f64, cost: f64, flash: bool) -> ModelCandidate {
        let mut scores = HashMap::new();
        for c in [
            Complexity::SafetyCritical,
            Complexity::Reasoning,
            Complexity::Extraction,
            Complexity::Summarization,
            Complexity::Classification,
        ] {
            scores.insert(c, quality);
        }
        ModelCandidate {
            id: id.to_string(),
            is_flash_tier: flash,
            quality_scores: scores,
            average_cost_per_1k_cents: cost,
        }
    }

    #[test]
    fn safety_critical_beats_everything_else() {
        assert_eq!(
            infer_complexity("someone is in danger, please help"),
            Complexity::SafetyCritical
        );
        assert_eq!(
            infer_complexity("let's reason step by step about danger"),
            Complexity::SafetyCritical
        );
    }

    #[test]
    fn classification_requires_short_prompt() {
        assert_eq!(infer_complexity("hi"), Complexity::Classification);
        let long = "x".repeat(200);
        assert_eq!(infer_complexity(&long), Complexity::Reasoning);
    }

    #[test]
    fn budget_forcing_picks_flash_tier() {
        let candidates = vec![
            candidate("premium", 0.9, 2.0, false),
            candidate("flash", 0.7, 0.2, true),
        ];
        let budget = RoutingBudget {
            remaining_cost_cents: 3,
            per_request_cap_cents: 100,
            min_quality: 0.5,
        };
        let decision = route("summarize this", None, budget, &candidates);
        assert_eq!(decision.model_id, "flash");
        assert!(decision.reason.contains("forcing"));
    }

    #[test]
    fn scoring_prefers_best_cost_normalized_quality() {
        let candidates = vec![
            candidate("cheap_ok", 0.6, 0.1, false),
            candidate("expensive_great", 0.95, 5.0, false),
        ];
        let budget = RoutingBudget {
            remaining_cost_cents: 1000,
            per_request_cap_cents: 1000,
            min_quality: 0.0,
        };
        let decision = route("plan the next steps", None, budget, &candidates);
        // cheap_ok: 0.6/0.2=3.0 ; expensive_great: 0.95/5.1=0.186
        assert_eq!(decision.model_id, "cheap_ok");
    }

    #[test]
    fn falls_back_to_first_registered_when_no_quality_floor_met() {
        let candidates = vec![candidate("only", 0.1, 1.0, false)];
        let budget = RoutingBudget {
            remaining_cost_cents: 1000,
            per_request_cap_cents: 1000,
            min_quality: 0.9,
        };
        let decision = route("extract entities", None, budget, &candidates);
        assert_eq!(decision.model_id, "only");
        assert!(decision.reason.contains("falling back"));
    }
}
