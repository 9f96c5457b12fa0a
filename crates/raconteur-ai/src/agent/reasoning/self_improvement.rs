//! Self-improvement pattern miner (§4.8).
//!
//! Grounded on `eval::EvalResult::from_cases` for the aggregate-then-derive
//! shape (tally outcomes, compute a rate, keep the failing subset around for
//! inspection) and on the orchestrator's `DashMap`-backed per-pipeline cache
//! idiom (see `orchestrator.rs`) for the concurrent per-tool baseline map.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

const EMA_ALPHA: f64 = 0.1;
const ANOMALY_MULTIPLIER: f64 = 2.0;
const ANOMALY_MIN_SAMPLES: u64 = 10;
const MAX_EXECUTIONS: usize = 1000;
const MAX_PATTERNS: usize = 100;
const MAX_SUGGESTIONS: usize = 50;
const PATTERN_MAX_AGE_DAYS: i64 = 90;
const PATTERN_CONFIDENCE_THRESHOLD: f64 = 0.5;
const MIN_TIMEOUT_OCCURRENCES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Failure,
    Timeout,
}

/// A single recorded tool or step execution, fed into the miner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub agent_name: String,
    pub tool_name: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
    pub tokens: u64,
    pub cost_cents: u64,
    /// User satisfaction signal in `[0, 1]`, when available.
    pub satisfaction: Option<f64>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Running per-agent EMA baseline over five dimensions (success rate,
/// duration, tokens, cost, satisfaction), with anomaly detection against a
/// `2x` threshold once enough samples have accumulated.
#[derive(Debug, Clone, Copy)]
pub struct Baseline {
    pub success_rate: f64,
    pub duration_ms: f64,
    pub tokens: f64,
    pub cost_cents: f64,
    pub satisfaction: f64,
    pub sample_count: u64,
}

impl Baseline {
    fn update(&mut self, record: &ExecutionRecord) {
        let success = if record.outcome == Outcome::Success { 1.0 } else { 0.0 };
        let satisfaction = record.satisfaction.unwrap_or(self.satisfaction);
        if self.sample_count == 0 {
            self.success_rate = success;
            self.duration_ms = record.duration_ms as f64;
            self.tokens = record.tokens as f64;
            self.cost_cents = record.cost_cents as f64;
            self.satisfaction = satisfaction;
        } else {
            self.success_rate = EMA_ALPHA * success + (1.0 - EMA_ALPHA) * self.success_rate;
            self.duration_ms = EMA_ALPHA * record.duration_ms as f64 + (1.0 - EMA_ALPHA) * self.duration_ms;
            self.tokens = EMA_ALPHA * record.tokens as f64 + (1.0 - EMA_ALPHA) * self.tokens;
            self.cost_cents = EMA_ALPHA * record.cost_cents as f64 + (1.0 - EMA_ALPHA) * self.cost_cents;
            self.satisfaction = EMA_ALPHA * satisfaction + (1.0 - EMA_ALPHA) * self.satisfaction;
        }
        self.sample_count += 1;
    }

    /// An execution is anomalous once the baseline has enough samples to be
    /// trustworthy (`sample_count >= 10`) and duration, cost, or tokens
    /// exceed twice the baseline.
    fn is_anomalous(&self, record: &ExecutionRecord) -> bool {
        self.sample_count >= ANOMALY_MIN_SAMPLES
            && (record.duration_ms as f64 > self.duration_ms * ANOMALY_MULTIPLIER
                || record.cost_cents as f64 > self.cost_cents * ANOMALY_MULTIPLIER
                || record.tokens as f64 > self.tokens * ANOMALY_MULTIPLIER)
    }
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            success_rate: 0.0,
            duration_ms: 0.0,
            tokens: 0.0,
            cost_cents: 0.0,
            satisfaction: 0.5,
            sample_count: 0,
        }
    }
}

/// A condition a learned pattern's trigger must satisfy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PatternCondition {
    ToolIs(String),
    ErrorContains(String),
    MinOccurrences(u32),
    CostAboveBaselineMultiple(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternFamily {
    Failure,
    Success,
    Timeout,
    Cost,
}

/// A pattern mined from execution history: a family, a set of conditions
/// it was mined under, and its observed occurrence count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub id: String,
    pub family: PatternFamily,
    pub tool_name: String,
    pub conditions: Vec<PatternCondition>,
    pub occurrences: u32,
    /// How strongly this pattern holds, in `[0, 1]` — the fraction of
    /// recent executions for this tool that exhibit it.
    pub confidence: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub pattern_id: String,
    pub tool_name: String,
    pub family: PatternFamily,
    /// `1 + min(2, observations / 5) + 2 * confidence + (1 if a failure
    /// pattern)`.
    pub priority: f64,
    pub message: String,
}

/// Tracks executions, maintains per-tool EMA baselines, mines patterns, and
/// derives prioritized suggestions. All maps are capped with oldest-first
/// pruning.
pub struct SelfImprovementMiner {
    executions: Mutex<VecDeque<ExecutionRecord>>,
    baselines: DashMap<String, Baseline>,
    patterns: DashMap<String, LearnedPattern>,
    suggestions: Mutex<VecDeque<Suggestion>>,
}

impl Default for SelfImprovementMiner {
    fn default() -> Self {
        Self::new()
    }
}

impl SelfImprovementMiner {
    pub fn new() -> Self {
        Self {
            executions: Mutex::new(VecDeque::new()),
            baselines: DashMap::new(),
            patterns: DashMap::new(),
            suggestions: Mutex::new(VecDeque::new()),
        }
    }

    /// Record one execution: updates the rolling baseline, flags anomalies,
    /// appends to the capped history, and re-mines patterns touching this
    /// tool.
    pub fn record(&self, record: ExecutionRecord) -> bool {
        let anomalous = {
            let mut baseline = self.baselines.entry(record.agent_name.clone()).or_default();
            let anomalous = baseline.is_anomalous(&record);
            baseline.update(&record);
            anomalous
        };

        {
            let mut executions = self.executions.lock();
            executions.push_back(record.clone());
            while executions.len() > MAX_EXECUTIONS {
                executions.pop_front();
            }
        }

        self.mine_patterns_for(&record.tool_name);
        anomalous
    }

    /// Per-agent baseline (keyed by `agent_name`), not per-tool.
    pub fn baseline_for(&self, agent_name: &str) -> Option<Baseline> {
        self.baselines.get(agent_name).map(|b| *b)
    }

    fn history_for(&self, tool_name: &str) -> Vec<ExecutionRecord> {
        self.executions
            .lock()
            .iter()
            .filter(|e| e.tool_name == tool_name)
            .cloned()
            .collect()
    }

    /// Mines the four pattern families (Failure, Success, Timeout, Cost)
    /// for `tool_name` from its recorded history and upserts any pattern
    /// that meets the minimum-occurrence bar, then derives suggestions.
    fn mine_patterns_for(&self, tool_name: &str) {
        let history = self.history_for(tool_name);
        if history.is_empty() {
            return;
        }

        let now = history.last().map(|r| r.timestamp).unwrap_or_else(Utc::now);
        let total = history.len() as u32;
        let failures = history.iter().filter(|r| r.outcome == Outcome::Failure).count() as u32;
        let successes = history.iter().filter(|r| r.outcome == Outcome::Success).count() as u32;
        let timeouts = history.iter().filter(|r| r.outcome == Outcome::Timeout).count() as u32;

        const MIN_OCCURRENCES: u32 = 3;
        const MIN_REPEAT_ERRORS: u32 = 2;

        if failures >= MIN_OCCURRENCES {
            let repeats = Self::most_common_error_count(&history);
            if repeats >= MIN_REPEAT_ERRORS {
                self.upsert_pattern(tool_name, PatternFamily::Failure, failures, total, now, vec![
                    PatternCondition::ToolIs(tool_name.to_string()),
                    PatternCondition::MinOccurrences(MIN_OCCURRENCES),
                ]);
            }
        }
        if successes >= MIN_OCCURRENCES && successes == total {
            self.upsert_pattern(tool_name, PatternFamily::Success, successes, total, now, vec![
                PatternCondition::ToolIs(tool_name.to_string()),
                PatternCondition::MinOccurrences(MIN_OCCURRENCES),
            ]);
        }
        if timeouts >= MIN_TIMEOUT_OCCURRENCES {
            self.upsert_pattern(tool_name, PatternFamily::Timeout, timeouts, total, now, vec![
                PatternCondition::ToolIs(tool_name.to_string()),
                PatternCondition::ErrorContains("timeout".to_string()),
            ]);
        }
        {
            let mean_cost = history.iter().map(|r| r.cost_cents as f64).sum::<f64>() / total as f64;
            let cost_spikes = history
                .iter()
                .filter(|r| mean_cost > 0.0 && r.cost_cents as f64 > mean_cost * 1.5)
                .count() as u32;
            if cost_spikes >= MIN_OCCURRENCES {
                self.upsert_pattern(tool_name, PatternFamily::Cost, cost_spikes, total, now, vec![
                    PatternCondition::ToolIs(tool_name.to_string()),
                    PatternCondition::CostAboveBaselineMultiple(1.5),
                ]);
            }
        }

        self.prune_patterns(now);
        self.derive_suggestions(tool_name);
    }

    /// Count of the largest group of identical error messages in `history`
    /// (used for the Failure family's "repeated at least twice" bar).
    fn most_common_error_count(history: &[ExecutionRecord]) -> u32 {
        let mut counts: std::collections::HashMap<&str, u32> = std::collections::HashMap::new();
        for record in history {
            if let Some(error) = record.error.as_deref() {
                *counts.entry(error).or_insert(0) += 1;
            }
        }
        counts.into_values().max().unwrap_or(0)
    }

    fn upsert_pattern(
        &self,
        tool_name: &str,
        family: PatternFamily,
        occurrences: u32,
        total: u32,
        now: DateTime<Utc>,
        conditions: Vec<PatternCondition>,
    ) {
        let id = format!("{tool_name}:{family:?}");
        let confidence = if total == 0 { 0.0 } else { (occurrences as f64 / total as f64).min(1.0) };
        self.patterns
            .entry(id.clone())
            .and_modify(|p| {
                p.occurrences = occurrences;
                p.confidence = confidence;
                p.last_seen = now;
            })
            .or_insert(LearnedPattern {
                id,
                family,
                tool_name: tool_name.to_string(),
                conditions,
                occurrences,
                confidence,
                first_seen: now,
                last_seen: now,
            });

        if self.patterns.len() > MAX_PATTERNS {
            if let Some(oldest_key) = self
                .patterns
                .iter()
                .min_by_key(|p| p.last_seen)
                .map(|p| p.id.clone())
            {
                self.patterns.remove(&oldest_key);
            }
        }
    }

    fn prune_patterns(&self, now: DateTime<Utc>) {
        let stale: Vec<String> = self
            .patterns
            .iter()
            .filter(|p| (now - p.last_seen).num_days() > PATTERN_MAX_AGE_DAYS)
            .map(|p| p.id.clone())
            .collect();
        for key in stale {
            self.patterns.remove(&key);
        }
    }

    /// Derives a suggestion for every pattern touching `tool_name` with
    /// `confidence >= 0.5`. Priority: `1 + min(2, observations / 5) + 2 *
    /// confidence + (1 if a failure pattern)`.
    fn derive_suggestions(&self, tool_name: &str) {
        let candidates: Vec<LearnedPattern> = self
            .patterns
            .iter()
            .filter(|p| p.tool_name == tool_name && p.confidence >= PATTERN_CONFIDENCE_THRESHOLD)
            .map(|p| p.clone())
            .collect();

        let mut suggestions = self.suggestions.lock();
        for pattern in candidates {
            let observations_bonus = (pattern.occurrences as f64 / 5.0).min(2.0);
            let failure_bonus = if pattern.family == PatternFamily::Failure { 1.0 } else { 0.0 };
            let priority = 1.0 + observations_bonus + 2.0 * pattern.confidence + failure_bonus;

            let message = match pattern.family {
                PatternFamily::Failure => format!(
                    "\"{tool_name}\" has failed repeatedly ({} occurrences, {:.0}% confidence); consider reviewing its inputs or adding a retry/fallback.",
                    pattern.occurrences, pattern.confidence * 100.0
                ),
                PatternFamily::Success => format!(
                    "\"{tool_name}\" has been reliably successful ({} occurrences); a good candidate to keep unsupervised.",
                    pattern.occurrences
                ),
                PatternFamily::Timeout => format!(
                    "\"{tool_name}\" has timed out {} times; consider raising its timeout or adding a faster fallback.",
                    pattern.occurrences
                ),
                PatternFamily::Cost => format!(
                    "\"{tool_name}\" has spiked over 1.5x its mean cost {} times; consider capping its inputs or batching calls.",
                    pattern.occurrences
                ),
            };

            let suggestion = Suggestion {
                pattern_id: pattern.id.clone(),
                tool_name: tool_name.to_string(),
                family: pattern.family,
                priority,
                message,
            };

            suggestions.retain(|s| s.pattern_id != suggestion.pattern_id);
            suggestions.push_back(suggestion);
        }

        let mut ordered: Vec<Suggestion> = suggestions.iter().cloned().collect();
        ordered.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));
        ordered.truncate(MAX_SUGGESTIONS);
        *suggestions = ordered.into();
    }

    pub fn patterns(&self) -> Vec<LearnedPattern> {
        self.patterns.iter().map(|p| p.clone()).collect()
    }

    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.suggestions.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tool: &str, outcome: Outcome, duration_ms: u64, cost_cents: u64) -> ExecutionRecord {
        ExecutionRecord {
            agent_name: "biographer".to_string(),
            tool_name: tool.to_string(),
            outcome,
            duration_ms,
            tokens: duration_ms * 2,
            cost_cents,
            satisfaction: None,
            error: if outcome == Outcome::Failure {
                Some("boom".to_string())
            } else {
                None
            },
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn ema_baseline_converges_toward_steady_duration() {
        let miner = SelfImprovementMiner::new();
        for _ in 0..20 {
            miner.record(record("search", Outcome::Success, 100, 5));
        }
        let baseline = miner.baseline_for("biographer").unwrap();
        assert!((baseline.duration_ms - 100.0).abs() < 1.0);
        assert!((baseline.success_rate - 1.0).abs() < 1e-6);
    }

    #[test]
    fn anomaly_detection_requires_ten_prior_samples() {
        let miner = SelfImprovementMiner::new();
        for _ in 0..9 {
            miner.record(record("search", Outcome::Success, 100, 5));
        }
        // Only 9 prior samples: the gate has not opened yet.
        assert!(!miner.record(record("search", Outcome::Success, 500, 5)));
    }

    #[test]
    fn anomalous_duration_is_flagged_once_baseline_is_established() {
        let miner = SelfImprovementMiner::new();
        for _ in 0..10 {
            miner.record(record("search", Outcome::Success, 100, 5));
        }
        let anomalous = miner.record(record("search", Outcome::Success, 500, 5));
        assert!(anomalous);
    }

    #[test]
    fn repeated_failures_mine_a_failure_pattern_and_suggestion() {
        let miner = SelfImprovementMiner::new();
        for _ in 0..4 {
            miner.record(record("flaky_tool", Outcome::Failure, 50, 1));
        }
        let patterns = miner.patterns();
        assert!(patterns.iter().any(|p| p.family == PatternFamily::Failure && p.tool_name == "flaky_tool"));
        let suggestions = miner.suggestions();
        assert!(suggestions.iter().any(|s| s.tool_name == "flaky_tool"));
        assert!(suggestions.iter().all(|s| s.priority > 0.0));
    }

    #[test]
    fn timeout_pattern_mines_after_two_occurrences() {
        let miner = SelfImprovementMiner::new();
        miner.record(record("slow_tool", Outcome::Timeout, 9_000, 1));
        miner.record(record("slow_tool", Outcome::Timeout, 9_500, 1));
        let patterns = miner.patterns();
        assert!(patterns.iter().any(|p| p.family == PatternFamily::Timeout && p.tool_name == "slow_tool"));
    }

    #[test]
    fn all_successes_mine_a_success_pattern() {
        let miner = SelfImprovementMiner::new();
        for _ in 0..5 {
            miner.record(record("reliable_tool", Outcome::Success, 20, 1));
        }
        let patterns = miner.patterns();
        assert!(patterns.iter().any(|p| p.family == PatternFamily::Success && p.tool_name == "reliable_tool"));
    }

    #[test]
    fn execution_history_is_capped() {
        let miner = SelfImprovementMiner::new();
        for _ in 0..(MAX_EXECUTIONS + 50) {
            miner.record(record("busy_tool", Outcome::Success, 10, 1));
        }
        assert!(miner.executions.lock().len() <= MAX_EXECUTIONS);
    }
}
