//! Composable tool wrappers (decorators) for policy enforcement.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::error::{Result, ToolError};
use crate::tool::{Tool, ToolOutput};

#[async_trait]
pub trait ToolWrapper: Send + Sync {
    /// Unique identifier for this wrapper type.
    fn wrapper_name(&self) -> &str;

    /// Intercept tool execution and optionally delegate to `next`.
    async fn wrap_execute(
        &self,
        tool_name: &str,
        input: Value,
        next: &dyn Tool,
    ) -> Result<ToolOutput>;
}

/// A tool implementation that applies wrappers around an inner tool.
pub struct WrappedTool {
    inner: Arc<dyn Tool>,
    wrappers: Vec<Arc<dyn ToolWrapper>>,
}

impl WrappedTool {
    pub fn new(inner: Arc<dyn Tool>, wrappers: Vec<Arc<dyn ToolWrapper>>) -> Self {
        Self { inner, wrappers }
    }

    pub fn inner(&self) -> &Arc<dyn Tool> {
        &self.inner
    }
}

struct RemainingChain<'a> {
    tool_name: &'a str,
    inner: &'a dyn Tool,
    wrappers: &'a [Arc<dyn ToolWrapper>],
    index: usize,
}

#[async_trait]
impl Tool for RemainingChain<'_> {
    fn name(&self) -> &str {
        self.tool_name
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn parameters_schema(&self) -> Value {
        self.inner.parameters_schema()
    }

    fn supports_parallel(&self) -> bool {
        self.inner.supports_parallel()
    }

    fn supports_parallel_for(&self, input: &Value) -> bool {
        self.inner.supports_parallel_for(input)
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        execute_chain(self.tool_name, self.inner, self.wrappers, self.index, input).await
    }
}

async fn execute_chain(
    tool_name: &str,
    inner: &dyn Tool,
    wrappers: &[Arc<dyn ToolWrapper>],
    index: usize,
    input: Value,
) -> Result<ToolOutput> {
    if index >= wrappers.len() {
        return inner.execute(input).await;
    }

    let next = RemainingChain {
        tool_name,
        inner,
        wrappers,
        index: index + 1,
    };
    wrappers[index].wrap_execute(tool_name, input, &next).await
}

#[async_trait]
impl Tool for WrappedTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn parameters_schema(&self) -> Value {
        self.inner.parameters_schema()
    }

    fn supports_parallel(&self) -> bool {
        self.inner.supports_parallel()
    }

    fn supports_parallel_for(&self, input: &Value) -> bool {
        self.inner.supports_parallel_for(input)
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        execute_chain(self.name(), self.inner.as_ref(), &self.wrappers, 0, input).await
    }
}

/// Wrapper that enforces a timeout per tool call.
pub struct TimeoutWrapper {
    timeout: Duration,
}

impl TimeoutWrapper {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ToolWrapper for TimeoutWrapper {
    fn wrapper_name(&self) -> &str {
        "timeout"
    }

    async fn wrap_execute(
        &self,
        tool_name: &str,
        input: Value,
        next: &dyn Tool,
    ) -> Result<ToolOutput> {
        match tokio::time::timeout(self.timeout, next.execute(input)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Tool(format!(
                "Tool '{tool_name}' timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

/// Wrapper that limits concurrent executions of the wrapped tool.
pub struct RateLimitWrapper {
    semaphore: Arc<Semaphore>,
}

impl RateLimitWrapper {
    pub fn new(max_concurrent: usize) -> Self {
        let permits = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }
}

#[async_trait]
impl ToolWrapper for RateLimitWrapper {
    fn wrapper_name(&self) -> &str {
        "rate_limit"
    }

    async fn wrap_execute(
        &self,
        tool_name: &str,
        input: Value,
        next: &dyn Tool,
    ) -> Result<ToolOutput> {
        let _permit = self.semaphore.acquire().await.map_err(|_| {
            ToolError::Tool(format!(
                "Rate limiter for tool '{tool_name}' is unavailable"
            ))
        })?;
        next.execute(input).await
    }
}
