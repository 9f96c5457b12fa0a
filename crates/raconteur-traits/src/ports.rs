//! External collaborator ports consumed by the reasoning runtime.
//!
//! These traits describe the boundary between `raconteur-ai`'s agentic
//! runtime and the concrete vendor/infrastructure integrations a host
//! application wires in (LLM providers live behind [`crate::llm::LlmSwitcher`]
//! and the AI crate's own `LlmClient`; everything else the runtime needs from
//! the outside world is defined here so the runtime crate never depends on a
//! concrete vendor SDK).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Remote key-value cache port (session continuity's primary tier).
///
/// Mirrors a minimal Redis-shaped surface: scalar get/set with optional TTL,
/// deletion, TTL refresh, and a set-member collection for per-user topic
/// tracking. Implementations are expected to be cheap to clone (an `Arc`
/// wrapper around a connection pool, typically).
#[async_trait]
pub trait RemoteCachePort: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Option<std::time::Duration>) -> Result<()>;
    async fn del(&self, key: &str) -> Result<()>;
    async fn expire(&self, key: &str, ttl: std::time::Duration) -> Result<()>;
    async fn set_add(&self, key: &str, member: &str) -> Result<()>;
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;
}

/// Embedding port: text -> fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn dimensions(&self) -> usize;
}

/// A single memory record returned by a vector store query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub text: String,
    pub score: f32,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorQuery {
    pub query: String,
    pub limit: usize,
    #[serde(default)]
    pub filters: Option<serde_json::Value>,
}

/// Vector store port: query-by-similarity and upsert. The runtime never
/// implements an index itself (explicit Non-goal); it only consumes this
/// contract.
#[async_trait]
pub trait VectorStorePort: Send + Sync {
    async fn query(&self, query: VectorQuery) -> Result<Vec<MemoryRecord>>;
    async fn upsert(&self, vectors: Vec<Vec<f32>>, metadata: Vec<serde_json::Value>)
    -> Result<()>;
}

/// Optional speech-to-text port, used only by surrounding use-cases.
#[async_trait]
pub trait SpeechToTextPort: Send + Sync {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String>;
}

/// Optional text-to-speech port.
#[async_trait]
pub trait TextToSpeechPort: Send + Sync {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>>;
}

/// Optional image-generation port.
#[async_trait]
pub trait ImageGenerationPort: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>>;
}

/// Optional vision-analysis port.
#[async_trait]
pub trait VisionAnalysisPort: Send + Sync {
    async fn analyze(&self, image: &[u8], prompt: &str) -> Result<String>;
}

/// Outcome of an approval request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub approved: bool,
    pub approver: Option<String>,
    pub comments: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A pending approval request, handed to the [`ApprovalHandler`] port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub checkpoint: String,
    pub data: serde_json::Value,
    pub context: serde_json::Value,
    pub timeout_ms: u64,
}

/// Approval handler port used by the multi-agent orchestrator's
/// `approvalRequired` gate.
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    async fn request_approval(&self, request: ApprovalRequest) -> Result<ApprovalOutcome>;
}
