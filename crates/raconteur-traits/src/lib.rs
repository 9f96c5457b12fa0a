//! Raconteur Traits - Shared trait definitions and core abstractions.
//!
//! This crate provides the shared interfaces used across the Raconteur workspace:
//! - Tool trait, ToolError, ToolRegistry, Toolset
//! - SecurityGate, SecurityDecision, ToolAction
//! - NetworkAllowlist, NetworkEcosystem, SSRF validation
//! - SkillProvider and skill data types
//! - External collaborator ports consumed by the reasoning runtime (`ports`)

pub mod cache;
pub mod error;
pub mod filtered;
#[cfg(feature = "http-client")]
pub mod http_client;
pub mod llm;
pub mod network;
pub mod ports;
pub mod registry;
pub mod security;
pub mod skill;
pub mod tool;
pub mod toolset;
pub mod wrapper;

// ── Top-level re-exports ─────────────────────────────────────────────

// Error types
pub use error::{Result as ToolResult, ToolError};

// Tool trait and core types
pub use tool::{SecretResolver, Tool, ToolErrorCategory, ToolOutput, ToolSchema, check_security};

// Registry and toolset
pub use registry::ToolRegistry;
pub use toolset::{Toolset, ToolsetContext};

// Wrappers
pub use wrapper::{RateLimitWrapper, TimeoutWrapper, ToolWrapper, WrappedTool};

// Filtered toolset
pub use filtered::{FilteredToolset, ToolPredicate};

// Security
pub use network::{
    NetworkAllowlist, NetworkEcosystem, is_restricted_ip, resolve_and_validate_url, validate_url,
};
pub use security::{SecurityDecision, SecurityGate, ToolAction};

// Skill types
pub use skill::{SkillContent, SkillInfo, SkillProvider, SkillRecord, SkillUpdate};

// LLM switching
pub use llm::{LlmSwitcher, SwapResult};

// External collaborator ports (embedding, vector store, speech/vision, approval, remote cache)
pub use ports::{
    ApprovalHandler, ApprovalOutcome, ApprovalRequest, EmbeddingPort, ImageGenerationPort,
    MemoryRecord, RemoteCachePort, SpeechToTextPort, TextToSpeechPort, VectorQuery,
    VectorStorePort, VisionAnalysisPort,
};

// Cache types
pub use cache::{AgentCache, CachedSearchResult, SearchMatch};
