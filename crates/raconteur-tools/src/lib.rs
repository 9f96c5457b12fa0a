//! Concrete tool implementations for the voice-biographer reasoning runtime.
//!
//! This crate provides:
//! - Web/network tools (http, jina reader, web fetch, web search)
//! - Memory search over the embedding-backed semantic store
//! - Voice tools (transcription, vision analysis of photos shared by a user)
//! - The runtime model-switching tool
//! - Skill-as-Tool system (SkillAsTool, register_skills)
//! - HTTP client and network-security (SSRF) utilities
//!
//! Core abstractions (Tool trait, ToolError, ToolRegistry, SecurityGate, etc.)
//! are defined in `raconteur-ai`/`raconteur-traits` and re-exported here for
//! convenience.

pub mod error;
pub mod http_client;
pub mod tool;

// Implementation modules (owned by this crate)
pub mod impls;
pub mod security;
pub mod skill;

// Re-export core types from raconteur-ai at crate root
pub use raconteur_ai::tools::error::{Result, ToolError};
pub use raconteur_ai::tools::traits::{
    SecretResolver, Tool, ToolErrorCategory, ToolOutput, ToolSchema, check_security,
};
pub use raconteur_ai::tools::registry::ToolRegistry;
pub use raconteur_ai::tools::toolset::{Toolset, ToolsetContext};
pub use raconteur_ai::tools::wrapper::{RateLimitWrapper, TimeoutWrapper, ToolWrapper, WrappedTool};

// Re-export security types (implemented locally / in raconteur-traits)
pub use security::{
    NetworkAllowlist, NetworkEcosystem, SecurityDecision, SecurityGate, ToolAction,
    resolve_and_validate_url, validate_url,
};

// Re-export tool implementations
pub use impls::{
    HttpTool, JinaReaderTool, MemorySearchMatch, MemorySearchTool, SemanticMemory, SwitchModelTool,
    ToolRegistryBuilder, TranscribeConfig, TranscribeTool, VisionTool, WebFetchTool, WebSearchTool,
    default_registry,
};

// Re-export skill types from raconteur-traits
pub use raconteur_traits::skill::{SkillContent, SkillInfo, SkillProvider, SkillRecord, SkillUpdate};
pub use skill::loader::register_skills;
pub use skill::tool::SkillAsTool;

// Re-export security implementations
pub use security::bash_security::{BashSecurityChecker, BashSecurityConfig, SecurityCheckResult};

// Re-export http client utilities
pub use http_client::{build_http_client, build_ssrf_safe_client};
