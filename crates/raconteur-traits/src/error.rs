//! Shared error type for the trait crate and its implementors.

use thiserror::Error;

/// Errors surfaced across tool execution, registries, and store adapters.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("tool error: {0}")]
    Tool(String),

    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ToolError>;
