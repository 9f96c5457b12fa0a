//! AI Tools module
//!
//! Core abstractions (Tool trait, ToolError, ToolRegistry, wrappers) are
//! defined here, ahead of the `LlmClient` request/response boundary.
//! Concrete tool implementations (memory, web, voice, diagnostics, ...)
//! live in `raconteur-tools`.

pub mod error;
pub mod filtered;
pub mod registry;
pub mod toolset;
pub mod traits;
pub mod wrapper;

pub use error::{Result as ToolResult, ToolError};
pub use filtered::FilteredToolset;
pub use registry::ToolRegistry;
pub use toolset::{Toolset, ToolsetContext};
pub use traits::{SecretResolver, Tool, ToolErrorCategory, ToolOutput, ToolSchema, check_security};
pub use wrapper::{RateLimitWrapper, TimeoutWrapper, ToolWrapper, WrappedTool};
