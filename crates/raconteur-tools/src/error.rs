//! Tool error types - re-exported from raconteur-ai for backward compatibility.

pub use raconteur_ai::tools::error::{Result, ToolError};
