//! Tool trait and types - re-exported from raconteur-ai for backward compatibility.

pub use raconteur_ai::tools::traits::{
    SecretResolver, Tool, ToolErrorCategory, ToolOutput, ToolSchema, check_security,
};
