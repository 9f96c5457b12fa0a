//! Composable tool wrappers (decorators) for policy enforcement.
//!
//! Defined in raconteur-traits and re-exported here so callers can reach
//! them as `raconteur_ai::tools::wrapper::*`.

pub use raconteur_traits::wrapper::{RateLimitWrapper, TimeoutWrapper, ToolWrapper, WrappedTool};
