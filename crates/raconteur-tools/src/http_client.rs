//! HTTP client utilities - re-exported from raconteur-ai for backward compatibility.

pub use raconteur_ai::http_client::{build_http_client, build_ssrf_safe_client};
