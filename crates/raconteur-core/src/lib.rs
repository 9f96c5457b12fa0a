//! Composition root: wires a concrete `LlmClient`, a tool contract
//! registry, and the durable storage layer into one runnable
//! `EnhancedReActRunner`.
//!
//! Everything this crate depends on is a trait object injected through
//! `AppCore::new` — no hidden globals (§9 Design Notes, "Global mutable
//! state"). This crate is deliberately thin: the web UI, auth, HTTP
//! routing, and persistence schemas the teacher's `AppCore` also wired up
//! belong to the surrounding product surface this workspace no longer
//! carries (see DESIGN.md).

pub mod paths;

use std::sync::Arc;

use anyhow::Result;
use raconteur_ai::agent::reasoning::{ContractRegistry, EnhancedReActRunner, RunnerConfig};
use raconteur_ai::llm::LlmClient;
use raconteur_storage::Storage;
use tracing::info;

/// Application state shared across a single agent process: durable storage
/// plus the assembled reasoning runner.
pub struct AppCore {
    pub storage: Arc<Storage>,
    pub runner: Arc<EnhancedReActRunner>,
}

impl AppCore {
    /// Assemble the runtime from a database path, a concrete LLM client,
    /// a tool contract registry, and the runner's tunable budgets. The
    /// caller (a host binary, a test harness) chooses the LLM provider and
    /// populates the registry — this crate never reaches for a default
    /// vendor SDK.
    pub fn new(
        db_path: &str,
        llm: Arc<dyn LlmClient>,
        tools: Arc<ContractRegistry>,
        config: RunnerConfig,
    ) -> Result<Self> {
        let storage = Arc::new(Storage::new(db_path)?);
        info!("initializing reasoning runtime");
        let runner = Arc::new(EnhancedReActRunner::new(llm, tools).with_config(config));
        Ok(Self { storage, runner })
    }

    /// Assemble the runtime with an empty tool registry and default
    /// budgets — useful for conversational-only hosts that haven't wired
    /// any tools yet.
    pub fn with_defaults(db_path: &str, llm: Arc<dyn LlmClient>) -> Result<Self> {
        Self::new(db_path, llm, Arc::new(ContractRegistry::new()), RunnerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raconteur_ai::llm::{MockLlmClient, MockStep};

    #[test]
    fn with_defaults_assembles_a_runnable_core() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("raconteur.db");
        let llm = Arc::new(MockLlmClient::from_steps("mock", vec![MockStep::text("hi")]));
        let core = AppCore::with_defaults(db_path.to_str().unwrap(), llm).unwrap();
        assert!(Arc::strong_count(&core.runner) >= 1);
    }
}
