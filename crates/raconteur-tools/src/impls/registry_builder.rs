//! Assembles a [`ToolRegistry`] from the tools this crate provides.

use std::sync::Arc;

use raconteur_ai::tools::ToolRegistry;
use raconteur_traits::LlmSwitcher;

use super::http::HttpTool;
use super::jina_reader::JinaReaderTool;
use super::memory_search::{EmbeddingProvider, MemorySearchTool, SemanticMemory};
use super::switch_model::SwitchModelTool;
use super::transcribe::TranscribeTool;
use super::vision::VisionTool;
use super::web_fetch::WebFetchTool;
use super::web_search::WebSearchTool;
use crate::SecretResolver;

/// Builds a [`ToolRegistry`] populated with the tools the caller opts into.
///
/// `http`, `jina_reader`, and `web_fetch` have no external dependencies and
/// are included by default. Voice, memory, and model-switching tools need a
/// collaborator (a secret resolver, an embedding provider, an `LlmSwitcher`)
/// and must be attached explicitly.
#[derive(Default)]
pub struct ToolRegistryBuilder {
    with_http: bool,
    with_jina_reader: bool,
    with_web_fetch: bool,
    web_search_resolver: Option<SecretResolver>,
    transcribe_resolver: Option<SecretResolver>,
    vision_resolver: Option<SecretResolver>,
    memory: Option<(Arc<dyn SemanticMemory>, Arc<dyn EmbeddingProvider>)>,
    switcher: Option<Arc<dyn LlmSwitcher>>,
}

impl ToolRegistryBuilder {
    pub fn new() -> Self {
        Self {
            with_http: true,
            with_jina_reader: true,
            with_web_fetch: true,
            ..Default::default()
        }
    }

    pub fn without_http(mut self) -> Self {
        self.with_http = false;
        self
    }

    pub fn without_jina_reader(mut self) -> Self {
        self.with_jina_reader = false;
        self
    }

    pub fn without_web_fetch(mut self) -> Self {
        self.with_web_fetch = false;
        self
    }

    pub fn with_web_search(mut self, resolver: SecretResolver) -> Self {
        self.web_search_resolver = Some(resolver);
        self
    }

    pub fn with_transcribe(mut self, resolver: SecretResolver) -> Self {
        self.transcribe_resolver = Some(resolver);
        self
    }

    pub fn with_vision(mut self, resolver: SecretResolver) -> Self {
        self.vision_resolver = Some(resolver);
        self
    }

    pub fn with_memory_search(
        mut self,
        memory: Arc<dyn SemanticMemory>,
        embedding: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        self.memory = Some((memory, embedding));
        self
    }

    pub fn with_switch_model(mut self, switcher: Arc<dyn LlmSwitcher>) -> Self {
        self.switcher = Some(switcher);
        self
    }

    pub fn build(self) -> std::result::Result<ToolRegistry, reqwest::Error> {
        let mut registry = ToolRegistry::new();

        if self.with_http {
            registry.register(HttpTool::new()?);
        }
        if self.with_jina_reader {
            registry.register(JinaReaderTool::new());
        }
        if self.with_web_fetch {
            registry.register(WebFetchTool::new());
        }

        let mut web_search = WebSearchTool::new()?;
        if let Some(resolver) = self.web_search_resolver {
            web_search = web_search.with_secret_resolver(resolver);
        }
        registry.register(web_search);

        if let Some(resolver) = self.transcribe_resolver {
            registry.register(TranscribeTool::new(resolver)?);
        }
        if let Some(resolver) = self.vision_resolver {
            registry.register(VisionTool::new(resolver));
        }
        if let Some((memory, embedding)) = self.memory {
            registry.register(MemorySearchTool::new(memory, embedding));
        }
        if let Some(switcher) = self.switcher {
            registry.register(SwitchModelTool::new(switcher));
        }

        Ok(registry)
    }
}

/// Registry with only the dependency-free tools (http, jina reader, web
/// fetch, web search without a secret resolver). Callers add voice, memory,
/// and model-switching tools once their collaborators are wired up.
pub fn default_registry() -> std::result::Result<ToolRegistry, reqwest::Error> {
    ToolRegistryBuilder::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_includes_dependency_free_tools() {
        let registry = default_registry().expect("registry should build");
        assert!(registry.has("http_request"));
        assert!(registry.has("web_search"));
    }

    #[test]
    fn without_http_omits_the_http_tool() {
        let registry = ToolRegistryBuilder::new()
            .without_http()
            .build()
            .expect("registry should build");
        assert!(!registry.has("http_request"));
    }
}
