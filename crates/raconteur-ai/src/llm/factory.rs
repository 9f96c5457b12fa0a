//! LLM client factory for dynamic model creation.
//!
//! Picks a concrete [`LlmClient`] adapter for a named model, resolving the
//! API key and (for OpenAI-compatible providers) the base URL to hit. The
//! reasoning runtime never constructs a client directly — it only depends on
//! the `LlmClient` trait — but a host process needs something to hand the
//! runner, and this factory is the idiomatic way the teacher wires that up.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AiError, Result};
use crate::llm::{AnthropicClient, LlmClient, OpenAIClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
    DeepSeek,
    Google,
    Groq,
    OpenRouter,
    XAI,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::DeepSeek => "deepseek",
            Self::Google => "google",
            Self::Groq => "groq",
            Self::OpenRouter => "openrouter",
            Self::XAI => "xai",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Anthropic => "",
            Self::DeepSeek => "https://api.deepseek.com/v1",
            Self::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::XAI => "https://api.x.ai/v1",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub name: String,
    pub provider: LlmProvider,
    pub client_model: String,
}

impl ModelSpec {
    pub fn new(
        name: impl Into<String>,
        provider: LlmProvider,
        client_model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            client_model: client_model.into(),
        }
    }
}

pub trait LlmClientFactory: Send + Sync {
    fn create_client(&self, model: &str, api_key: Option<&str>) -> Result<Arc<dyn LlmClient>>;
    fn available_models(&self) -> Vec<String>;
    fn resolve_api_key(&self, provider: LlmProvider) -> Option<String>;
    fn provider_for_model(&self, model: &str) -> Option<LlmProvider>;
}

pub struct DefaultLlmClientFactory {
    api_keys: HashMap<LlmProvider, String>,
    models: HashMap<String, ModelSpec>,
}

impl DefaultLlmClientFactory {
    pub fn new(api_keys: HashMap<LlmProvider, String>, models: Vec<ModelSpec>) -> Self {
        let mut map = HashMap::new();
        for spec in models {
            map.insert(normalize_model_name(&spec.name), spec);
        }
        Self {
            api_keys,
            models: map,
        }
    }

    fn model_spec(&self, model: &str) -> Result<ModelSpec> {
        let key = normalize_model_name(model);
        self.models
            .get(&key)
            .cloned()
            .ok_or_else(|| AiError::Llm(format!("Unknown model '{model}'")))
    }
}

impl LlmClientFactory for DefaultLlmClientFactory {
    fn create_client(&self, model: &str, api_key: Option<&str>) -> Result<Arc<dyn LlmClient>> {
        let spec = self.model_spec(model)?;
        let key = api_key.ok_or_else(|| {
            AiError::Llm(format!("{} API key is required", spec.provider.as_str()))
        })?;

        match spec.provider {
            LlmProvider::Anthropic => {
                let client = AnthropicClient::new(key).with_model(spec.client_model);
                Ok(Arc::new(client))
            }
            provider => {
                let client = OpenAIClient::new(key)
                    .with_model(spec.client_model)
                    .with_base_url(provider.base_url());
                Ok(Arc::new(client))
            }
        }
    }

    fn available_models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.models.values().map(|spec| spec.name.clone()).collect();
        models.sort();
        models
    }

    fn resolve_api_key(&self, provider: LlmProvider) -> Option<String> {
        self.api_keys.get(&provider).cloned()
    }

    fn provider_for_model(&self, model: &str) -> Option<LlmProvider> {
        let key = normalize_model_name(model);
        self.models.get(&key).map(|spec| spec.provider)
    }
}

fn normalize_model_name(model: &str) -> String {
    model.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_is_an_error() {
        let factory = DefaultLlmClientFactory::new(HashMap::new(), vec![]);
        assert!(factory.create_client("nonexistent", Some("k")).is_err());
    }

    #[test]
    fn resolves_registered_model_case_insensitively() {
        let spec = ModelSpec::new("Claude-Haiku", LlmProvider::Anthropic, "claude-haiku-4-5");
        let factory = DefaultLlmClientFactory::new(HashMap::new(), vec![spec]);
        assert!(factory.create_client("claude-haiku", Some("sk-ant-x")).is_ok());
    }
}
