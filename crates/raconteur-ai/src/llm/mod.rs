//! LLM module - Multi-provider LLM client abstraction

mod anthropic;
mod client;
mod factory;
mod mock_client;
mod openai;
mod pricing;
mod retry;
mod swappable;
mod switcher;

pub use anthropic::AnthropicClient;
pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, Role, StreamChunk,
    StreamResult, TokenUsage, ToolCall, ToolCallDelta,
};
pub use factory::{DefaultLlmClientFactory, LlmClientFactory, LlmProvider, ModelSpec};
pub use mock_client::{MockLlmClient, MockStep, MockStepKind};
pub use openai::OpenAIClient;
pub use retry::LlmRetryConfig;
pub use swappable::SwappableLlm;
pub use switcher::LlmSwitcherImpl;
