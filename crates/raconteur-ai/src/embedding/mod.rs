//! Embedding providers and utilities.

mod cache;
mod openai;
mod provider;
mod voyage;

pub use cache::EmbeddingCache;
pub use openai::OpenAIEmbedding;
pub use provider::{EmbeddingConfig, EmbeddingProvider};
pub use voyage::VoyageEmbedding;
