//! Built-in tool implementations.

pub mod http;
pub mod jina_reader;
pub mod memory_search;
pub mod registry_builder;
pub mod switch_model;
pub mod transcribe;
pub mod vision;
pub mod web_fetch;
pub mod web_search;

pub use http::HttpTool;
pub use jina_reader::JinaReaderTool;
pub use memory_search::{MemorySearchMatch, MemorySearchTool, SemanticMemory};
pub use registry_builder::{ToolRegistryBuilder, default_registry};
pub use switch_model::SwitchModelTool;
pub use transcribe::{TranscribeConfig, TranscribeTool};
pub use vision::VisionTool;
pub use web_fetch::WebFetchTool;
pub use web_search::WebSearchTool;
