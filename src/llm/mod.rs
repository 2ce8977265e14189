//! LLM transport: the client trait and the OpenAI-compatible implementation.

use std::sync::Arc;

use tracing::debug;

mod client;
mod error;
mod openai;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{ChatMessage, FunctionCall, FunctionSpec, Role, ToolCallRequest, ToolSpec};

use crate::config::LlmConfig;
use crate::tools::ToolRegistry;

/// Create an LLM client for the provider named in the config
pub fn create_client(config: &LlmConfig, tools: Arc<ToolRegistry>) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "creating LLM client");
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIClient::from_config(config, tools)?)),
        other => Err(LlmError::InvalidResponse(format!(
            "Unknown LLM provider: '{}'. Supported: openai",
            other
        ))),
    }
}
