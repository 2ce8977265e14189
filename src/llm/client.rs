//! LLM client trait

use async_trait::async_trait;

use crate::tools::ToolContext;

use super::error::LlmError;
use super::types::ChatMessage;

/// A synchronous (request/response) LLM transport.
///
/// Implementations resolve tool calls internally: the model may request
/// registered tools, whose results are fed back into the conversation
/// until a plain-text reply is produced. The [`ToolContext`] carries the
/// calling node's output path so tools write to the right directory.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn send_sync(&self, ctx: &ToolContext, messages: Vec<ChatMessage>) -> Result<String, LlmError>;
}
