//! Tool trait definition

use async_trait::async_trait;
use serde_json::Value;

use super::context::ToolContext;
use super::error::ToolError;

/// A tool that can be called by the LLM during node execution
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (matches the function name advertised to the LLM)
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters
    fn parameters(&self) -> Value;

    /// Execute the tool. Errors are rendered into the LLM conversation
    /// by the registry, never propagated further.
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError>;
}

/// Result of a tool execution, fed back into the LLM conversation
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutcome {
    /// Create a successful result
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

impl From<Result<String, ToolError>> for ToolOutcome {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(content) => ToolOutcome::success(content),
            Err(e) => ToolOutcome::error(e.to_string()),
        }
    }
}
