//! OpenAI-compatible chat-completions client with internal tool dispatch.
//!
//! One `send_sync` call may perform several HTTP round-trips: when the
//! model requests tool calls, the registered tools are executed and their
//! results appended to the conversation, up to [`MAX_TOOL_ROUNDS`] rounds.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::tools::{ToolContext, ToolRegistry};

use super::client::LlmClient;
use super::error::LlmError;
use super::types::{ChatMessage, ChatResponse, ToolCallRequest};

/// Maximum tool-dispatch rounds within a single send_sync call
const MAX_TOOL_ROUNDS: usize = 10;

/// Maximum retries for transient HTTP errors per round
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// OpenAI-compatible chat client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    temperature: f64,
    max_tokens: u32,
    http: Client,
    tools: Arc<ToolRegistry>,
}

impl OpenAIClient {
    /// Create a client from configuration, reading the API key from the
    /// configured environment variable.
    pub fn from_config(config: &LlmConfig, tools: Arc<ToolRegistry>) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| LlmError::MissingApiKey(config.api_key_env.clone()))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            http,
            tools,
        })
    }

    fn build_request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": false,
        });

        let specs = self.tools.available();
        if !specs.is_empty() {
            body["tools"] = serde_json::json!(specs);
        }

        body
    }

    /// One chat round-trip, retrying transient failures with backoff
    async fn post_round(&self, body: &serde_json::Value) -> Result<ChatResponse, LlmError> {
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "retrying chat request after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(&self.base_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                last_error = Some(LlmError::ApiError { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::ApiError { status, message: text });
            }

            let parsed: ChatResponse = response.json().await?;
            return Ok(parsed);
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("max retries exceeded".to_string())))
    }

    /// Execute the model's tool calls and append the results as tool messages
    async fn dispatch_tool_calls(
        &self,
        calls: &[ToolCallRequest],
        ctx: &ToolContext,
        messages: &mut Vec<ChatMessage>,
    ) {
        for call in calls {
            debug!(tool = %call.function.name, "dispatching tool call");

            let args: serde_json::Value =
                serde_json::from_str(&call.function.arguments).unwrap_or_else(|_| serde_json::json!({}));

            let outcome = self.tools.call(&call.function.name, args, ctx).await;
            let content = if outcome.is_error {
                format!("Error: {}", outcome.content)
            } else {
                outcome.content
            };

            messages.push(ChatMessage::tool(call.id.clone(), content));
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn send_sync(&self, ctx: &ToolContext, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let mut conversation = messages;

        for round in 0..MAX_TOOL_ROUNDS {
            debug!(round = round + 1, messages = conversation.len(), "sending chat request");

            let body = self.build_request_body(&conversation);
            let response = self.post_round(&body).await?;

            let choice = response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::InvalidResponse("empty choices in response".to_string()))?;

            if choice.message.tool_calls.is_empty() {
                return Ok(choice.message.content.unwrap_or_default());
            }

            conversation.push(ChatMessage::assistant(
                choice.message.content.unwrap_or_default(),
                choice.message.tool_calls.clone(),
            ));
            self.dispatch_tool_calls(&choice.message.tool_calls, ctx, &mut conversation)
                .await;
        }

        warn!("tool dispatch reached the round limit without a final reply");
        Ok("Tool dispatch finished (iteration limit reached)".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> OpenAIClient {
        OpenAIClient {
            model: "gpt-4o".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://api.example.com/v1/chat/completions".to_string(),
            temperature: 0.7,
            max_tokens: 8192,
            http: Client::new(),
            tools: Arc::new(ToolRegistry::empty()),
        }
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn test_build_request_body_without_tools() {
        let client = test_client();
        let body = client.build_request_body(&[ChatMessage::user("hi")]);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["stream"], false);
        assert!(body["messages"].is_array());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_build_request_body_with_tools() {
        let client = OpenAIClient {
            tools: Arc::new(ToolRegistry::standard()),
            ..test_client()
        };
        let body = client.build_request_body(&[ChatMessage::user("hi")]);

        let tools = body["tools"].as_array().unwrap();
        assert!(!tools.is_empty());
        assert_eq!(tools[0]["type"], "function");
    }
}
