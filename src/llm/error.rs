//! LLM transport error types

use thiserror::Error;

/// Errors surfaced by the LLM client
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API key not configured: {0}")]
    MissingApiKey(String),
}

impl LlmError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::ApiError { status, .. } => *status == 429 || *status >= 500,
            LlmError::Network(_) => true,
            LlmError::InvalidResponse(_) | LlmError::Json(_) | LlmError::MissingApiKey(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(
            LlmError::ApiError {
                status: 503,
                message: "unavailable".to_string()
            }
            .is_retryable()
        );
        assert!(
            LlmError::ApiError {
                status: 429,
                message: "slow down".to_string()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::ApiError {
                status: 400,
                message: "bad request".to_string()
            }
            .is_retryable()
        );
        assert!(!LlmError::InvalidResponse("garbage".to_string()).is_retryable());
        assert!(!LlmError::MissingApiKey("OPENAI_API_KEY".to_string()).is_retryable());
    }
}
