//! Records attached to task nodes: results, logs, LLM calls, verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a node execution log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A single timestamped entry in a node's execution log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub time: DateTime<Utc>,
    pub level: LogLevel,
    /// Phase tag, e.g. "planning", "executing", "retry", "verification"
    pub phase: String,
    pub message: String,
    pub node_id: String,
}

/// Outcome of executing a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
}

impl TaskResult {
    /// Create a successful result
    pub fn ok(output: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            summary: summary.into(),
            ..Default::default()
        }
    }

    /// Create a failed result carrying only an error message
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            ..Default::default()
        }
    }
}

/// Verification state accumulated by the iterative verifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationInfo {
    pub passed: bool,
    pub iterations: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<VerificationAttempt>,
}

/// One round of verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationAttempt {
    pub iteration: u32,
    pub passed: bool,
    pub feedback: String,
    pub timestamp: DateTime<Utc>,
}

/// A recorded LLM round-trip on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmCallRecord {
    /// "plan", "execute", "synthesize", "verify", or "execute_retry_<k>"
    #[serde(rename = "type")]
    pub call_type: String,
    /// The request messages as sent, role/content pairs
    pub messages: Vec<serde_json::Value>,
    pub response: String,
    pub start_time: DateTime<Utc>,
    pub duration_ms: i64,
}
