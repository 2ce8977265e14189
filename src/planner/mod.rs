//! Planner - adapts LLM calls into the scheduler's four operations:
//! decompose a node, execute a leaf, synthesise child results, and verify
//! the final outcome.
//!
//! Every LLM round-trip is recorded on the node it serves, including
//! failed attempts, so the call history survives in checkpoints.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm::{ChatMessage, LlmClient, LlmError};
use crate::tools::{ToolContext, ToolRegistry};
use crate::tree::{
    ExecutionMode, LlmCallRecord, LogLevel, TaskNode, TaskResult, VerificationAttempt,
};

pub mod prompts;

/// Maximum attempts for a leaf execution call
const MAX_EXECUTE_ATTEMPTS: u32 = 3;

/// Delay between leaf execution attempts
const EXECUTE_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Maximum verification rounds before giving up
const MAX_VERIFICATION_ROUNDS: u32 = 5;

/// Token the verifier must include to signal a pass
const VERIFICATION_PASSED_TOKEN: &str = "VERIFICATION_PASSED";

/// Planned decomposition of a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePlan {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub goal: String,
    /// Prefer parallel when the reply leaves the mode ambiguous
    #[serde(default = "default_plan_mode")]
    pub execution_mode: ExecutionMode,
    #[serde(default)]
    pub subtasks: Vec<SubTaskPlan>,
    #[serde(default)]
    pub reasoning: String,
}

fn default_plan_mode() -> ExecutionMode {
    ExecutionMode::Parallel
}

/// One planned sub-task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTaskPlan {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub can_decompose: bool,
}

/// Outcome of the iterative verifier
#[derive(Debug, Clone)]
pub struct Verification {
    pub passed: bool,
    pub feedback: String,
}

/// LLM adapter for planning, execution, synthesis, and verification
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>) -> Self {
        Self { llm, tools }
    }

    /// Ask the LLM how to decompose a node. A parse failure is not an
    /// error: it degrades to an empty sub-task list, meaning "execute as
    /// a leaf". Transport failures propagate.
    pub async fn plan_node(&self, node: &Arc<TaskNode>) -> Result<NodePlan> {
        let prompt = prompts::node_planning(
            &node.title,
            &node.description,
            &node.goal,
            &node.llm_context(),
            &self.tools.descriptions(),
        );
        let messages = vec![
            ChatMessage::system(prompts::PLANNING_SYSTEM),
            ChatMessage::user(prompt),
        ];

        let response = self
            .call_recorded(node, "plan", messages)
            .await
            .map_err(|e| eyre!("LLM planning failed: {e}"))?;

        match parse_plan_response(&response) {
            Ok(plan) => Ok(plan),
            Err(e) => {
                node.add_log(
                    LogLevel::Warn,
                    "planning",
                    format!("failed to parse planning reply, executing as leaf: {e}"),
                );
                Ok(NodePlan {
                    title: node.title.clone(),
                    goal: node.goal.clone(),
                    execution_mode: ExecutionMode::Sequential,
                    subtasks: Vec::new(),
                    reasoning: String::new(),
                })
            }
        }
    }

    /// Execute a leaf node through a tool-augmented LLM call, retrying
    /// the full request on transport errors.
    pub async fn execute_node(&self, node: &Arc<TaskNode>) -> Result<TaskResult> {
        let prompt = prompts::node_execution(&node.title, &node.description, &node.goal, &node.llm_context());
        let messages = vec![
            ChatMessage::system(prompts::EXECUTION_SYSTEM),
            ChatMessage::user(prompt),
        ];

        let mut last_error = None;
        for attempt in 0..MAX_EXECUTE_ATTEMPTS {
            let call_type = if attempt == 0 {
                "execute".to_string()
            } else {
                format!("execute_retry_{attempt}")
            };

            match self.call_recorded(node, &call_type, messages.clone()).await {
                Ok(response) => {
                    let summary = summarize(&response);
                    return Ok(TaskResult::ok(response, summary));
                }
                Err(e) => {
                    if attempt + 1 < MAX_EXECUTE_ATTEMPTS {
                        node.add_log(
                            LogLevel::Warn,
                            "retry",
                            format!(
                                "LLM execution failed, retrying ({}/{}): {e}",
                                attempt + 1,
                                MAX_EXECUTE_ATTEMPTS
                            ),
                        );
                        tokio::time::sleep(EXECUTE_RETRY_DELAY).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(eyre!(
            "LLM execution failed after {MAX_EXECUTE_ATTEMPTS} attempts: {}",
            last_error.map(|e| e.to_string()).unwrap_or_default()
        ))
    }

    /// Merge child summaries into one paragraph for the parent. A
    /// transport failure propagates; the executor falls back to a plain
    /// count-based summary.
    pub async fn synthesize_results(&self, node: &Arc<TaskNode>, summaries: &[String]) -> Result<String> {
        if summaries.is_empty() {
            return Ok("No sub-task results".to_string());
        }

        let child_results = summaries.join("\n");
        let prompt = prompts::result_synthesis(&node.title, &node.goal, &child_results);
        let messages = vec![
            ChatMessage::system(prompts::SYNTHESIS_SYSTEM),
            ChatMessage::user(prompt),
        ];

        self.call_recorded(node, "synthesize", messages)
            .await
            .map_err(|e| eyre!("LLM synthesis failed: {e}"))
    }

    /// Iteratively verify a result, asking the LLM to revise it on each
    /// failed round. Every attempt is recorded on the node.
    pub async fn verify_result(&self, node: &Arc<TaskNode>, result: &str) -> Result<Verification> {
        node.update_verification(|v| {
            v.passed = false;
            v.iterations = 0;
            v.attempts.clear();
        });

        let mut current_result = result.to_string();

        for round in 1..=MAX_VERIFICATION_ROUNDS {
            info!(node_id = %node.id, round, "verifying task result");
            node.add_log(LogLevel::Info, "verification", format!("verification round {round}"));

            let prompt = prompts::verification(&node.title, &node.goal, &current_result);
            let messages = vec![
                ChatMessage::system(prompts::VERIFICATION_SYSTEM),
                ChatMessage::user(prompt),
            ];

            let response = match self.call_recorded(node, "verify", messages).await {
                Ok(r) => r,
                Err(e) => {
                    node.update_verification(|v| {
                        v.iterations = round;
                        v.attempts.push(VerificationAttempt {
                            iteration: round,
                            passed: false,
                            feedback: format!("verification call failed: {e}"),
                            timestamp: Utc::now(),
                        });
                    });
                    return Err(eyre!("verification call failed: {e}"));
                }
            };

            if response.contains(VERIFICATION_PASSED_TOKEN) {
                node.add_log(LogLevel::Info, "verification", "verification passed");
                node.update_verification(|v| {
                    v.passed = true;
                    v.iterations = round;
                    v.attempts.push(VerificationAttempt {
                        iteration: round,
                        passed: true,
                        feedback: summarize(&response),
                        timestamp: Utc::now(),
                    });
                });
                return Ok(Verification {
                    passed: true,
                    feedback: response,
                });
            }

            warn!(node_id = %node.id, round, "verification round failed");
            node.add_log(
                LogLevel::Warn,
                "verification",
                format!("verification failed: {}", summarize(&response)),
            );
            node.update_verification(|v| {
                v.iterations = round;
                v.attempts.push(VerificationAttempt {
                    iteration: round,
                    passed: false,
                    feedback: summarize(&response),
                    timestamp: Utc::now(),
                });
            });

            // Ask for a revised result and verify that in the next round
            if round < MAX_VERIFICATION_ROUNDS {
                let revise_prompt = prompts::revision(&node.title, &node.goal, &current_result, &response);
                let revise_messages = vec![
                    ChatMessage::system(prompts::EXECUTION_SYSTEM),
                    ChatMessage::user(revise_prompt),
                ];

                match self.call_recorded(node, "verify", revise_messages).await {
                    Ok(improved) => {
                        current_result = improved;
                        node.add_log(LogLevel::Info, "verification", "result revised from feedback");
                    }
                    Err(e) => {
                        node.add_log(LogLevel::Error, "verification", format!("revision failed: {e}"));
                    }
                }
            }
        }

        Ok(Verification {
            passed: false,
            feedback: "max iterations reached".to_string(),
        })
    }

    /// Send a conversation and record the round-trip on the node,
    /// including the error text when the call fails.
    async fn call_recorded(
        &self,
        node: &Arc<TaskNode>,
        call_type: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<String, LlmError> {
        let ctx = match node.output_path() {
            Some(path) => ToolContext::new(path, node.id.clone()),
            None => ToolContext::detached(node.id.clone()),
        };

        let start_time = Utc::now();
        let started = Instant::now();
        let result = self.llm.send_sync(&ctx, messages.clone()).await;
        let duration_ms = started.elapsed().as_millis() as i64;

        let response = match &result {
            Ok(text) => text.clone(),
            Err(e) => format!("error: {e}"),
        };

        node.add_llm_call(LlmCallRecord {
            call_type: call_type.to_string(),
            messages: messages
                .iter()
                .map(|m| serde_json::to_value(m).unwrap_or_default())
                .collect(),
            response,
            start_time,
            duration_ms,
        });

        result
    }
}

/// Derive a short root title from a free-form task description: the
/// first clause, capped at 50 characters.
pub fn extract_task_title(description: &str) -> String {
    const MAX_LEN: usize = 50;
    const PUNCTUATION: &[char] = &['.', ',', ';', ':', '?', '!', '\n'];

    let chars: Vec<char> = description.chars().collect();
    let max = chars.len().min(MAX_LEN);

    let mut end = max;
    for (i, c) in chars.iter().take(max).enumerate() {
        if PUNCTUATION.contains(c) && i > 0 {
            end = i;
            break;
        }
    }

    let mut title: String = chars[..end].iter().collect();
    if chars.len() > end {
        title.push_str("...");
    }
    title.trim().to_string()
}

/// First 100 characters of a response, with an ellipsis when truncated
fn summarize(response: &str) -> String {
    let mut chars = response.chars();
    let head: String = chars.by_ref().take(100).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Parse a planning reply, tolerating markdown code fences
fn parse_plan_response(response: &str) -> Result<NodePlan> {
    let cleaned = clean_json_response(response);
    serde_json::from_str(cleaned).map_err(|e| eyre!("JSON parse failed: {e}"))
}

/// Strip code-fence wrappers and extract the first balanced JSON object
fn clean_json_response(response: &str) -> &str {
    let mut text = response.trim();
    text = text.strip_prefix("```json").unwrap_or(text);
    text = text.strip_prefix("```").unwrap_or(text);
    text = text.strip_suffix("```").unwrap_or(text);
    text = text.trim();

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            return &text[start..=end];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_short_response() {
        assert_eq!(summarize("short"), "short");
    }

    #[test]
    fn test_summarize_truncates_at_100_chars() {
        let long: String = "x".repeat(150);
        let summary = summarize(&long);
        assert_eq!(summary.chars().count(), 103);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_summarize_counts_chars_not_bytes() {
        let long: String = "ü".repeat(120);
        let summary = summarize(&long);
        assert_eq!(summary.chars().count(), 103);
    }

    #[test]
    fn test_clean_json_strips_fences() {
        let raw = "```json\n{\"title\": \"t\"}\n```";
        assert_eq!(clean_json_response(raw), "{\"title\": \"t\"}");
    }

    #[test]
    fn test_clean_json_extracts_object_from_prose() {
        let raw = "Here is the plan:\n{\"title\": \"t\"} hope it helps";
        assert_eq!(clean_json_response(raw), "{\"title\": \"t\"}");
    }

    #[test]
    fn test_parse_plan_defaults_to_parallel() {
        let plan = parse_plan_response(r#"{"title": "t", "subtasks": []}"#).unwrap();
        assert_eq!(plan.execution_mode, ExecutionMode::Parallel);
    }

    #[test]
    fn test_parse_plan_with_subtasks() {
        let raw = r#"{
            "title": "research",
            "goal": "learn",
            "execution_mode": "sequential",
            "subtasks": [
                {"title": "a", "description": "da", "goal": "ga", "tools": ["save_to_disk"], "can_decompose": false},
                {"title": "b", "description": "db", "goal": "gb", "tools": [], "can_decompose": true}
            ],
            "reasoning": "b needs a"
        }"#;

        let plan = parse_plan_response(raw).unwrap();
        assert_eq!(plan.execution_mode, ExecutionMode::Sequential);
        assert_eq!(plan.subtasks.len(), 2);
        assert_eq!(plan.subtasks[0].tools, vec!["save_to_disk"]);
        assert!(plan.subtasks[1].can_decompose);
    }

    #[test]
    fn test_parse_plan_rejects_garbage() {
        assert!(parse_plan_response("not json at all").is_err());
    }

    #[test]
    fn test_extract_task_title_stops_at_punctuation() {
        assert_eq!(
            extract_task_title("Research LLM schedulers. Then write a report."),
            "Research LLM schedulers..."
        );
    }

    #[test]
    fn test_extract_task_title_short_description() {
        assert_eq!(extract_task_title("quick task"), "quick task");
    }

    #[test]
    fn test_extract_task_title_caps_length() {
        let long = "a".repeat(120);
        let title = extract_task_title(&long);
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
    }
}
