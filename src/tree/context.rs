//! Per-node context: what a node knows about the world when it runs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::node::NodeStatus;

/// Context handed to every LLM call for a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    /// The original user request, inherited from the root
    pub user_input: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_results: Vec<ParentResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sibling_results: Vec<SiblingResult>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, serde_json::Value>,
}

/// Summary of a parent's result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentResult {
    pub node_id: String,
    pub title: String,
    pub summary: String,
}

/// Summary of a completed sibling's result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiblingResult {
    pub node_id: String,
    pub title: String,
    pub status: NodeStatus,
    pub summary: String,
}

impl TaskContext {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Default::default()
        }
    }

    pub fn add_parent_result(
        &mut self,
        node_id: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) {
        self.parent_results.push(ParentResult {
            node_id: node_id.into(),
            title: title.into(),
            summary: summary.into(),
        });
    }

    pub fn add_sibling_result(
        &mut self,
        node_id: impl Into<String>,
        title: impl Into<String>,
        status: NodeStatus,
        summary: impl Into<String>,
    ) {
        self.sibling_results.push(SiblingResult {
            node_id: node_id.into(),
            title: title.into(),
            status,
            summary: summary.into(),
        });
    }

    /// Render the context as a markdown block for LLM prompts
    pub fn build_llm_context(&self) -> String {
        let mut out = String::new();

        out.push_str("## Original user request\n");
        out.push_str(&self.user_input);
        out.push_str("\n\n");

        if !self.parent_results.is_empty() {
            out.push_str("## Parent task results\n");
            for pr in &self.parent_results {
                out.push_str(&format!("- {}: {}\n", pr.title, pr.summary));
            }
            out.push('\n');
        }

        if !self.sibling_results.is_empty() {
            out.push_str("## Completed sibling tasks\n");
            for sr in &self.sibling_results {
                out.push_str(&format!("- {} [{}]: {}\n", sr.title, sr.status, sr.summary));
            }
            out.push('\n');
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_starts_empty() {
        let ctx = TaskContext::new("do the thing");
        assert_eq!(ctx.user_input, "do the thing");
        assert!(ctx.parent_results.is_empty());
        assert!(ctx.sibling_results.is_empty());
    }

    #[test]
    fn test_build_llm_context_user_input_only() {
        let ctx = TaskContext::new("summarise X");
        let rendered = ctx.build_llm_context();
        assert!(rendered.contains("## Original user request"));
        assert!(rendered.contains("summarise X"));
        assert!(!rendered.contains("sibling"));
    }

    #[test]
    fn test_build_llm_context_with_siblings() {
        let mut ctx = TaskContext::new("root request");
        ctx.add_sibling_result("abc12345", "Gather data", NodeStatus::Done, "collected 10 items");

        let rendered = ctx.build_llm_context();
        assert!(rendered.contains("## Completed sibling tasks"));
        assert!(rendered.contains("Gather data [done]: collected 10 items"));
    }

    #[test]
    fn test_build_llm_context_with_parents() {
        let mut ctx = TaskContext::new("root request");
        ctx.add_parent_result("abc12345", "Research", "found 3 sources");

        let rendered = ctx.build_llm_context();
        assert!(rendered.contains("## Parent task results"));
        assert!(rendered.contains("Research: found 3 sources"));
    }
}
