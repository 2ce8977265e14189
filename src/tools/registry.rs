//! ToolRegistry - the set of tools available to the LLM

use std::collections::HashMap;

use tracing::debug;

use crate::llm::ToolSpec;

use super::builtin::{ListDirectoryTool, ReadFileTool, SaveToDiskTool};
use super::{Tool, ToolContext, ToolOutcome};

/// Registry of callable tools
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a registry with the standard tools
    pub fn standard() -> Self {
        let mut tools: HashMap<String, Box<dyn Tool>> = HashMap::new();

        tools.insert("save_to_disk".into(), Box::new(SaveToDiskTool));
        tools.insert("read_file".into(), Box::new(ReadFileTool));
        tools.insert("list_directory".into(), Box::new(ListDirectoryTool));

        Self { tools }
    }

    /// Create an empty registry (for testing)
    pub fn empty() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Add a tool to the registry
    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Specs for every registered tool, for advertising to the LLM
    pub fn available(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .tools
            .values()
            .map(|t| ToolSpec::function(t.name(), t.description(), t.parameters()))
            .collect();
        specs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        specs
    }

    /// One-line name + description list for planning prompts
    pub fn descriptions(&self) -> String {
        if self.tools.is_empty() {
            return "No tools available".to_string();
        }
        let mut lines: Vec<String> = self
            .tools
            .values()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect();
        lines.sort();
        lines.join("\n")
    }

    /// Execute a tool by name. Tool errors are rendered here so the LLM
    /// sees them as conversation content, never as a failure.
    pub async fn call(&self, name: &str, args: serde_json::Value, ctx: &ToolContext) -> ToolOutcome {
        debug!(tool = %name, node_id = %ctx.node_id, "tool call");
        match self.tools.get(name) {
            Some(tool) => tool.execute(args, ctx).await.into(),
            None => ToolOutcome::error(format!("Unknown tool: {}", name)),
        }
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_has_builtins() {
        let registry = ToolRegistry::standard();
        assert!(registry.has_tool("save_to_disk"));
        assert!(registry.has_tool("read_file"));
        assert!(registry.has_tool("list_directory"));
    }

    #[test]
    fn test_available_specs_sorted() {
        let registry = ToolRegistry::standard();
        let specs = registry.available();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].function.name, "list_directory");
    }

    #[test]
    fn test_descriptions_for_empty_registry() {
        let registry = ToolRegistry::empty();
        assert_eq!(registry.descriptions(), "No tools available");
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let registry = ToolRegistry::standard();
        let ctx = ToolContext::detached("test");

        let outcome = registry.call("does_not_exist", serde_json::json!({}), &ctx).await;
        assert!(outcome.is_error);
        assert!(outcome.content.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_call_renders_tool_error_as_outcome() {
        let registry = ToolRegistry::standard();
        let ctx = ToolContext::detached("test");

        // No output directory in the context; the error must come back
        // as conversation content, not a failure
        let outcome = registry
            .call("save_to_disk", serde_json::json!({"title": "t", "content": "c"}), &ctx)
            .await;
        assert!(outcome.is_error);
        assert!(outcome.content.contains("output directory"));
    }
}
