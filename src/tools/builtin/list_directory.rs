//! list_directory tool - list documents in the node's output directory

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{Tool, ToolContext, ToolError};

/// List the files in the task's output directory
pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    fn description(&self) -> &'static str {
        "List files in the task's output directory."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let output_dir = ctx.require_output_path()?.to_path_buf();

        let mut entries = tokio::fs::read_dir(&output_dir)
            .await
            .map_err(|e| ToolError::io("failed to list directory", e))?;

        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        if names.is_empty() {
            Ok("(directory is empty)".to_string())
        } else {
            Ok(names.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_list_directory_sorted() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("b.md"), "").unwrap();
        std::fs::write(temp.path().join("a.md"), "").unwrap();
        let ctx = ToolContext::new(temp.path(), "node1234");

        let listing = ListDirectoryTool.execute(serde_json::json!({}), &ctx).await.unwrap();
        assert_eq!(listing, "a.md\nb.md");
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path(), "node1234");

        let listing = ListDirectoryTool.execute(serde_json::json!({}), &ctx).await.unwrap();
        assert!(listing.contains("empty"));
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_io_error() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().join("nope"), "node1234");

        let err = ListDirectoryTool.execute(serde_json::json!({}), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::Io { .. }));
    }
}
