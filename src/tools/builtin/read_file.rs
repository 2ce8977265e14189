//! read_file tool - read a document from the node's output directory

use std::path::{Component, Path};

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{Tool, ToolContext, ToolError};

/// Read a previously saved document
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read a file from the task's output directory, e.g. a document saved earlier."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "File name relative to the output directory"
                }
            },
            "required": ["filename"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let filename = match input["filename"].as_str() {
            Some(f) if !f.is_empty() => f,
            _ => return Err(ToolError::InvalidParameter("filename")),
        };

        // Reject traversal outside the output directory
        let relative = Path::new(filename);
        if relative.is_absolute() || relative.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(ToolError::PathOutsideOutputDir(relative.to_path_buf()));
        }

        let output_dir = ctx.require_output_path()?.to_path_buf();

        tokio::fs::read_to_string(output_dir.join(relative))
            .await
            .map_err(|e| ToolError::io(format!("failed to read {}", filename), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_read_existing_file() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("notes.md"), "hello").unwrap();
        let ctx = ToolContext::new(temp.path(), "node1234");

        let content = ReadFileTool
            .execute(serde_json::json!({"filename": "notes.md"}), &ctx)
            .await
            .unwrap();
        assert_eq!(content, "hello");
    }

    #[tokio::test]
    async fn test_read_rejects_traversal() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path(), "node1234");

        let err = ReadFileTool
            .execute(serde_json::json!({"filename": "../escape.md"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PathOutsideOutputDir(_)));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path(), "node1234");

        let err = ReadFileTool
            .execute(serde_json::json!({"filename": "missing.md"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Io { .. }));
    }
}
