//! save_to_disk tool - persist generated content under the node's output directory

use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolError};

/// Save content to a markdown file in the calling node's output directory
pub struct SaveToDiskTool;

/// Replace characters that are unsafe in filenames
fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '_',
            other => other,
        })
        .collect();
    sanitized.chars().take(50).collect()
}

#[async_trait]
impl Tool for SaveToDiskTool {
    fn name(&self) -> &'static str {
        "save_to_disk"
    }

    fn description(&self) -> &'static str {
        "Save content to a local file. Use for generated documents, search results, or anything that should persist."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Document title, used as part of the filename"
                },
                "content": {
                    "type": "string",
                    "description": "Content to save"
                }
            },
            "required": ["title", "content"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let title = match input["title"].as_str() {
            Some(t) if !t.is_empty() => t,
            _ => return Err(ToolError::InvalidParameter("title")),
        };
        let content = input["content"]
            .as_str()
            .ok_or(ToolError::InvalidParameter("content"))?;

        let output_dir = ctx.require_output_path()?.to_path_buf();

        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| ToolError::io("failed to create output directory", e))?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{}_{}.md", sanitize_filename(title), timestamp);
        let path = output_dir.join(&filename);

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ToolError::io("failed to write file", e))?;

        debug!(path = %path.display(), bytes = content.len(), "saved document");
        Ok(format!("Content saved to file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b:c d"), "a_b_c_d");
        let long = "x".repeat(80);
        assert_eq!(sanitize_filename(&long).len(), 50);
    }

    #[tokio::test]
    async fn test_save_writes_markdown_file() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().join("doc"), "node1234");

        let reply = SaveToDiskTool
            .execute(
                serde_json::json!({"title": "Findings", "content": "# Findings\n\ntext"}),
                &ctx,
            )
            .await
            .unwrap();

        assert!(reply.contains("Content saved"));
        let entries: Vec<_> = std::fs::read_dir(temp.path().join("doc")).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].as_ref().unwrap().file_name().into_string().unwrap();
        assert!(name.starts_with("Findings_"));
        assert!(name.ends_with(".md"));
    }

    #[tokio::test]
    async fn test_save_requires_title() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path(), "node1234");

        let err = SaveToDiskTool
            .execute(serde_json::json!({"content": "x"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameter("title")));
    }

    #[tokio::test]
    async fn test_save_requires_output_path() {
        let ctx = ToolContext::detached("node1234");

        let err = SaveToDiskTool
            .execute(serde_json::json!({"title": "t", "content": "c"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NoOutputDirectory));
    }
}
