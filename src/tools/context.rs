//! ToolContext - execution context for tool calls
//!
//! Each node gets its own context carrying the node's output directory.
//! Tools discover where to write through it, never through global state.

use std::path::{Path, PathBuf};

use super::error::ToolError;

/// Execution context for tools, scoped to a single node
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The node's output directory; artefacts land here
    pub output_path: Option<PathBuf>,

    /// Id of the node on whose behalf tools run
    pub node_id: String,
}

impl ToolContext {
    pub fn new(output_path: impl Into<PathBuf>, node_id: impl Into<String>) -> Self {
        Self {
            output_path: Some(output_path.into()),
            node_id: node_id.into(),
        }
    }

    /// A context without an output directory (tools that need one will
    /// report an error to the LLM)
    pub fn detached(node_id: impl Into<String>) -> Self {
        Self {
            output_path: None,
            node_id: node_id.into(),
        }
    }

    /// The output directory, or an error for the LLM
    pub fn require_output_path(&self) -> Result<&Path, ToolError> {
        self.output_path.as_deref().ok_or(ToolError::NoOutputDirectory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_output_path() {
        let ctx = ToolContext::new("/tmp/out", "abc12345");
        assert_eq!(ctx.require_output_path().unwrap(), Path::new("/tmp/out"));

        let ctx = ToolContext::detached("abc12345");
        assert!(matches!(ctx.require_output_path(), Err(ToolError::NoOutputDirectory)));
    }
}
