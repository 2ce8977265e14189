//! Tool error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by tool execution. These never propagate past the
/// LLM client: the registry renders them into the conversation so the
/// model can recover.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("missing or invalid '{0}' parameter")]
    InvalidParameter(&'static str),

    #[error("output directory not set in tool context")]
    NoOutputDirectory,

    #[error("path must stay inside the output directory: {}", .0.display())]
    PathOutsideOutputDir(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Wrap an IO error with a short description of the failed operation
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
