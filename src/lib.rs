//! Taskweave - hierarchical LLM task orchestrator
//!
//! Taskweave takes a natural-language task, recursively decomposes it
//! into a tree of sub-tasks through an LLM, executes the leaves with
//! tool-augmented LLM calls, synthesises partial results back up the
//! tree, and verifies the final outcome. Runs checkpoint themselves to
//! disk and survive process restarts.
//!
//! # Modules
//!
//! - [`tree`] - the task tree model and its serialisable snapshots
//! - [`planner`] - LLM adapter: decompose, execute, synthesise, verify
//! - [`executor`] - the recursive scheduler and run lifecycle
//! - [`recovery`] - checkpoint scanning and tree reconstruction
//! - [`llm`] - LLM client trait and OpenAI-compatible implementation
//! - [`tools`] - tool trait, registry, and built-ins
//! - [`events`] - event sink consumed by dashboards
//! - [`supervisor`] - typed handles to running executors

pub mod cli;
pub mod config;
pub mod events;
pub mod executor;
pub mod llm;
pub mod planner;
pub mod recovery;
pub mod storage;
pub mod supervisor;
pub mod tools;
pub mod tree;

// Re-export commonly used types
pub use config::{Config, ExecutionConfig, LlmConfig};
pub use events::{BroadcastSink, Event, EventSink, NullSink};
pub use executor::TaskExecutor;
pub use llm::{ChatMessage, LlmClient, LlmError, OpenAIClient, Role, ToolSpec, create_client};
pub use planner::{NodePlan, Planner, SubTaskPlan, Verification, extract_task_title};
pub use recovery::{RecoverableTask, RecoveryManager};
pub use supervisor::ExecutorSupervisor;
pub use tools::{Tool, ToolContext, ToolError, ToolOutcome, ToolRegistry};
pub use tree::{
    ExecutionMode, ExecutionLog, LlmCallRecord, LogLevel, NodeSnapshot, NodeStatus, TaskContext,
    TaskNode, TaskResult, VerificationAttempt, VerificationInfo,
};
