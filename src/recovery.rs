//! Checkpoint recovery
//!
//! Scans persisted checkpoints for interrupted runs and reconstructs a
//! live tree plus a fresh executor around it.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Context, Result};
use tracing::{info, warn};

use crate::config::ExecutionConfig;
use crate::events::EventSink;
use crate::executor::TaskExecutor;
use crate::planner::Planner;
use crate::storage;
use crate::tree::{NodeSnapshot, NodeStatus, TaskNode};

/// Summary of a run that can be resumed
#[derive(Debug, Clone)]
pub struct RecoverableTask {
    pub task_id: String,
    pub title: String,
    pub status: NodeStatus,
    pub checkpoint_path: PathBuf,
    pub task_folder: String,
}

/// Finds and restores interrupted runs from their checkpoints
pub struct RecoveryManager {
    output_dir: PathBuf,
}

impl RecoveryManager {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Scan the output directory for task folders holding a checkpoint
    /// whose root is still running or paused. Finished tasks do not
    /// appear: their checkpoint was removed at completion.
    pub fn find_recoverable_tasks(&self) -> Result<Vec<RecoverableTask>> {
        let mut tasks = Vec::new();

        let entries = match fs::read_dir(&self.output_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(tasks),
            Err(e) => return Err(e).context("Failed to read output directory"),
        };

        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let task_folder = entry.file_name().to_string_lossy().into_owned();
            let checkpoint_path = storage::checkpoint_path(&self.output_dir, &task_folder);
            if !checkpoint_path.exists() {
                continue;
            }

            let snapshot = match storage::load_checkpoint(&checkpoint_path) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(folder = %task_folder, "failed to load checkpoint: {}", e);
                    continue;
                }
            };

            if matches!(snapshot.status, NodeStatus::Running | NodeStatus::Paused) {
                tasks.push(RecoverableTask {
                    task_id: snapshot.id.clone(),
                    title: snapshot.title.clone(),
                    status: snapshot.status,
                    checkpoint_path,
                    task_folder,
                });
            }
        }

        Ok(tasks)
    }

    /// Load a checkpoint, rebuild the tree with fresh runtime state, and
    /// construct an executor bound to the existing task folder.
    pub fn recover_task(
        &self,
        task_folder: &str,
        planner: Planner,
        config: ExecutionConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<(Arc<TaskNode>, TaskExecutor)> {
        let checkpoint_path = storage::checkpoint_path(&self.output_dir, task_folder);
        let mut snapshot =
            storage::load_checkpoint(&checkpoint_path).context("Failed to load checkpoint")?;

        normalize_statuses(&mut snapshot);
        let root = snapshot.restore();

        info!(task_id = %root.id, folder = %task_folder, "recovered task from checkpoint");

        let executor = TaskExecutor::new(root.clone(), planner, config, self.output_dir.clone(), events);
        executor.set_recovery_mode(task_folder);

        Ok((root, executor))
    }

    /// Remove a task folder's checkpoint; idempotent
    pub fn cleanup_checkpoint(&self, task_folder: &str) -> Result<()> {
        storage::remove_checkpoint(&self.output_dir, task_folder)
    }
}

/// Normalise statuses loaded from a checkpoint:
/// - running with a successful result becomes done (the work finished)
/// - running without one becomes pending (it will re-execute)
/// - paused becomes pending
/// - terminal states are kept
fn normalize_statuses(snapshot: &mut NodeSnapshot) {
    snapshot.walk_mut(&mut |node| {
        node.status = match node.status {
            NodeStatus::Running => {
                if node.result.as_ref().is_some_and(|r| r.success) {
                    NodeStatus::Done
                } else {
                    NodeStatus::Pending
                }
            }
            NodeStatus::Paused => NodeStatus::Pending,
            other => other,
        };
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crate::llm::{ChatMessage, LlmClient, LlmError};
    use crate::tools::{ToolContext, ToolRegistry};
    use crate::tree::TaskResult;
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct NoLlm;

    #[async_trait]
    impl LlmClient for NoLlm {
        async fn send_sync(&self, _ctx: &ToolContext, _messages: Vec<ChatMessage>) -> Result<String, LlmError> {
            Err(LlmError::InvalidResponse("no llm in this test".to_string()))
        }
    }

    fn test_planner() -> Planner {
        Planner::new(Arc::new(NoLlm), Arc::new(ToolRegistry::empty()))
    }

    #[test]
    fn test_scan_empty_output_dir() {
        let temp = tempdir().unwrap();
        let manager = RecoveryManager::new(temp.path());
        assert!(manager.find_recoverable_tasks().unwrap().is_empty());

        // A missing output dir is not an error either
        let manager = RecoveryManager::new(temp.path().join("missing"));
        assert!(manager.find_recoverable_tasks().unwrap().is_empty());
    }

    #[test]
    fn test_scan_finds_interrupted_task() {
        let temp = tempdir().unwrap();
        let root = TaskNode::new_root("Interrupted", "desc");
        root.set_status(NodeStatus::Running);
        storage::save_checkpoint(&root.snapshot(), temp.path(), "interrupted_run").unwrap();

        let manager = RecoveryManager::new(temp.path());
        let tasks = manager.find_recoverable_tasks().unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Interrupted");
        assert_eq!(tasks[0].status, NodeStatus::Running);
        assert_eq!(tasks[0].task_folder, "interrupted_run");
    }

    #[test]
    fn test_scan_skips_finished_task() {
        let temp = tempdir().unwrap();
        let root = TaskNode::new_root("Finished", "desc");
        root.set_status(NodeStatus::Running);
        root.set_status(NodeStatus::Done);
        storage::save_checkpoint(&root.snapshot(), temp.path(), "finished_run").unwrap();

        let manager = RecoveryManager::new(temp.path());
        assert!(manager.find_recoverable_tasks().unwrap().is_empty());
    }

    #[test]
    fn test_normalize_statuses() {
        let root = TaskNode::new_root("Root", "desc");
        let done_child = root.new_child("Done", "d", "g");
        done_child.set_status(NodeStatus::Running);
        done_child.set_result(TaskResult::ok("out", "sum"));
        let half_child = root.new_child("Half", "d", "g");
        half_child.set_status(NodeStatus::Running);
        let paused_child = root.new_child("Paused", "d", "g");
        paused_child.set_status(NodeStatus::Running);
        paused_child.set_status(NodeStatus::Paused);
        let failed_child = root.new_child("Failed", "d", "g");
        failed_child.set_status(NodeStatus::Failed);
        root.set_status(NodeStatus::Running);

        let mut snapshot = root.snapshot();
        normalize_statuses(&mut snapshot);

        assert_eq!(snapshot.status, NodeStatus::Pending);
        assert_eq!(snapshot.children[0].status, NodeStatus::Done);
        assert_eq!(snapshot.children[1].status, NodeStatus::Pending);
        assert_eq!(snapshot.children[2].status, NodeStatus::Pending);
        assert_eq!(snapshot.children[3].status, NodeStatus::Failed);
    }

    #[test]
    fn test_recover_task_binds_existing_folder() {
        let temp = tempdir().unwrap();
        let root = TaskNode::new_root("Resumable", "desc");
        root.set_status(NodeStatus::Running);
        storage::save_checkpoint(&root.snapshot(), temp.path(), "resumable_run").unwrap();

        let manager = RecoveryManager::new(temp.path());
        let (recovered_root, executor) = manager
            .recover_task("resumable_run", test_planner(), ExecutionConfig::default(), Arc::new(NullSink))
            .unwrap();

        assert_eq!(recovered_root.title, "Resumable");
        assert_eq!(recovered_root.status(), NodeStatus::Pending);
        assert_eq!(executor.task_folder(), "resumable_run");
    }

    #[test]
    fn test_cleanup_then_scan_excludes_task() {
        let temp = tempdir().unwrap();
        let root = TaskNode::new_root("Gone", "desc");
        root.set_status(NodeStatus::Running);
        storage::save_checkpoint(&root.snapshot(), temp.path(), "gone_run").unwrap();

        let manager = RecoveryManager::new(temp.path());
        assert_eq!(manager.find_recoverable_tasks().unwrap().len(), 1);

        manager.cleanup_checkpoint("gone_run").unwrap();
        assert!(manager.find_recoverable_tasks().unwrap().is_empty());

        // Idempotent
        manager.cleanup_checkpoint("gone_run").unwrap();
    }
}
