//! Supervisor - typed handles to running executors, keyed by task id.
//!
//! Dashboards and the CLI drive pause/resume/cancel through this registry
//! instead of holding untyped references to executors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::executor::TaskExecutor;

/// Registry of running executors
#[derive(Default)]
pub struct ExecutorSupervisor {
    running: Mutex<HashMap<String, TaskExecutor>>,
}

impl ExecutorSupervisor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an executor under its root node's id
    pub fn register(&self, executor: TaskExecutor) {
        let task_id = executor.root().id.clone();
        debug!(%task_id, "registering executor");
        self.running.lock().unwrap_or_else(PoisonError::into_inner).insert(task_id, executor);
    }

    /// Drop a finished executor
    pub fn unregister(&self, task_id: &str) {
        debug!(%task_id, "unregistering executor");
        self.running.lock().unwrap_or_else(PoisonError::into_inner).remove(task_id);
    }

    pub fn get(&self, task_id: &str) -> Option<TaskExecutor> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner).get(task_id).cloned()
    }

    pub fn task_ids(&self) -> Vec<String> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
    }

    /// Pause a running task; false if the task is unknown
    pub fn pause(&self, task_id: &str) -> bool {
        match self.get(task_id) {
            Some(executor) => {
                executor.pause();
                true
            }
            None => false,
        }
    }

    /// Resume a paused task; false if the task is unknown
    pub fn resume(&self, task_id: &str) -> bool {
        match self.get(task_id) {
            Some(executor) => {
                executor.resume();
                true
            }
            None => false,
        }
    }

    /// Cancel a task; false if the task is unknown
    pub fn cancel(&self, task_id: &str) -> bool {
        match self.get(task_id) {
            Some(executor) => {
                executor.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionConfig;
    use crate::events::NullSink;
    use crate::llm::{ChatMessage, LlmClient, LlmError};
    use crate::planner::Planner;
    use crate::tools::{ToolContext, ToolRegistry};
    use crate::tree::{NodeStatus, TaskNode};
    use async_trait::async_trait;

    struct NoLlm;

    #[async_trait]
    impl LlmClient for NoLlm {
        async fn send_sync(&self, _ctx: &ToolContext, _messages: Vec<ChatMessage>) -> Result<String, LlmError> {
            Err(LlmError::InvalidResponse("unused".to_string()))
        }
    }

    fn test_executor(title: &str) -> TaskExecutor {
        let planner = Planner::new(Arc::new(NoLlm), Arc::new(ToolRegistry::empty()));
        let root = TaskNode::new_root(title, "desc");
        TaskExecutor::new(root, planner, ExecutionConfig::default(), "/tmp/out", Arc::new(NullSink))
    }

    #[test]
    fn test_register_and_lookup() {
        let supervisor = ExecutorSupervisor::new();
        let executor = test_executor("A");
        let task_id = executor.root().id.clone();

        supervisor.register(executor);
        assert!(supervisor.get(&task_id).is_some());
        assert_eq!(supervisor.task_ids(), vec![task_id.clone()]);

        supervisor.unregister(&task_id);
        assert!(supervisor.get(&task_id).is_none());
    }

    #[test]
    fn test_pause_resume_through_supervisor() {
        let supervisor = ExecutorSupervisor::new();
        let executor = test_executor("B");
        let task_id = executor.root().id.clone();
        executor.root().set_status(NodeStatus::Running);
        supervisor.register(executor.clone());

        assert!(supervisor.pause(&task_id));
        assert!(executor.is_paused());
        assert!(supervisor.resume(&task_id));
        assert!(!executor.is_paused());
    }

    #[test]
    fn test_unknown_task_id() {
        let supervisor = ExecutorSupervisor::new();
        assert!(!supervisor.pause("nope"));
        assert!(!supervisor.resume("nope"));
        assert!(!supervisor.cancel("nope"));
    }
}
