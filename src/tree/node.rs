//! The task tree: nodes, status machine, and serialisable snapshots.
//!
//! A [`TaskNode`] is handled as `Arc<TaskNode>`. Identity and description
//! are immutable after creation; everything else lives behind the node's
//! own lock so concurrent siblings never contend on shared state. The
//! child list has a separate lock on the parent, taken only during
//! decomposition and traversal.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::context::TaskContext;
use super::record::{ExecutionLog, LlmCallRecord, LogLevel, TaskResult, VerificationInfo};

/// Default maximum decomposition depth
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Default maximum retries per node
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// How a parent's children are executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "sequential"),
            ExecutionMode::Parallel => write!(f, "parallel"),
        }
    }
}

/// Lifecycle state of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Pending,
    Running,
    Paused,
    Done,
    Failed,
    Canceled,
}

impl NodeStatus {
    /// Terminal states are absorbing: done, failed, canceled
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Done | NodeStatus::Failed | NodeStatus::Canceled)
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Paused => "paused",
            NodeStatus::Done => "done",
            NodeStatus::Failed => "failed",
            NodeStatus::Canceled => "canceled",
        };
        write!(f, "{}", s)
    }
}

/// Generate a stable 8-character node id
fn generate_node_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Mutable node state, protected by the node's lock
#[derive(Debug)]
struct NodeState {
    output_path: Option<PathBuf>,
    execution_mode: ExecutionMode,
    tool_calls: Vec<String>,
    max_retries: u32,
    retry_count: u32,
    can_decompose: bool,
    depends_on: Vec<String>,
    status: NodeStatus,
    progress: f64,
    context: TaskContext,
    result: Option<TaskResult>,
    verification: Option<VerificationInfo>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    logs: Vec<ExecutionLog>,
    llm_calls: Vec<LlmCallRecord>,
}

/// A single unit of work in the task tree
pub struct TaskNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub depth: u32,
    pub title: String,
    pub description: String,
    pub goal: String,
    pub created_at: DateTime<Utc>,

    parent: Weak<TaskNode>,
    /// Handle to this node's own Arc, for child creation and lookups
    weak_self: Weak<TaskNode>,
    state: RwLock<NodeState>,
    children: RwLock<Vec<Arc<TaskNode>>>,
    cancel: CancellationToken,
}

impl TaskNode {
    // Lock access tolerates poisoning: a panic while a lock was held
    // must not cascade into every later snapshot, checkpoint, or
    // cancellation walk over this node.

    fn state_read(&self) -> RwLockReadGuard<'_, NodeState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_write(&self) -> RwLockWriteGuard<'_, NodeState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn children_read(&self) -> RwLockReadGuard<'_, Vec<Arc<TaskNode>>> {
        self.children.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn children_write(&self) -> RwLockWriteGuard<'_, Vec<Arc<TaskNode>>> {
        self.children.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create the root node for a user request. The description doubles
    /// as the original user input carried in the context.
    pub fn new_root(title: impl Into<String>, description: impl Into<String>) -> Arc<Self> {
        Self::new_root_with_goal(title, description, "")
    }

    /// Create a root node with an explicit goal
    pub fn new_root_with_goal(
        title: impl Into<String>,
        description: impl Into<String>,
        goal: impl Into<String>,
    ) -> Arc<Self> {
        let description = description.into();
        let title = title.into();
        let goal = goal.into();
        Arc::new_cyclic(|weak_self| Self {
            id: generate_node_id(),
            parent_id: None,
            depth: 0,
            title,
            description: description.clone(),
            goal,
            created_at: Utc::now(),
            parent: Weak::new(),
            weak_self: weak_self.clone(),
            state: RwLock::new(NodeState::new(TaskContext::new(description))),
            children: RwLock::new(Vec::new()),
            cancel: CancellationToken::new(),
        })
    }

    /// Create a child under this node and append it to the child list.
    /// The child inherits the root's user input and starts with empty
    /// parent/sibling result lists.
    pub fn new_child(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        goal: impl Into<String>,
    ) -> Arc<Self> {
        let user_input = self.state_read().context.user_input.clone();
        let title = title.into();
        let description = description.into();
        let goal = goal.into();
        let child = Arc::new_cyclic(|weak_self| Self {
            id: generate_node_id(),
            parent_id: Some(self.id.clone()),
            depth: self.depth + 1,
            title,
            description,
            goal,
            created_at: Utc::now(),
            parent: self.weak_self.clone(),
            weak_self: weak_self.clone(),
            state: RwLock::new(NodeState::new(TaskContext::new(user_input))),
            children: RwLock::new(Vec::new()),
            cancel: CancellationToken::new(),
        });
        self.children_write().push(child.clone());
        child
    }

    // === Accessors ===

    pub fn status(&self) -> NodeStatus {
        self.state_read().status
    }

    pub fn progress(&self) -> f64 {
        self.state_read().progress
    }

    pub fn result(&self) -> Option<TaskResult> {
        self.state_read().result.clone()
    }

    pub fn verification(&self) -> Option<VerificationInfo> {
        self.state_read().verification.clone()
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        self.state_read().output_path.clone()
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.state_read().execution_mode
    }

    pub fn can_decompose(&self) -> bool {
        self.state_read().can_decompose
    }

    pub fn retry_count(&self) -> u32 {
        self.state_read().retry_count
    }

    pub fn tool_calls(&self) -> Vec<String> {
        self.state_read().tool_calls.clone()
    }

    /// Render this node's context for an LLM prompt
    pub fn llm_context(&self) -> String {
        self.state_read().context.build_llm_context()
    }

    pub fn parent(&self) -> Option<Arc<TaskNode>> {
        self.parent.upgrade()
    }

    pub fn children(&self) -> Vec<Arc<TaskNode>> {
        self.children_read().clone()
    }

    pub fn has_children(&self) -> bool {
        !self.children_read().is_empty()
    }

    /// Recursive lookup by id
    pub fn find(&self, id: &str) -> Option<Arc<TaskNode>> {
        if self.id == id {
            return self.weak_self.upgrade();
        }
        for child in self.children_read().iter() {
            if let Some(found) = child.find(id) {
                return Some(found);
            }
        }
        None
    }

    // === Mutators (total; never fail) ===

    /// Transition to a new status, stamping started/finished times.
    /// Terminal states are absorbing: once done, failed, or canceled, a
    /// node only leaves that state through [`TaskNode::reset_for_retry`].
    pub fn set_status(&self, status: NodeStatus) {
        let mut state = self.state_write();
        if state.status.is_terminal() && status != state.status {
            return;
        }
        state.status = status;
        if status == NodeStatus::Running && state.started_at.is_none() {
            state.started_at = Some(Utc::now());
        }
        if status.is_terminal() {
            state.finished_at = Some(Utc::now());
        }
    }

    /// Put a failed node back to pending so the same slot can run again
    pub fn reset_for_retry(&self) {
        let mut state = self.state_write();
        state.status = NodeStatus::Pending;
        state.finished_at = None;
    }

    pub fn set_progress(&self, progress: f64) {
        self.state_write().progress = progress.clamp(0.0, 100.0);
    }

    pub fn set_result(&self, result: TaskResult) {
        self.state_write().result = Some(result);
    }

    /// The verifier may clear the success flag after the fact; everything
    /// else on a set result stays immutable.
    pub fn mark_result_unverified(&self) {
        if let Some(result) = self.state_write().result.as_mut() {
            result.success = false;
        }
    }

    pub fn set_execution_mode(&self, mode: ExecutionMode) {
        self.state_write().execution_mode = mode;
    }

    pub fn set_can_decompose(&self, can: bool) {
        self.state_write().can_decompose = can;
    }

    pub fn set_tool_calls(&self, tools: Vec<String>) {
        self.state_write().tool_calls = tools;
    }

    pub fn set_output_path(&self, path: PathBuf) {
        self.state_write().output_path = Some(path);
    }

    /// Append an execution log entry
    pub fn add_log(&self, level: LogLevel, phase: &str, message: impl Into<String>) {
        self.state_write().logs.push(ExecutionLog {
            time: Utc::now(),
            level,
            phase: phase.to_string(),
            message: message.into(),
            node_id: self.id.clone(),
        });
    }

    /// Append an LLM call record
    pub fn add_llm_call(&self, record: LlmCallRecord) {
        self.state_write().llm_calls.push(record);
    }

    /// Mutate the verification info, initialising it on first use
    pub fn update_verification(&self, f: impl FnOnce(&mut VerificationInfo)) {
        let mut state = self.state_write();
        f(state.verification.get_or_insert_with(VerificationInfo::default));
    }

    pub fn can_retry(&self) -> bool {
        let state = self.state_read();
        state.retry_count < state.max_retries
    }

    pub fn increment_retry(&self) {
        self.state_write().retry_count += 1;
    }

    /// Record a completed sibling on this node's context
    pub fn add_sibling_result(&self, node_id: &str, title: &str, status: NodeStatus, summary: &str) {
        self.state_write()
            .context
            .add_sibling_result(node_id, title, status, summary);
    }

    // === Cancellation and pause ===

    /// Cooperative cancel: marks this node canceled if it has not
    /// terminated, closes its cancel signal, and propagates to all
    /// descendants.
    pub fn cancel(&self) {
        let should_propagate = {
            let mut state = self.state_write();
            if matches!(state.status, NodeStatus::Pending | NodeStatus::Running | NodeStatus::Paused) {
                state.status = NodeStatus::Canceled;
                state.finished_at = Some(Utc::now());
                true
            } else {
                false
            }
        };
        if should_propagate {
            self.cancel.cancel();
            for child in self.children_read().iter() {
                child.cancel();
            }
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Recursively mark running nodes paused
    pub fn pause(&self) {
        let paused = {
            let mut state = self.state_write();
            if state.status == NodeStatus::Running {
                state.status = NodeStatus::Paused;
                true
            } else {
                false
            }
        };
        if paused {
            for child in self.children_read().iter() {
                child.pause();
            }
        }
    }

    /// Recursively mark paused nodes running again
    pub fn resume(&self) {
        let resumed = {
            let mut state = self.state_write();
            if state.status == NodeStatus::Paused {
                state.status = NodeStatus::Running;
                true
            } else {
                false
            }
        };
        if resumed {
            for child in self.children_read().iter() {
                child.resume();
            }
        }
    }

    // === Snapshot ===

    /// Deep copy of the subtree rooted here, safe for serialisation.
    /// Taken node by node under each node's read lock, so the snapshot is
    /// internally consistent but not a single global instant.
    pub fn snapshot(&self) -> NodeSnapshot {
        let state = self.state_read();
        let snap = NodeSnapshot {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            depth: self.depth,
            title: self.title.clone(),
            description: self.description.clone(),
            goal: self.goal.clone(),
            output_path: state.output_path.clone(),
            execution_mode: state.execution_mode,
            tool_calls: state.tool_calls.clone(),
            max_retries: state.max_retries,
            retry_count: state.retry_count,
            can_decompose: state.can_decompose,
            depends_on: state.depends_on.clone(),
            status: state.status,
            progress: state.progress,
            context: state.context.clone(),
            result: state.result.clone(),
            verification: state.verification.clone(),
            created_at: self.created_at,
            started_at: state.started_at,
            finished_at: state.finished_at,
            logs: state.logs.clone(),
            llm_calls: state.llm_calls.clone(),
            children: Vec::new(),
        };
        drop(state);

        let mut snap = snap;
        for child in self.children_read().iter() {
            snap.children.push(child.snapshot());
        }
        snap
    }
}

impl NodeState {
    fn new(context: TaskContext) -> Self {
        Self {
            output_path: None,
            execution_mode: ExecutionMode::default(),
            tool_calls: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_count: 0,
            can_decompose: true,
            depends_on: Vec::new(),
            status: NodeStatus::Pending,
            progress: 0.0,
            context,
            result: None,
            verification: None,
            started_at: None,
            finished_at: None,
            logs: Vec::new(),
            llm_calls: Vec::new(),
        }
    }
}

impl std::fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskNode")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("depth", &self.depth)
            .field("status", &self.status())
            .finish()
    }
}

/// Pointer-free serialised form of a subtree. Keys are lower-snake-case;
/// parents are referenced by `parent_id` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub depth: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<String>,
    pub max_retries: u32,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub can_decompose: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub context: TaskContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationInfo>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub logs: Vec<ExecutionLog>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub llm_calls: Vec<LlmCallRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    /// Rebuild a live tree from this snapshot, re-initialising the
    /// in-memory-only fields (locks, cancel signals, parent pointers).
    /// Statuses are restored verbatim; recovery normalisation happens on
    /// the snapshot before calling this.
    pub fn restore(&self) -> Arc<TaskNode> {
        self.restore_under(None)
    }

    fn restore_under(&self, parent: Option<&Arc<TaskNode>>) -> Arc<TaskNode> {
        let node = Arc::new_cyclic(|weak_self| TaskNode {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            depth: self.depth,
            title: self.title.clone(),
            description: self.description.clone(),
            goal: self.goal.clone(),
            created_at: self.created_at,
            parent: parent.map(Arc::downgrade).unwrap_or_default(),
            weak_self: weak_self.clone(),
            state: RwLock::new(NodeState {
                output_path: self.output_path.clone(),
                execution_mode: self.execution_mode,
                tool_calls: self.tool_calls.clone(),
                max_retries: self.max_retries,
                retry_count: self.retry_count,
                can_decompose: self.can_decompose,
                depends_on: self.depends_on.clone(),
                status: self.status,
                progress: self.progress,
                context: self.context.clone(),
                result: self.result.clone(),
                verification: self.verification.clone(),
                started_at: self.started_at,
                finished_at: self.finished_at,
                logs: self.logs.clone(),
                llm_calls: self.llm_calls.clone(),
            }),
            children: RwLock::new(Vec::new()),
            cancel: CancellationToken::new(),
        });

        let restored_children: Vec<Arc<TaskNode>> = self
            .children
            .iter()
            .map(|child| child.restore_under(Some(&node)))
            .collect();
        *node.children_write() = restored_children;

        node
    }

    /// Visit every node in the snapshot, depth first
    pub fn walk(&self, f: &mut impl FnMut(&NodeSnapshot)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Visit every node mutably, depth first
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut NodeSnapshot)) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_root_defaults() {
        let root = TaskNode::new_root("Research topic", "research everything about X");
        assert_eq!(root.depth, 0);
        assert!(root.parent_id.is_none());
        assert_eq!(root.status(), NodeStatus::Pending);
        assert!(root.can_decompose());
        assert_eq!(root.id.len(), 8);
    }

    #[test]
    fn test_child_inherits_user_input() {
        let root = TaskNode::new_root("Root", "the original request");
        let child = root.new_child("Child", "child description", "child goal");

        assert_eq!(child.depth, 1);
        assert_eq!(child.parent_id.as_deref(), Some(root.id.as_str()));
        assert!(child.llm_context().contains("the original request"));
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn test_status_transitions_stamp_times() {
        let root = TaskNode::new_root("Root", "desc");
        root.set_status(NodeStatus::Running);
        root.set_status(NodeStatus::Done);

        let snap = root.snapshot();
        assert!(snap.started_at.is_some());
        assert!(snap.finished_at.is_some());
    }

    #[test]
    fn test_cancel_propagates_to_descendants() {
        let root = TaskNode::new_root("Root", "desc");
        let child = root.new_child("Child", "d", "g");
        let grandchild = child.new_child("Grandchild", "d", "g");
        root.set_status(NodeStatus::Running);

        root.cancel();

        assert_eq!(root.status(), NodeStatus::Canceled);
        assert_eq!(child.status(), NodeStatus::Canceled);
        assert_eq!(grandchild.status(), NodeStatus::Canceled);
        assert!(grandchild.is_canceled());
    }

    #[test]
    fn test_cancel_leaves_terminal_nodes_alone() {
        let root = TaskNode::new_root("Root", "desc");
        let child = root.new_child("Child", "d", "g");
        child.set_status(NodeStatus::Running);
        child.set_status(NodeStatus::Done);
        root.set_status(NodeStatus::Running);

        root.cancel();

        assert_eq!(root.status(), NodeStatus::Canceled);
        assert_eq!(child.status(), NodeStatus::Done);
    }

    #[test]
    fn test_pause_resume_covers_running_subtree() {
        let root = TaskNode::new_root("Root", "desc");
        let running = root.new_child("Running", "d", "g");
        let pending = root.new_child("Pending", "d", "g");
        root.set_status(NodeStatus::Running);
        running.set_status(NodeStatus::Running);

        root.pause();
        assert_eq!(root.status(), NodeStatus::Paused);
        assert_eq!(running.status(), NodeStatus::Paused);
        assert_eq!(pending.status(), NodeStatus::Pending);

        root.resume();
        assert_eq!(root.status(), NodeStatus::Running);
        assert_eq!(running.status(), NodeStatus::Running);
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        let root = TaskNode::new_root("Root", "desc");
        root.set_status(NodeStatus::Running);
        root.set_status(NodeStatus::Canceled);

        root.set_status(NodeStatus::Done);
        assert_eq!(root.status(), NodeStatus::Canceled);

        root.set_status(NodeStatus::Running);
        assert_eq!(root.status(), NodeStatus::Canceled);
    }

    #[test]
    fn test_reset_for_retry_reopens_failed_node() {
        let root = TaskNode::new_root("Root", "desc");
        root.set_status(NodeStatus::Running);
        root.set_status(NodeStatus::Failed);

        root.reset_for_retry();
        assert_eq!(root.status(), NodeStatus::Pending);
        assert!(root.snapshot().finished_at.is_none());
    }

    #[test]
    fn test_retry_accounting() {
        let root = TaskNode::new_root("Root", "desc");
        assert!(root.can_retry());
        for _ in 0..DEFAULT_MAX_RETRIES {
            root.increment_retry();
        }
        assert!(!root.can_retry());
        assert_eq!(root.retry_count(), DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_find_by_id() {
        let root = TaskNode::new_root("Root", "desc");
        let child = root.new_child("Child", "d", "g");
        let grandchild = child.new_child("Grandchild", "d", "g");

        assert_eq!(root.find(&grandchild.id).unwrap().title, "Grandchild");
        assert!(root.find("nonexist").is_none());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let root = TaskNode::new_root("Root", "original request");
        let child = root.new_child("Child", "d", "g");
        child.set_status(NodeStatus::Running);
        child.set_status(NodeStatus::Done);
        child.set_result(TaskResult::ok("out", "sum"));
        child.add_log(LogLevel::Info, "executing", "did a thing");
        root.set_status(NodeStatus::Running);

        let snap = root.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let parsed: NodeSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, parsed);

        // And a restored tree snapshots back to the same value
        let restored = parsed.restore();
        assert_eq!(restored.snapshot(), snap);
    }

    #[test]
    fn test_snapshot_keys_are_snake_case() {
        let root = TaskNode::new_root("Root", "desc");
        let json = serde_json::to_value(root.snapshot()).unwrap();
        assert!(json.get("created_at").is_some());
        assert!(json.get("execution_mode").is_some());
        assert!(json.get("max_retries").is_some());
        assert!(json.get("parentId").is_none());
    }

    #[test]
    fn test_restore_rewires_parent_pointers() {
        let root = TaskNode::new_root("Root", "desc");
        let child = root.new_child("Child", "d", "g");
        let _grandchild = child.new_child("Grandchild", "d", "g");

        let restored = root.snapshot().restore();
        let restored_child = restored.children()[0].clone();
        let restored_grandchild = restored_child.children()[0].clone();

        assert_eq!(restored_grandchild.parent().unwrap().id, restored_child.id);
        assert!(restored.parent().is_none());
    }

    #[test]
    fn test_result_success_can_be_cleared() {
        let root = TaskNode::new_root("Root", "desc");
        root.set_result(TaskResult::ok("out", "sum"));
        root.mark_result_unverified();
        assert!(!root.result().unwrap().success);
        // other fields untouched
        assert_eq!(root.result().unwrap().summary, "sum");
    }
}
