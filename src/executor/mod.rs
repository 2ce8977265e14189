//! TaskExecutor - traverses the task tree, drives state transitions, and
//! owns the run lifecycle: cancellation, pause/resume, periodic
//! checkpoints, verification, and final persistence.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use eyre::{Result, eyre};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ExecutionConfig;
use crate::events::{Event, EventSink};
use crate::planner::Planner;
use crate::storage;
use crate::tree::{ExecutionMode, LogLevel, NodeStatus, TaskNode, TaskResult};

/// Interval between periodic checkpoint saves
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(30);

/// Tree-wide pause signalling: a shared paused flag plus a broadcast that
/// every node polls at its pause point. The first observer after a pause
/// persists the checkpoint; all observers block until resume.
struct PauseGate {
    paused: RwLock<bool>,
    checkpoint_pending: AtomicBool,
    resume_notify: Notify,
}

impl PauseGate {
    fn new() -> Self {
        Self {
            paused: RwLock::new(false),
            checkpoint_pending: AtomicBool::new(false),
            resume_notify: Notify::new(),
        }
    }

    /// Flip to paused; returns false if already paused
    fn set_paused(&self) -> bool {
        let mut paused = self.paused.write().unwrap_or_else(PoisonError::into_inner);
        if *paused {
            return false;
        }
        *paused = true;
        self.checkpoint_pending.store(true, Ordering::SeqCst);
        true
    }

    /// Clear the paused flag; returns false if not paused
    fn clear_paused(&self) -> bool {
        let mut paused = self.paused.write().unwrap_or_else(PoisonError::into_inner);
        if !*paused {
            return false;
        }
        *paused = false;
        self.checkpoint_pending.store(false, Ordering::SeqCst);
        true
    }

    fn is_paused(&self) -> bool {
        *self.paused.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the one-shot checkpoint request for this pause cycle
    fn take_checkpoint_request(&self) -> bool {
        self.checkpoint_pending.swap(false, Ordering::SeqCst)
    }

    fn notify_all(&self) {
        self.resume_notify.notify_waiters();
    }

    /// Block until the paused flag clears
    async fn wait_resumed(&self) {
        loop {
            let notified = self.resume_notify.notified();
            if !self.is_paused() {
                return;
            }
            notified.await;
        }
    }
}

struct Inner {
    root: Arc<TaskNode>,
    planner: Planner,
    config: ExecutionConfig,
    output_dir: PathBuf,
    events: Arc<dyn EventSink>,

    cancel: CancellationToken,
    pause: PauseGate,

    /// Filesystem folder for this run, written once at execute start
    task_folder: RwLock<String>,
    recovering: AtomicBool,
}

/// The scheduler: executes one task tree to completion. Cheap to clone;
/// clones share the same run.
#[derive(Clone)]
pub struct TaskExecutor {
    inner: Arc<Inner>,
}

impl TaskExecutor {
    pub fn new(
        root: Arc<TaskNode>,
        planner: Planner,
        config: ExecutionConfig,
        output_dir: impl Into<PathBuf>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                root,
                planner,
                config,
                output_dir: output_dir.into(),
                events,
                cancel: CancellationToken::new(),
                pause: PauseGate::new(),
                task_folder: RwLock::new(String::new()),
                recovering: AtomicBool::new(false),
            }),
        }
    }

    pub fn root(&self) -> Arc<TaskNode> {
        self.inner.root.clone()
    }

    pub fn task_folder(&self) -> String {
        self.inner.task_folder.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Reuse an existing task folder instead of allocating a new one
    pub fn set_recovery_mode(&self, task_folder: &str) {
        *self.inner.task_folder.write().unwrap_or_else(PoisonError::into_inner) = task_folder.to_string();
        self.inner.recovering.store(true, Ordering::SeqCst);
    }

    // === Lifecycle control ===

    /// Cancel the run: aborts nodes that have not started and signals
    /// running ones at their next pause point or LLM-call boundary.
    pub fn cancel(&self) {
        info!(task_id = %self.inner.root.id, "canceling task");
        self.inner.cancel.cancel();
        self.inner.root.cancel();
        // Wake paused waiters so they can observe the cancellation
        self.inner.pause.notify_all();
    }

    /// Pause the whole tree cooperatively. The next node to reach its
    /// pause point saves a checkpoint; all nodes block until resume.
    pub fn pause(&self) {
        if !self.inner.pause.set_paused() {
            return;
        }
        self.inner.root.pause();
        info!(task_id = %self.inner.root.id, "task paused");
        self.emit_log(LogLevel::Info, "task paused");
    }

    /// Resume a paused tree
    pub fn resume(&self) {
        if !self.inner.pause.clear_paused() {
            return;
        }
        self.inner.root.resume();
        self.inner.pause.notify_all();
        info!(task_id = %self.inner.root.id, "task resumed");
        self.emit_log(LogLevel::Info, "task resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.inner.pause.is_paused()
    }

    // === Top-level execution ===

    /// Execute the tree: run the root, verify the outcome, persist the
    /// final log, and clean up the checkpoint.
    pub async fn execute(&self) -> Result<()> {
        let task_folder = {
            let existing = self.task_folder();
            if self.inner.recovering.load(Ordering::SeqCst) && !existing.is_empty() {
                info!(folder = %existing, "resuming task in existing folder");
                existing
            } else {
                let fresh = storage::task_folder_name(&self.inner.root.title);
                *self.inner.task_folder.write().unwrap_or_else(PoisonError::into_inner) = fresh.clone();
                fresh
            }
        };

        let root = self.root();
        self.inner.events.emit(Event::TaskStart {
            task_id: root.id.clone(),
            title: root.title.clone(),
        });
        self.log_node(&root, LogLevel::Info, "starting", format!("starting task: {}", root.title));

        let ticker = self.spawn_checkpoint_ticker();

        let run_result = self.execute_node(root.clone()).await;
        ticker.abort();

        if let Err(e) = run_result {
            self.inner.events.emit(Event::TaskFailed {
                task_id: root.id.clone(),
                title: root.title.clone(),
                error: e.to_string(),
            });
            self.save_final_log();
            return Err(e);
        }

        self.verify_root().await;

        let task_dir = self.inner.output_dir.join(&task_folder);
        match storage::write_readme(&root.snapshot(), &task_dir) {
            Ok(path) => info!(path = %path.display(), "output index written"),
            Err(e) => warn!("failed to write output index: {}", e),
        }

        self.save_final_log();

        if let Err(e) = storage::remove_checkpoint(&self.inner.output_dir, &task_folder) {
            warn!("failed to clean up checkpoint: {}", e);
        }

        self.inner.events.emit(Event::TaskComplete {
            task_id: root.id.clone(),
            title: root.title.clone(),
        });
        Ok(())
    }

    /// Run the verification feedback loop on a successful root result.
    /// A failed verification flips the root result's success flag.
    async fn verify_root(&self) {
        let root = self.root();
        let Some(result) = root.result() else { return };
        if !result.success {
            return;
        }

        match self.inner.planner.verify_result(&root, &result.summary).await {
            Err(e) => {
                self.log_node(&root, LogLevel::Error, "verification", format!("verification errored: {e}"));
            }
            Ok(verification) if !verification.passed => {
                self.log_node(&root, LogLevel::Warn, "verification", "task failed verification");
                root.mark_result_unverified();
            }
            Ok(_) => {
                self.log_node(&root, LogLevel::Info, "verification", "task passed verification");
            }
        }

        self.broadcast_tree();
    }

    fn spawn_checkpoint_ticker(&self) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CHECKPOINT_INTERVAL);
            // The first tick fires immediately; skip it
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = this.inner.cancel.cancelled() => break,
                    _ = interval.tick() => {
                        if this.root().status() == NodeStatus::Running && !this.is_paused() {
                            if let Err(e) = this.save_checkpoint() {
                                this.emit_log(LogLevel::Warn, format!("periodic checkpoint failed: {e}"));
                            }
                        }
                    }
                }
            }
        })
    }

    // === Node execution (recursive) ===

    fn execute_node(&self, node: Arc<TaskNode>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        let this = self.clone();
        Box::pin(async move {
            this.assign_output_path(&node);

            this.check_pause_point().await;

            if this.inner.cancel.is_cancelled() {
                node.set_status(NodeStatus::Canceled);
                return Err(eyre!("execution canceled"));
            }
            if node.is_canceled() {
                return Err(eyre!("node canceled"));
            }

            // Already finished in a previous run (recovery)
            if node.status() == NodeStatus::Done {
                return Ok(());
            }

            node.set_status(NodeStatus::Running);
            this.log_node(&node, LogLevel::Info, "executing", format!("starting: {}", node.title));
            this.inner.events.emit(Event::NodeStart {
                node_id: node.id.clone(),
                title: node.title.clone(),
                depth: node.depth,
            });

            if this.should_decompose(&node) {
                if let Err(e) = this.decompose_node(&node).await {
                    this.log_node(&node, LogLevel::Error, "planning", format!("decomposition failed: {e}"));
                    return this.fail_node(&node, e);
                }
            }

            if node.has_children() {
                let outcome = match node.execution_mode() {
                    ExecutionMode::Parallel => this.execute_parallel(&node).await,
                    ExecutionMode::Sequential => this.execute_sequential(&node).await,
                };
                if let Err(e) = outcome {
                    return this.fail_node(&node, e);
                }
                this.aggregate_child_results(&node).await;
            } else if let Err(e) = this.execute_leaf(&node).await {
                return this.fail_node(&node, e);
            }

            node.set_status(NodeStatus::Done);
            node.set_progress(100.0);
            this.log_node(&node, LogLevel::Info, "completed", format!("finished: {}", node.title));
            this.inner.events.emit(Event::NodeComplete {
                node_id: node.id.clone(),
                title: node.title.clone(),
            });
            this.broadcast_tree();

            Ok(())
        })
    }

    fn should_decompose(&self, node: &Arc<TaskNode>) -> bool {
        if node.has_children() || !node.can_decompose() {
            return false;
        }
        if node.depth >= self.inner.config.max_depth {
            self.log_node(
                node,
                LogLevel::Info,
                "planning",
                format!("max depth {} reached, not decomposing", self.inner.config.max_depth),
            );
            return false;
        }
        true
    }

    async fn decompose_node(&self, node: &Arc<TaskNode>) -> Result<()> {
        self.log_node(node, LogLevel::Info, "planning", "starting decomposition");

        let plan = self.inner.planner.plan_node(node).await?;

        if plan.subtasks.is_empty() {
            node.set_can_decompose(false);
            self.log_node(node, LogLevel::Info, "planning", "no decomposition needed, executing directly");
            return Ok(());
        }

        node.set_execution_mode(plan.execution_mode);
        for subtask in &plan.subtasks {
            let child = node.new_child(&subtask.title, &subtask.description, &subtask.goal);
            child.set_tool_calls(subtask.tools.clone());
            child.set_can_decompose(subtask.can_decompose);
        }

        self.inner.events.emit(Event::Subtasks {
            node_id: node.id.clone(),
            count: plan.subtasks.len(),
            mode: plan.execution_mode,
        });
        self.log_node(
            node,
            LogLevel::Info,
            "planning",
            format!("decomposed into {} sub-tasks, mode: {}", plan.subtasks.len(), plan.execution_mode),
        );
        Ok(())
    }

    /// Run children one after another. A failed child is retried in the
    /// same slot while its retry budget lasts; the error bubbles only
    /// once retries exhaust. Each completion propagates the child's
    /// summary to the still-pending siblings.
    async fn execute_sequential(&self, parent: &Arc<TaskNode>) -> Result<()> {
        let children = parent.children();
        let total = children.len();
        self.log_node(
            parent,
            LogLevel::Info,
            "executing",
            format!("running {total} sub-tasks sequentially"),
        );

        for (index, child) in children.iter().enumerate() {
            loop {
                match self.execute_node(child.clone()).await {
                    Ok(()) => break,
                    Err(e) => {
                        // Cancellation is not retried
                        if self.inner.cancel.is_cancelled() || child.is_canceled() {
                            return Err(e);
                        }
                        if child.can_retry() {
                            child.increment_retry();
                            self.log_node(
                                child,
                                LogLevel::Warn,
                                "retry",
                                format!("retry attempt {}", child.retry_count()),
                            );
                            child.reset_for_retry();
                            continue;
                        }
                        return Err(e);
                    }
                }
            }

            parent.set_progress((index + 1) as f64 / total as f64 * 100.0);
            self.propagate_sibling_result(child, parent);
        }

        Ok(())
    }

    /// Run all children concurrently. Siblings are never pre-empted: all
    /// run to completion, every error is collected, the first becomes the
    /// parent's error.
    async fn execute_parallel(&self, parent: &Arc<TaskNode>) -> Result<()> {
        let children = parent.children();
        self.log_node(
            parent,
            LogLevel::Info,
            "executing",
            format!("running {} sub-tasks in parallel", children.len()),
        );

        let mut tasks = JoinSet::new();
        for child in children {
            let this = self.clone();
            tasks.spawn(async move { this.execute_node(child).await });
        }

        let mut errors = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(e),
                Err(e) => errors.push(eyre!("child task join failed: {e}")),
            }
        }

        match errors.into_iter().next() {
            Some(first) => Err(eyre!("parallel execution failed: {first}")),
            None => Ok(()),
        }
    }

    async fn execute_leaf(&self, node: &Arc<TaskNode>) -> Result<()> {
        self.log_node(node, LogLevel::Info, "executing", format!("executing leaf: {}", node.title));

        match self.inner.planner.execute_node(node).await {
            Ok(result) => {
                self.log_node(node, LogLevel::Info, "completed", format!("result: {}", result.summary));
                node.set_result(result);
                Ok(())
            }
            Err(e) => {
                node.set_result(TaskResult::failure(e.to_string()));
                Err(e)
            }
        }
    }

    /// Collect child summaries into the parent's result. Parent success is
    /// the conjunction of child successes; the prose summary comes from
    /// the synthesiser, with a plain count as fallback.
    async fn aggregate_child_results(&self, node: &Arc<TaskNode>) {
        let children = node.children();
        let mut summaries = Vec::new();
        let mut all_success = true;

        for child in &children {
            if let Some(result) = child.result() {
                summaries.push(format!("{}: {}", child.title, result.summary));
                if !result.success {
                    all_success = false;
                }
            }
        }

        let summary = match self.inner.planner.synthesize_results(node, &summaries).await {
            Ok(text) => text,
            Err(e) => {
                self.log_node(node, LogLevel::Warn, "synthesis", format!("synthesis failed, using fallback: {e}"));
                format!("completed {} sub-tasks", children.len())
            }
        };

        node.set_result(TaskResult {
            success: all_success,
            output: summaries.join("\n"),
            summary,
            ..Default::default()
        });
    }

    /// After a successful sequential child, record its summary on every
    /// still-pending sibling's context.
    fn propagate_sibling_result(&self, completed: &Arc<TaskNode>, parent: &Arc<TaskNode>) {
        let Some(result) = completed.result() else { return };

        for sibling in parent.children() {
            if sibling.id != completed.id && sibling.status() == NodeStatus::Pending {
                sibling.add_sibling_result(&completed.id, &completed.title, completed.status(), &result.summary);
            }
        }
    }

    fn fail_node(&self, node: &Arc<TaskNode>, err: eyre::Report) -> Result<()> {
        // A canceled node stays canceled
        if node.status() != NodeStatus::Canceled {
            node.set_status(NodeStatus::Failed);
            node.set_result(TaskResult::failure(err.to_string()));
        }
        self.log_node(node, LogLevel::Error, "failed", format!("execution failed: {err}"));
        self.inner.events.emit(Event::NodeFailed {
            node_id: node.id.clone(),
            title: node.title.clone(),
            error: err.to_string(),
        });
        Err(err)
    }

    // === Pause point and checkpoints ===

    /// Cooperative suspension point. When a pause is pending, the first
    /// observer persists a checkpoint, then all observers block until
    /// resume (or cancellation).
    async fn check_pause_point(&self) {
        if !self.inner.pause.is_paused() {
            return;
        }

        if self.inner.pause.take_checkpoint_request() {
            if let Err(e) = self.save_checkpoint() {
                self.emit_log(LogLevel::Warn, format!("checkpoint save failed: {e}"));
            }
        }

        tokio::select! {
            _ = self.inner.pause.wait_resumed() => {}
            _ = self.inner.cancel.cancelled() => {}
        }
    }

    /// Snapshot the tree and persist it. Failures are surfaced through
    /// the event sink by callers; they are never fatal.
    pub fn save_checkpoint(&self) -> Result<()> {
        let folder = self.task_folder();
        if folder.is_empty() {
            return Err(eyre!("no task folder assigned yet"));
        }
        let path = storage::save_checkpoint(&self.inner.root.snapshot(), &self.inner.output_dir, &folder)?;
        info!(path = %path.display(), "checkpoint saved");
        Ok(())
    }

    fn save_final_log(&self) {
        let folder = self.task_folder();
        match storage::save_execution_log(&self.inner.root.snapshot(), &self.inner.output_dir, &folder) {
            Ok(path) => info!(path = %path.display(), "execution log saved"),
            Err(e) => warn!("failed to save execution log: {}", e),
        }
    }

    // === Output paths ===

    /// `<output-dir>/<task-folder>/doc/<ancestor titles>/` - the root's
    /// documents land directly under `doc/`; the root contributes no path
    /// segment for its descendants.
    fn assign_output_path(&self, node: &Arc<TaskNode>) {
        let base = self
            .inner
            .output_dir
            .join(self.task_folder())
            .join(storage::DOC_SUBDIR);

        let mut parts = Vec::new();
        let mut current = node.parent();
        while let Some(ancestor) = current {
            if ancestor.parent().is_none() {
                break;
            }
            parts.push(storage::sanitize_for_filename(&ancestor.title));
            current = ancestor.parent();
        }
        parts.reverse();

        let path = parts.iter().fold(base, |acc, part| acc.join(part));
        node.set_output_path(path);
    }

    // === Logging helpers ===

    fn log_node(&self, node: &Arc<TaskNode>, level: LogLevel, phase: &str, message: impl Into<String>) {
        let message = message.into();
        if self.inner.config.enable_logging {
            node.add_log(level, phase, message.clone());
        }
        self.inner.events.emit(Event::Log {
            node_id: node.id.clone(),
            level,
            message,
        });
    }

    fn emit_log(&self, level: LogLevel, message: impl Into<String>) {
        self.inner.events.emit(Event::Log {
            node_id: self.inner.root.id.clone(),
            level,
            message: message.into(),
        });
    }

    fn broadcast_tree(&self) {
        self.inner.events.emit(Event::TreeUpdate {
            tree: Box::new(self.inner.root.snapshot()),
        });
    }
}
