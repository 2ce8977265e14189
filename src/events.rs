//! Event sink: out-of-band notifications consumed by dashboards.
//!
//! The core only emits. Emission is fire-and-forget and must never block
//! or fail; sinks that fall behind drop events.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::tree::{ExecutionMode, LogLevel, NodeSnapshot};

/// Default broadcast channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// The event vocabulary emitted by the scheduler
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TaskStart {
        task_id: String,
        title: String,
    },
    TaskComplete {
        task_id: String,
        title: String,
    },
    TaskFailed {
        task_id: String,
        title: String,
        error: String,
    },
    NodeStart {
        node_id: String,
        title: String,
        depth: u32,
    },
    NodeComplete {
        node_id: String,
        title: String,
    },
    NodeFailed {
        node_id: String,
        title: String,
        error: String,
    },
    /// A node was decomposed into sub-tasks
    Subtasks {
        node_id: String,
        count: usize,
        mode: ExecutionMode,
    },
    Log {
        node_id: String,
        level: LogLevel,
        message: String,
    },
    /// Full tree snapshot for dashboard synchronisation
    TreeUpdate {
        tree: Box<NodeSnapshot>,
    },
}

impl Event {
    /// Wire name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::TaskStart { .. } => "task_start",
            Event::TaskComplete { .. } => "task_complete",
            Event::TaskFailed { .. } => "task_failed",
            Event::NodeStart { .. } => "node_start",
            Event::NodeComplete { .. } => "node_complete",
            Event::NodeFailed { .. } => "node_failed",
            Event::Subtasks { .. } => "subtasks",
            Event::Log { .. } => "log",
            Event::TreeUpdate { .. } => "tree_update",
        }
    }
}

/// Consumer of scheduler events
pub trait EventSink: Send + Sync {
    /// Fire-and-forget emission; must not block or fail
    fn emit(&self, event: Event);
}

/// Sink that discards everything, for tests and headless runs
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

/// Sink backed by a tokio broadcast channel; dashboard servers subscribe
/// and serialise events onto the wire as JSON.
pub struct BroadcastSink {
    tx: broadcast::Sender<Event>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: Event) {
        debug!(event_type = event.event_type(), "emit");
        // No subscribers is fine; full channels drop the oldest events
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::LogLevel;

    #[test]
    fn test_event_wire_names() {
        let event = Event::TaskStart {
            task_id: "abc12345".to_string(),
            title: "Test".to_string(),
        };
        assert_eq!(event.event_type(), "task_start");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "task_start");
        assert_eq!(json["task_id"], "abc12345");
    }

    #[test]
    fn test_subtasks_event_payload() {
        let event = Event::Subtasks {
            node_id: "n1".to_string(),
            count: 3,
            mode: ExecutionMode::Parallel,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "subtasks");
        assert_eq!(json["count"], 3);
        assert_eq!(json["mode"], "parallel");
    }

    #[test]
    fn test_null_sink_is_silent() {
        NullSink.emit(Event::Log {
            node_id: "n1".to_string(),
            level: LogLevel::Info,
            message: "hello".to_string(),
        });
    }

    #[tokio::test]
    async fn test_broadcast_sink_delivers() {
        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();

        sink.emit(Event::NodeStart {
            node_id: "n1".to_string(),
            title: "Child".to_string(),
            depth: 1,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "node_start");
    }

    #[test]
    fn test_broadcast_sink_without_subscribers_does_not_panic() {
        let sink = BroadcastSink::new(16);
        sink.emit(Event::TaskComplete {
            task_id: "t".to_string(),
            title: "Done".to_string(),
        });
        assert_eq!(sink.subscriber_count(), 0);
    }
}
