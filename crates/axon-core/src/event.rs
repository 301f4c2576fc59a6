use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::sync::Arc;
use tokio::sync::broadcast;

/// Lifecycle events flowing out of the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuntimeEvent {
    // ── Message cycle ──────────────────────────────────────────
    CycleStarted {
        session_id: Uuid,
        message_id: Uuid,
    },
    CycleFinished {
        session_id: Uuid,
        message_id: Uuid,
        failed: bool,
    },
    ActionStarted {
        session_id: Uuid,
        action: String,
    },
    ActionCompleted {
        session_id: Uuid,
        action: String,
    },
    ActionFailed {
        session_id: Uuid,
        action: String,
        error: String,
    },

    // ── Task lifecycle ─────────────────────────────────────────
    TaskCreated {
        task_id: Uuid,
        name: String,
    },
    TaskExecuted {
        task_id: Uuid,
        name: String,
    },
    TaskFailed {
        task_id: Uuid,
        name: String,
        error: String,
    },
    TaskDeleted {
        task_id: Uuid,
    },

    // ── Service lifecycle ──────────────────────────────────────
    ServiceStarted {
        service_type: String,
    },
    ServiceStopped {
        service_type: String,
    },

    // ── Plugin lifecycle ───────────────────────────────────────
    PluginLoaded {
        plugin: String,
    },

    // ── System ─────────────────────────────────────────────────
    Shutdown,
}

/// A broadcast-based event bus for runtime-wide pub/sub.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<RuntimeEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn publish(&self, event: RuntimeEvent) {
        // Ignore send errors (no subscribers).
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(4096)
    }
}
