//! Status events emitted to callers
//!
//! Recording and replay progress is broadcast for UI/status observers.
//! Delivery is lossy and not required for correctness; emitters never
//! block on slow or absent subscribers.

use tokio::sync::broadcast;

/// Status event published by the recorder/replayer
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A recording session started
    RecordingStarted { id: String, name: String },
    /// An action was appended to the active recording
    ActionRecorded { id: String, kind: String },
    /// A recording session was stopped and persisted
    RecordingStopped { id: String, actions: usize },
    /// A replay run started
    ReplayStarted { id: String, actions: usize },
    /// A single action of a replay run finished
    ActionReplayed { id: String, index: usize, ok: bool },
    /// A replay run completed
    ReplayCompleted {
        id: String,
        ok: bool,
        actions_executed: usize,
    },
}

/// Broadcast hub for [`SessionEvent`]s
#[derive(Debug)]
pub struct EventHub {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventHub {
    /// Create a new event hub with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Emit an event. Dropped silently when nobody is listening.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(128)
    }
}
