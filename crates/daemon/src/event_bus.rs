//! Session lifecycle events.
//!
//! The store never talks to the bridge: transitions return their record,
//! and the daemon publishes it here. The supervisor subscribes to reap
//! children of stopped sessions; other listeners are free to join.

use berth_core::TransitionRecord;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub session_id: u64,
    pub record: TransitionRecord,
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Publish; lagging or absent subscribers are fine.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}
