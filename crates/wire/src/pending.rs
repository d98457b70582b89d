//! Pending request/response correlation.
//!
//! Both halves of every duplex channel hold one of these maps. A round-trip
//! registers a resolver under its message id, sends, and awaits the matched
//! response with a deadline; the entry is cleared on resolution or timeout.
//! Long-running human-input flows never register here — they return
//! immediately and deliver results via follow-up messages.

use crate::message::CorrelationId;
use crate::ProtocolError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Default deadline for host↔child command round-trips.
pub const ROUND_TRIP_TIMEOUT: Duration = Duration::from_secs(5);

/// The resolved value of a round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandReply {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl CommandReply {
    /// Collapse into a result: failures carry the peer's error text.
    pub fn into_result(self) -> Result<serde_json::Value, String> {
        if self.success {
            Ok(self.data.unwrap_or(serde_json::Value::Null))
        } else {
            Err(self.error.unwrap_or_else(|| "unknown error".to_string()))
        }
    }
}

#[derive(Clone, Default)]
pub struct PendingMap {
    inner: Arc<Mutex<HashMap<CorrelationId, oneshot::Sender<CommandReply>>>>,
}

impl PendingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver for `id` and return its receiver.
    pub fn register(&self, id: CorrelationId) -> oneshot::Receiver<CommandReply> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().insert(id, tx);
        rx
    }

    /// Resolve a pending entry. Returns false when no entry matched
    /// (late or unsolicited response).
    pub fn resolve(&self, id: &CorrelationId, reply: CommandReply) -> bool {
        match self.inner.lock().remove(id) {
            Some(tx) => tx.send(reply).is_ok(),
            None => false,
        }
    }

    /// Await a registered receiver with a deadline. On timeout the entry is
    /// cleared and a `Timeout` error surfaces.
    pub async fn await_reply(
        &self,
        id: &CorrelationId,
        rx: oneshot::Receiver<CommandReply>,
        deadline: Duration,
    ) -> Result<CommandReply, ProtocolError> {
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => {
                self.inner.lock().remove(id);
                Err(ProtocolError::ConnectionClosed)
            }
            Err(_) => {
                self.inner.lock().remove(id);
                Err(ProtocolError::Timeout)
            }
        }
    }

    /// In-flight round-trips; bounded by the timeout in practice.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
