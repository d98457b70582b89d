//! Child half of the host–container bridge.
//!
//! The child keeps one connection to the host's per-session socket.
//! Outbound requests carry monotonic integer message ids and suspend on
//! the pending map with the standard 5 s deadline; inbound traffic is
//! split by a pump task into correlation resolutions (`command_response`)
//! and runtime messages (approvals, questions, commands) delivered through
//! an inbox channel. If the host goes away, the pump reconnects with
//! backoff so a restarted daemon picks the child back up on next accept.

use crate::EngineError;
use async_trait::async_trait;
use berth_core::{CompletionRequest, CompletionResponse, Outcome, ToolCall};
use berth_wire::{
    child_message_id, CommandReply, CorrelationId, FrameReader, Message, PendingMap,
    ROUND_TRIP_TIMEOUT,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// What the agent loop needs from the host. Faked in tests.
#[async_trait]
pub trait HostLink: Send + Sync {
    /// Run a completion on the host. Credentials never reach the child.
    async fn complete(
        &self,
        session_id: u64,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, EngineError>;

    /// Round-trip a host-executed tool call.
    async fn call_host_tool(&self, session_id: u64, call: ToolCall) -> Outcome;

    /// Fire-and-forget (approval/question requests, command replies).
    async fn notify(&self, message: Message) -> Result<(), EngineError>;
}

pub struct ChildBridge {
    socket_path: PathBuf,
    /// `None` while disconnected; the pump restores it on reconnect.
    writer: Mutex<Option<OwnedWriteHalf>>,
    pending: PendingMap,
    counter: AtomicU64,
}

impl ChildBridge {
    /// Connect to the host socket, retrying until `deadline` elapses —
    /// the supervisor may still be binding when the child starts.
    pub async fn connect(
        socket_path: &Path,
        deadline: Duration,
    ) -> Result<(Arc<Self>, mpsc::Receiver<Message>), EngineError> {
        let started = std::time::Instant::now();
        let stream = loop {
            match UnixStream::connect(socket_path).await {
                Ok(stream) => break stream,
                Err(e) if started.elapsed() < deadline => {
                    debug!(error = %e, "host socket not ready, retrying");
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
                Err(e) => return Err(EngineError::Io(e)),
            }
        };

        let (read_half, write_half) = stream.into_split();
        let bridge = Arc::new(Self {
            socket_path: socket_path.to_path_buf(),
            writer: Mutex::new(Some(write_half)),
            pending: PendingMap::new(),
            counter: AtomicU64::new(1),
        });

        let (inbox_tx, inbox_rx) = mpsc::channel(64);
        tokio::spawn(Arc::clone(&bridge).pump(read_half, inbox_tx));
        Ok((bridge, inbox_rx))
    }

    /// Read frames forever, reconnecting whenever the host side drops.
    async fn pump(self: Arc<Self>, first: OwnedReadHalf, inbox: mpsc::Sender<Message>) {
        let mut reader = FrameReader::new(first);
        loop {
            loop {
                match reader.next::<Message>().await {
                    Ok(Some(Message::CommandResponse { message_id, success, data, error })) => {
                        let reply = CommandReply { success, data, error };
                        if !self.pending.resolve(&message_id, reply) {
                            warn!(%message_id, "response matched no pending request");
                        }
                    }
                    Ok(Some(message)) => {
                        if inbox.send(message).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => {
                        debug!("host closed the session socket");
                        break;
                    }
                    // Bad records are skipped; only framing failures
                    // force a reconnect.
                    Err(berth_wire::ProtocolError::Malformed(e)) => {
                        warn!(error = %e, "malformed message skipped");
                    }
                    Err(e) => {
                        warn!(error = %e, "session socket read failed");
                        break;
                    }
                }
            }

            *self.writer.lock().await = None;
            reader = loop {
                tokio::time::sleep(RECONNECT_BACKOFF).await;
                match UnixStream::connect(&self.socket_path).await {
                    Ok(stream) => {
                        info!(socket = %self.socket_path.display(), "host link re-established");
                        let (read_half, write_half) = stream.into_split();
                        *self.writer.lock().await = Some(write_half);
                        break FrameReader::new(read_half);
                    }
                    Err(e) => debug!(error = %e, "host still unreachable"),
                }
            };
        }
    }

    fn next_id(&self) -> CorrelationId {
        child_message_id(self.counter.fetch_add(1, Ordering::Relaxed))
    }

    async fn write(&self, message: &Message) -> Result<(), EngineError> {
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(EngineError::Link("host link down".to_string()));
        };
        berth_wire::write_frame(writer, message)
            .await
            .map_err(EngineError::Protocol)
    }

    /// Send a correlated request and suspend on the matched response.
    async fn round_trip(
        &self,
        id: CorrelationId,
        message: Message,
    ) -> Result<CommandReply, EngineError> {
        let rx = self.pending.register(id.clone());
        self.write(&message).await?;
        self.pending
            .await_reply(&id, rx, ROUND_TRIP_TIMEOUT)
            .await
            .map_err(EngineError::Protocol)
    }
}

#[async_trait]
impl HostLink for ChildBridge {
    async fn complete(
        &self,
        session_id: u64,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, EngineError> {
        let id = self.next_id();
        let message = Message::AiPromptRequest { message_id: id.clone(), session_id, request };
        let reply = self.round_trip(id, message).await?;
        let data = reply.into_result().map_err(EngineError::Provider)?;
        serde_json::from_value(data)
            .map_err(|e| EngineError::Provider(format!("malformed completion response: {e}")))
    }

    async fn call_host_tool(&self, session_id: u64, call: ToolCall) -> Outcome {
        let id = self.next_id();
        let message = Message::ToolCall { message_id: id.clone(), session_id, tool_call: call };
        match self.round_trip(id, message).await {
            Ok(reply) => match reply.into_result() {
                Ok(data) => Outcome::Success { result: data },
                Err(error) => Outcome::failure(error),
            },
            Err(e) => Outcome::failure(format!("host tool round-trip failed: {e}")),
        }
    }

    async fn notify(&self, message: Message) -> Result<(), EngineError> {
        self.write(&message).await
    }
}
