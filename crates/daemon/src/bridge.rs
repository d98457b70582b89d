//! Host half of the host–container bridge.
//!
//! Each accepted per-session connection gets a reader task here; the write
//! half lands in the context's connection map keyed by session id. Child
//! requests (tool calls, completions) are answered with correlated
//! `command_response` frames; human-input requests are persisted and
//! surfaced; everything else routes by session id.

use crate::approvals;
use crate::ctx::HostCtx;
use crate::DaemonError;
use berth_core::{Outcome, ToolContext};
use berth_tools::{Invocation, Origin, Registry};
use berth_wire::{host_message_id, CommandReply, FrameReader, Message, ROUND_TRIP_TIMEOUT};
use std::sync::Arc;
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub type HostRegistry = Registry<Arc<HostCtx>>;

/// Adopt an accepted child connection: register the writer, pump the reader.
pub fn spawn_connection(
    ctx: Arc<HostCtx>,
    registry: Arc<HostRegistry>,
    session_id: u64,
    stream: UnixStream,
) {
    let (read_half, write_half) = stream.into_split();
    ctx.connections
        .lock()
        .insert(session_id, Arc::new(tokio::sync::Mutex::new(write_half)));
    info!(session = session_id, "child connection registered");

    tokio::spawn(async move {
        let mut reader = FrameReader::new(read_half);
        loop {
            match reader.next::<Message>().await {
                Ok(Some(message)) => {
                    handle_child_message(&ctx, &registry, session_id, message).await;
                }
                Ok(None) => break,
                // A bad record is logged and skipped; only an
                // irrecoverable framing failure drops the connection.
                Err(berth_wire::ProtocolError::Malformed(e)) => {
                    warn!(session = session_id, error = %e, "malformed message skipped");
                }
                Err(e) => {
                    warn!(session = session_id, error = %e, "session socket read failed");
                    break;
                }
            }
        }
        ctx.connections.lock().remove(&session_id);
        info!(session = session_id, "child connection removed");
    });
}

/// Write one framed message to a session's child.
pub async fn send_to_container(
    ctx: &HostCtx,
    session_id: u64,
    message: &Message,
) -> Result<(), DaemonError> {
    let writer = ctx
        .connections
        .lock()
        .get(&session_id)
        .cloned()
        .ok_or(DaemonError::Protocol(berth_wire::ProtocolError::NoConnection(session_id)))?;
    let mut writer = writer.lock().await;
    berth_wire::write_frame(&mut *writer, message).await?;
    Ok(())
}

/// Forward a command to a session's child and wait for the correlated
/// response (5 s deadline).
pub async fn command_round_trip(
    ctx: &HostCtx,
    session_id: u64,
    command: &str,
) -> Result<serde_json::Value, String> {
    let id = host_message_id(ctx.now_ms());
    let message = Message::Command {
        message_id: Some(id.clone()),
        session_id,
        command: command.to_string(),
        wait_for_response: true,
    };
    let rx = ctx.pending.register(id.clone());
    if let Err(e) = send_to_container(ctx, session_id, &message).await {
        ctx.pending.resolve(&id, CommandReply { success: false, data: None, error: None });
        return Err(e.to_string());
    }
    ctx.pending
        .await_reply(&id, rx, ROUND_TRIP_TIMEOUT)
        .await
        .map_err(|e| e.to_string())?
        .into_result()
}

/// Forward a command without waiting.
pub async fn command_fire_and_forget(
    ctx: &HostCtx,
    session_id: u64,
    command: &str,
) -> Result<(), DaemonError> {
    let message = Message::Command {
        message_id: None,
        session_id,
        command: command.to_string(),
        wait_for_response: false,
    };
    send_to_container(ctx, session_id, &message).await
}

/// Dispatch one message received from a child.
async fn handle_child_message(
    ctx: &Arc<HostCtx>,
    registry: &Arc<HostRegistry>,
    session_id: u64,
    message: Message,
) {
    match message {
        Message::ToolCall { message_id, session_id: target, tool_call } => {
            let outcome = execute_host_tool(ctx, registry, target, &tool_call).await;
            let reply = match outcome {
                Outcome::Success { result } => Message::ok_response(message_id, result),
                Outcome::Failure { error } => Message::err_response(message_id, error),
                Outcome::Running { .. } => {
                    Message::err_response(message_id, "host tools cannot suspend")
                }
            };
            if let Err(e) = send_to_container(ctx, session_id, &reply).await {
                warn!(session = session_id, error = %e, "tool reply undeliverable");
            }
        }

        Message::AiPromptRequest { message_id, session_id: target, request } => {
            let abort = CancellationToken::new();
            let model = request.model.clone();
            let reply = match ctx.providers.complete(&model, request, abort).await {
                Ok(response) => match serde_json::to_value(&response) {
                    Ok(data) => Message::ok_response(message_id, data),
                    Err(e) => Message::err_response(message_id, e.to_string()),
                },
                Err(e) => Message::err_response(message_id, e.to_string()),
            };
            debug!(session = target, "completion served");
            if let Err(e) = send_to_container(ctx, session_id, &reply).await {
                warn!(session = session_id, error = %e, "completion reply undeliverable");
            }
        }

        Message::ApprovalRequest { session_id: target, approval } => {
            let id = approvals::record_approval(ctx, target, approval);
            info!(session = target, approval = id, "approval surfaced");
        }

        Message::QuestionRequest { session_id: target, question } => {
            let id = approvals::record_question(ctx, target, question);
            info!(session = target, question = id, "question surfaced");
        }

        Message::CommandResponse { message_id, success, data, error } => {
            let reply = CommandReply { success, data, error };
            if !ctx.pending.resolve(&message_id, reply) {
                warn!(%message_id, "response matched no pending request");
            }
        }

        other => warn!(session = session_id, message = ?other, "unexpected message from child"),
    }
}

/// Execute a host-routed tool call from a child's model turn.
async fn execute_host_tool(
    ctx: &Arc<HostCtx>,
    registry: &HostRegistry,
    session_id: u64,
    call: &berth_core::ToolCall,
) -> Outcome {
    let name = call.function.name.as_str();
    let def = match registry.get_for(name, Origin::Model) {
        Ok(def) => def,
        Err(e) => return Outcome::failure(e.to_string()),
    };
    if !def.meta.requires_host_execution && !host_upgrade(ctx, session_id, name) {
        return Outcome::failure(format!("tool {name} does not run on the host"));
    }
    let Some(handler) = registry.handler(name) else {
        return Outcome::failure(format!("no host handler for tool {name}"));
    };
    let args = match call.parsed_arguments() {
        Ok(args) => args,
        Err(e) => return Outcome::failure(format!("malformed tool arguments: {e}")),
    };
    let invocation = Invocation::first(
        args,
        ToolContext { session_id, tool_call_id: call.id.clone() },
    );
    handler.execute(ctx, invocation).await
}

/// A session may upgrade a tool to host execution via
/// `exec_on: host_danger` in its tool selector options.
fn host_upgrade(ctx: &HostCtx, session_id: u64, tool: &str) -> bool {
    ctx.db
        .lock()
        .sessions
        .get(session_id)
        .ok()
        .flatten()
        .and_then(|s| {
            s.tool_selector(tool)
                .and_then(|sel| sel.option_str("exec_on").map(str::to_string))
        })
        .is_some_and(|v| v == "host_danger")
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
