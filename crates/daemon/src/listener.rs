//! Control-socket listener for CLI clients.
//!
//! Each CLI invocation opens the socket, writes one request, waits for
//! the matching response, and disconnects. Commands resolve against the
//! tool registry and either run on the host or forward to the owning
//! session's child over the bridge.

use crate::bridge::{self, HostRegistry};
use crate::ctx::HostCtx;
use berth_core::{Outcome, SessionStatus, ToolContext};
use berth_tools::{route_for, Invocation, Route};
use berth_wire::{FrameReader, Request, Response};
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info};

/// Accept CLI connections until the daemon shuts down.
pub async fn run(ctx: Arc<HostCtx>, listener: UnixListener) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(ctx, stream).await {
                        debug!(error = %e, "control connection ended");
                    }
                });
            }
            Err(e) => error!(error = %e, "control accept failed"),
        }
    }
}

async fn handle_connection(
    ctx: Arc<HostCtx>,
    stream: UnixStream,
) -> Result<(), berth_wire::ProtocolError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);

    while let Some(request) = reader.next::<Request>().await? {
        debug!(request = ?request, "control request");
        let response = handle_request(&ctx, request).await;
        berth_wire::write_frame(&mut write_half, &response).await?;
        if response == Response::ShuttingDown {
            break;
        }
    }
    Ok(())
}

async fn handle_request(ctx: &Arc<HostCtx>, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Status => {
            let sessions_active = ctx
                .db
                .lock()
                .sessions
                .list(false)
                .map(|sessions| {
                    sessions
                        .iter()
                        .filter(|s| {
                            matches!(
                                s.status,
                                SessionStatus::Pending
                                    | SessionStatus::Running
                                    | SessionStatus::Paused
                            )
                        })
                        .count()
                })
                .unwrap_or(0);
            Response::Status {
                uptime_secs: ctx.start_time.elapsed().as_secs(),
                sessions_active,
                version: env!("CARGO_PKG_VERSION").to_string(),
            }
        }

        Request::Shutdown => {
            info!("shutdown requested over control socket");
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }

        Request::Command { request_id, command, session, wait_for_response } => {
            run_command(ctx, request_id, &command, session, wait_for_response).await
        }
    }
}

/// Resolve a command and route it: session 0, local commands, and
/// host-execution tools run here; everything else goes to the child.
async fn run_command(
    ctx: &Arc<HostCtx>,
    request_id: String,
    command: &str,
    session: Option<u64>,
    wait_for_response: bool,
) -> Response {
    let registry: Arc<HostRegistry> = ctx.registry();
    let resolved = match registry.resolve(command) {
        Ok(resolved) => resolved,
        Err(e) => return Response::command_err(request_id, e.to_string()),
    };

    let target = effective_session(ctx, &resolved.args, session, resolved.def.meta.local_command);

    match route_for(&resolved.def.meta, target) {
        Route::Host => {
            let Some(handler) = resolved.handler else {
                return Response::command_err(request_id, format!("command not found: {command}"));
            };
            let invocation = Invocation::first(
                resolved.args,
                ToolContext {
                    session_id: target,
                    tool_call_id: format!("cli_{request_id}"),
                },
            );
            match handler.execute(ctx, invocation).await {
                Outcome::Success { result } => Response::command_ok(request_id, result),
                Outcome::Failure { error } => Response::command_err(request_id, error),
                Outcome::Running { .. } => Response::command_ok(
                    request_id,
                    serde_json::json!({"status": "RUNNING"}),
                ),
            }
        }

        Route::Child(target) => {
            if wait_for_response {
                match bridge::command_round_trip(ctx, target, command).await {
                    Ok(data) => Response::command_ok(request_id, data),
                    Err(e) => Response::command_err(request_id, e),
                }
            } else {
                match bridge::command_fire_and_forget(ctx, target, command).await {
                    Ok(()) => Response::command_ok(
                        request_id,
                        serde_json::json!({"forwarded": true, "session": target}),
                    ),
                    Err(e) => Response::command_err(request_id, e.to_string()),
                }
            }
        }
    }
}

/// The effective session for a command: forced to 0 for local commands,
/// else the CLI's explicit target, the command's own `session` argument,
/// or the configured current session.
fn effective_session(
    ctx: &HostCtx,
    args: &serde_json::Value,
    explicit: Option<u64>,
    local_command: bool,
) -> u64 {
    if local_command {
        return 0;
    }
    if let Some(session) = explicit {
        return session;
    }
    let from_args = match args.get("session") {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    };
    if let Some(session) = from_args {
        return session;
    }
    ctx.config.current_session
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
