//! Child-process lifecycle: workspace provisioning, per-session socket
//! servers, spawn, probe, coercion signals, crash recovery.
//!
//! A session's workspace holds its seeded session record and socket; the
//! child runs with the workspace as its working directory, so the same
//! relative layout resolves on both sides. The recorded pid (children map
//! or `db/agent.pid`) is the probe handle across daemon restarts.

use crate::bridge;
use crate::ctx::{ChildHandle, HostCtx};
use crate::DaemonError;
use berth_core::{make_container_id, SessionAction, SessionStatus};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::UnixListener;
use tracing::{debug, info, warn};

/// Coercion signals delivered through the container runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// SIGUSR1: pause and abort in-flight work.
    Pause,
    /// SIGUSR2: stop and exit.
    Stop,
}

/// Provision the workspace, seed the session record into it, bring up the
/// session socket, and spawn the child.
pub async fn spawn_session(ctx: &Arc<HostCtx>, session_id: u64) -> Result<(), DaemonError> {
    provision_workspace(ctx, session_id)?;
    ensure_socket(ctx, session_id)?;
    spawn_child(ctx, session_id).await
}

/// Create the workspace directory tree and move the record in.
fn provision_workspace(ctx: &HostCtx, session_id: u64) -> Result<(), DaemonError> {
    let layout = ctx.layout().workspace_layout(session_id);
    std::fs::create_dir_all(layout.sessions_dir())?;
    std::fs::create_dir_all(layout.sockets_dir())?;
    std::fs::create_dir_all(layout.logs_dir())?;
    ctx.db.lock().sessions.adopt_workspace(session_id)?;
    Ok(())
}

/// Bind the per-session socket (removing any stale file) and accept child
/// connections onto the bridge. Idempotent per session id.
pub fn ensure_socket(ctx: &Arc<HostCtx>, session_id: u64) -> Result<(), DaemonError> {
    if ctx.socket_tasks.lock().contains_key(&session_id) {
        return Ok(());
    }

    let path = ctx.layout().session_socket_path(session_id);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    let listener = UnixListener::bind(&path)
        .map_err(|source| DaemonError::BindFailed { path: path.clone(), source })?;
    info!(session = session_id, socket = %path.display(), "session socket listening");

    let accept_ctx = Arc::clone(ctx);
    let task = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let registry = accept_ctx.registry();
                    bridge::spawn_connection(
                        Arc::clone(&accept_ctx),
                        registry,
                        session_id,
                        stream,
                    );
                }
                Err(e) => {
                    warn!(session = session_id, error = %e, "session accept failed");
                    break;
                }
            }
        }
    });
    ctx.socket_tasks.lock().insert(session_id, task);
    Ok(())
}

/// Spawn `berth-agent <id>` with the workspace as its working directory.
async fn spawn_child(ctx: &Arc<HostCtx>, session_id: u64) -> Result<(), DaemonError> {
    let workspace = ctx.layout().workspace_dir(session_id);
    let container_id = make_container_id(session_id, ctx.now_ms() / 1000);

    let child = tokio::process::Command::new(agent_binary())
        .arg(session_id.to_string())
        .current_dir(&workspace)
        .env("BERTH_UNATTENDED", if ctx.config.unattended { "1" } else { "0" })
        .env("BERTH_TICK_MS", ctx.config.tick_ms.to_string())
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()?;

    let pid = child.id().map(|p| p as i32).unwrap_or_default();
    std::fs::write(workspace.join("db").join("agent.pid"), pid.to_string())?;

    // Record the child's name on the session so listings show it.
    {
        let mut db = ctx.db.lock();
        if let Some(mut session) = db.sessions.get(session_id)? {
            session.container_id = container_id.clone();
            db.sessions.put(&session)?;
        }
    }

    ctx.children
        .lock()
        .insert(session_id, ChildHandle { pid, container_id, child: Some(child) });
    info!(session = session_id, pid, "child spawned");
    Ok(())
}

/// The `berth-agent` binary: env override, else next to this executable.
fn agent_binary() -> PathBuf {
    if let Ok(path) = std::env::var("BERTH_AGENT_BIN") {
        return PathBuf::from(path);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("berth-agent")))
        .unwrap_or_else(|| PathBuf::from("berth-agent"))
}

/// Is the session's child alive? Uses the in-memory handle when this
/// daemon spawned it, the recorded pid otherwise.
pub fn probe(ctx: &HostCtx, session_id: u64) -> bool {
    if let Some(handle) = ctx.children.lock().get_mut(&session_id) {
        if let Some(child) = handle.child.as_mut() {
            return matches!(child.try_wait(), Ok(None));
        }
        return pid_alive(handle.pid);
    }

    let pid_path = ctx.layout().workspace_dir(session_id).join("db").join("agent.pid");
    std::fs::read_to_string(pid_path)
        .ok()
        .and_then(|text| text.trim().parse::<i32>().ok())
        .is_some_and(pid_alive)
}

fn pid_alive(pid: i32) -> bool {
    pid > 0 && kill(Pid::from_raw(pid), None).is_ok()
}

/// Deliver a coercion signal; best-effort.
pub fn signal_child(ctx: &HostCtx, session_id: u64, coercion: Coercion) {
    let pid = ctx.children.lock().get(&session_id).map(|h| h.pid);
    let Some(pid) = pid else {
        debug!(session = session_id, "no child handle to signal");
        return;
    };
    let signal = match coercion {
        Coercion::Pause => Signal::SIGUSR1,
        Coercion::Stop => Signal::SIGUSR2,
    };
    if let Err(e) = kill(Pid::from_raw(pid), signal) {
        warn!(session = session_id, pid, error = %e, "signal delivery failed");
    }
}

/// Make sure a session that should be running has a live child.
pub async fn ensure_child(ctx: &Arc<HostCtx>, session_id: u64) -> Result<(), DaemonError> {
    if probe(ctx, session_id) {
        ensure_socket(ctx, session_id)?;
        return Ok(());
    }
    spawn_session(ctx, session_id).await
}

/// Recovery scan, run once when the daemon is ready: respawn missing
/// children for non-terminal sessions; a stopped session whose child is
/// still live transitions `run`. Terminal sessions with no child idle.
pub async fn recover(ctx: &Arc<HostCtx>) -> Result<(), DaemonError> {
    let sessions = ctx.db.lock().sessions.list(true)?;
    for session in sessions {
        if session.is_deleted() {
            continue;
        }
        let live = probe(ctx, session.id);
        match session.status {
            status if status.expects_child() => {
                ensure_socket(ctx, session.id)?;
                if !live {
                    info!(session = session.id, %status, "respawning missing child");
                    spawn_session(ctx, session.id).await?;
                }
            }
            SessionStatus::Stopped if live => {
                info!(session = session.id, "stopped session has a live child, running it");
                ensure_socket(ctx, session.id)?;
                if let Err(e) = ctx.transition(session.id, SessionAction::Run) {
                    warn!(session = session.id, error = %e, "run transition failed");
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Reap bookkeeping when sessions stop: drop the child handle once its
/// session reaches a terminal status.
pub fn spawn_reaper(ctx: &Arc<HostCtx>) {
    let mut events = ctx.event_bus.subscribe();
    let ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if event.record.to.is_terminal() {
                ctx.children.lock().remove(&event.session_id);
                debug!(session = event.session_id, "child handle dropped");
            }
        }
    });
}

/// Shutdown: stop children, abort socket tasks, remove socket files.
pub fn shutdown(ctx: &HostCtx) {
    for (session_id, handle) in ctx.children.lock().iter() {
        if pid_alive(handle.pid) {
            let _ = kill(Pid::from_raw(handle.pid), Signal::SIGUSR2);
            debug!(session = session_id, pid = handle.pid, "stop signalled");
        }
    }
    for (session_id, task) in ctx.socket_tasks.lock().drain() {
        task.abort();
        let path = ctx.layout().session_socket_path(session_id);
        let _ = std::fs::remove_file(path);
    }
    ctx.connections.lock().clear();
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
