//! `berth daemon …`: start, stop, and inspect the host daemon.

use crate::cli::DaemonAction;
use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use berth_store::DbLayout;
use berth_wire::{Request, Response};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub async fn run(root: &Path, client: &DaemonClient, action: DaemonAction) -> Result<(), ExitError> {
    match action {
        DaemonAction::Start => start(root, client).await,
        DaemonAction::Stop => stop(client).await,
        DaemonAction::Status => status(client).await,
    }
}

async fn start(root: &Path, client: &DaemonClient) -> Result<(), ExitError> {
    if client.request(Request::Ping).await.is_ok() {
        println!("daemon already running");
        return Ok(());
    }

    std::fs::create_dir_all(root)
        .map_err(|e| ExitError::new(1, format!("cannot create {}: {e}", root.display())))?;

    std::process::Command::new(daemon_binary())
        .arg(root)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ExitError::new(1, format!("failed to spawn berthd: {e}")))?;

    // Wait for the control socket to come up.
    let socket = DbLayout::new(root).control_socket_path();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if socket.exists() && client.request(Request::Ping).await.is_ok() {
            println!("daemon started");
            return Ok(());
        }
    }
    Err(ExitError::new(1, "daemon did not come up in time; check db/logs/daemon.log"))
}

async fn stop(client: &DaemonClient) -> Result<(), ExitError> {
    match client.request(Request::Shutdown).await? {
        Response::ShuttingDown => {
            println!("daemon shutting down");
            Ok(())
        }
        other => Err(ExitError::new(1, format!("unexpected response: {other:?}"))),
    }
}

async fn status(client: &DaemonClient) -> Result<(), ExitError> {
    match client.request(Request::Status).await? {
        Response::Status { uptime_secs, sessions_active, version } => {
            println!("version:  {version}");
            println!("uptime:   {uptime_secs}s");
            println!("sessions: {sessions_active} active");
            Ok(())
        }
        other => Err(ExitError::new(1, format!("unexpected response: {other:?}"))),
    }
}

/// The `berthd` binary: env override, else next to this executable.
fn daemon_binary() -> PathBuf {
    if let Ok(path) = std::env::var("BERTH_DAEMON_BIN") {
        return PathBuf::from(path);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("berthd")))
        .unwrap_or_else(|| PathBuf::from("berthd"))
}
