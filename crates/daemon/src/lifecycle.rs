//! Daemon startup and shutdown.
//!
//! Startup order matters: directories, then the exclusive lock (no second
//! daemon), then collections, then the control socket, and only once the
//! socket server is up, the recovery scan. Unrecoverable failures here are
//! the only errors that exit the process.

use crate::config::Config;
use crate::ctx::HostCtx;
use crate::providers::ProviderRegistry;
use crate::{host_tools, listener, supervisor, DaemonError};
use berth_store::{Db, DbLayout};
use fs2::FileExt;
use std::io::Write;
use std::sync::Arc;
use tokio::net::UnixListener;
use tracing::info;

pub struct Daemon {
    pub ctx: Arc<HostCtx>,
    control: UnixListener,
    /// Held for the daemon's lifetime; the OS releases it on exit.
    _lock_file: std::fs::File,
}

pub async fn startup(config: Config, providers: ProviderRegistry) -> Result<Daemon, DaemonError> {
    let layout = DbLayout::new(&config.root);

    // 1. Directories first — lock and socket live under db/.
    std::fs::create_dir_all(layout.sessions_dir())?;
    std::fs::create_dir_all(layout.workspaces_dir())?;
    std::fs::create_dir_all(layout.logs_dir())?;

    // 2. Exclusive lock before anything else mutates shared state. Open
    // without truncating so a failed lock leaves the owner's pid intact.
    let lock_path = layout.lock_path();
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| DaemonError::LockHeld(lock_path.clone()))?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Collections.
    let db = Db::open(layout.clone())?;

    // 4. Control socket, removing any stale file from a crashed daemon.
    let control_path = layout.control_socket_path();
    if control_path.exists() {
        std::fs::remove_file(&control_path)?;
    }
    let control = UnixListener::bind(&control_path)
        .map_err(|source| DaemonError::BindFailed { path: control_path.clone(), source })?;
    info!(socket = %control_path.display(), "control socket listening");

    let ctx = Arc::new(HostCtx::new(config, db, providers));
    ctx.set_registry(Arc::new(host_tools::host_registry()));
    supervisor::spawn_reaper(&ctx);

    // 5. Recovery scan, once collections are loaded and the socket
    // server is up.
    supervisor::recover(&ctx).await?;

    Ok(Daemon { ctx, control, _lock_file: lock_file })
}

/// Serve until shutdown is requested, then tear down children and sockets.
pub async fn run(daemon: Daemon) {
    let Daemon { ctx, control, _lock_file } = daemon;
    let shutdown = Arc::clone(&ctx.shutdown);

    tokio::select! {
        _ = listener::run(Arc::clone(&ctx), control) => {}
        _ = shutdown.notified() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received");
        }
    }

    info!("daemon shutting down");
    supervisor::shutdown(&ctx);
    let _ = std::fs::remove_file(ctx.layout().control_socket_path());
    let _ = std::fs::remove_file(ctx.layout().lock_path());
}
