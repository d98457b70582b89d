//! berth-agent: the per-session child process.
//!
//! Spawned by the daemon with the session id as its single argument and
//! the session workspace as its working directory. Connects back to the
//! host over the session socket, then hands control to the agent loop.

use berth_engine::agent_loop::{AgentLoop, LoopConfig};
use berth_engine::bridge::{ChildBridge, HostLink};
use berth_engine::context::ChildCtx;
use berth_engine::executor::ToolExecutor;
use berth_engine::{signals, tools};
use berth_store::{Collection, DbLayout, SessionStore};
use berth_tools::Allowlist;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

fn main() {
    let code = match run() {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "berth-agent failed");
            eprintln!("berth-agent: {e}");
            1
        }
    };
    std::process::exit(code);
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let session_id: u64 = std::env::args()
        .nth(1)
        .ok_or("usage: berth-agent <session-id>")?
        .parse()
        .map_err(|_| "session id must be an integer")?;

    let workspace = std::env::current_dir()?;
    let layout = DbLayout::new(&workspace);

    init_logging(&layout);
    info!(session = session_id, workspace = %workspace.display(), "berth-agent starting");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_child(session_id, layout))
}

async fn run_child(
    session_id: u64,
    layout: DbLayout,
) -> Result<(), Box<dyn std::error::Error>> {
    let socket = layout.sockets_dir().join(format!("{session_id}.sock"));
    let (bridge, inbox) = ChildBridge::connect(&socket, Duration::from_secs(10)).await?;
    info!(socket = %socket.display(), "connected to host");

    let store = SessionStore::open(layout.clone())?;
    let unattended = std::env::var("BERTH_UNATTENDED").is_ok_and(|v| v == "1" || v == "true");
    let allowlist = load_allowlist();

    let link: Arc<dyn HostLink> = bridge;
    let ctx = Arc::new(ChildCtx::new(
        session_id,
        layout.root().to_path_buf(),
        unattended,
        Arc::new(allowlist),
        link,
        Arc::new(Mutex::new(store)),
        Arc::new(Mutex::new(Collection::new(layout.approvals_dir()))),
        Arc::new(Mutex::new(Collection::new(layout.questions_dir()))),
    ));

    let config = LoopConfig {
        tick_interval: tick_interval_from_env(),
    };
    let agent = AgentLoop::new(
        ctx,
        Arc::new(tools::child_registry()),
        Arc::new(ToolExecutor::new()),
        config,
    );

    let signal_rx = signals::spawn_listeners()?;
    agent.run(inbox, signal_rx).await?;
    Ok(())
}

/// The per-user allowlist; absence is an empty list, unreadable files are
/// fatal at startup rather than silently permissive.
fn load_allowlist() -> Allowlist {
    let path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("berth")
        .join("allowlist.yml");
    match Allowlist::load(&path) {
        Ok(list) => list,
        Err(e) => {
            eprintln!("berth-agent: {e}");
            std::process::exit(1);
        }
    }
}

fn tick_interval_from_env() -> Duration {
    std::env::var("BERTH_TICK_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_secs(2))
}

fn init_logging(layout: &DbLayout) {
    let _ = std::fs::create_dir_all(layout.logs_dir());
    let appender = tracing_appender::rolling::never(layout.logs_dir(), "agent.log");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(appender)
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
