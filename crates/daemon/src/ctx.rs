//! The daemon's shared context.
//!
//! No hidden globals: registries, the db, connection and child maps, and
//! counters are fields here, threaded explicitly into every handler. Tool
//! handlers receive `Arc<HostCtx>` as their context type so they can spawn
//! tasks that outlive the call.

use crate::config::Config;
use crate::event_bus::{EventBus, SessionEvent};
use crate::providers::ProviderRegistry;
use crate::DaemonError;
use berth_core::{Clock, Session, SessionAction, SystemClock};
use berth_store::{Db, DbLayout};
use berth_wire::PendingMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::net::unix::OwnedWriteHalf;
use tokio::sync::Notify;

/// A supervised child process.
pub struct ChildHandle {
    pub pid: i32,
    pub container_id: String,
    /// Present for children spawned by this daemon process; absent after
    /// a daemon restart (probing falls back to the recorded pid).
    pub child: Option<tokio::process::Child>,
}

pub struct HostCtx {
    pub config: Config,
    pub db: Mutex<Db>,
    pub providers: ProviderRegistry,
    pub event_bus: EventBus,
    /// Registered child connections: session id → write half.
    pub connections: Mutex<HashMap<u64, Arc<tokio::sync::Mutex<OwnedWriteHalf>>>>,
    /// Host→child round-trip correlation.
    pub pending: PendingMap,
    pub children: Mutex<HashMap<u64, ChildHandle>>,
    /// Per-session socket accept tasks, aborted on shutdown.
    pub socket_tasks: Mutex<HashMap<u64, tokio::task::JoinHandle<()>>>,
    pub shutdown: Arc<Notify>,
    pub start_time: Instant,
    /// Set once at boot, after the tool registry is built.
    registry: OnceLock<Arc<crate::bridge::HostRegistry>>,
    approval_ids: AtomicU64,
    question_ids: AtomicU64,
    clock: SystemClock,
}

impl HostCtx {
    pub fn new(config: Config, db: Db, providers: ProviderRegistry) -> Self {
        Self {
            config,
            db: Mutex::new(db),
            providers,
            event_bus: EventBus::new(),
            connections: Mutex::new(HashMap::new()),
            pending: PendingMap::new(),
            children: Mutex::new(HashMap::new()),
            socket_tasks: Mutex::new(HashMap::new()),
            shutdown: Arc::new(Notify::new()),
            start_time: Instant::now(),
            registry: OnceLock::new(),
            approval_ids: AtomicU64::new(1),
            question_ids: AtomicU64::new(1),
            clock: SystemClock,
        }
    }

    /// Install the tool registry during the boot phase. Later calls are
    /// ignored.
    pub fn set_registry(&self, registry: Arc<crate::bridge::HostRegistry>) {
        let _ = self.registry.set(registry);
    }

    pub fn registry(&self) -> Arc<crate::bridge::HostRegistry> {
        self.registry
            .get()
            .cloned()
            .unwrap_or_else(|| Arc::new(berth_tools::Registry::new()))
    }

    pub fn layout(&self) -> DbLayout {
        DbLayout::new(&self.config.root)
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    /// Approval ids are monotonic for the lifetime of this process.
    pub fn next_approval_id(&self) -> u64 {
        self.approval_ids.fetch_add(1, Ordering::Relaxed)
    }

    pub fn next_question_id(&self) -> u64 {
        self.question_ids.fetch_add(1, Ordering::Relaxed)
    }

    /// Run a lifecycle transition and publish it on the event bus.
    pub fn transition(
        &self,
        session_id: u64,
        action: SessionAction,
    ) -> Result<Session, DaemonError> {
        let now = self.now_ms();
        let (session, record) = self.db.lock().sessions.transition(session_id, action, now)?;
        self.event_bus.emit(SessionEvent { session_id, record });
        Ok(session)
    }
}
