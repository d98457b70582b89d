//! Child-process context threaded through tool handlers.
//!
//! There are no process-wide globals: everything a child tool needs — the
//! workspace store, the host link, the global allowlist, the unattended
//! flag, counters — lives here and is passed explicitly.

use crate::bridge::HostLink;
use berth_core::{Approval, Clock, Question, Session, SessionAction, SystemClock};
use berth_store::{Collection, SessionStore};
use berth_tools::Allowlist;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

pub struct ChildCtx {
    pub session_id: u64,
    pub workspace: PathBuf,
    /// With no human attached, unapproved commands fail instead of pausing.
    pub unattended: bool,
    /// Global (per-user) allowlist; a session allowlist overrides it.
    pub allowlist: Arc<Allowlist>,
    pub link: Arc<dyn HostLink>,
    pub store: Arc<Mutex<SessionStore>>,
    /// Child-local approval/question records, under the workspace db.
    pub approvals: Arc<Mutex<Collection<Approval>>>,
    pub questions: Arc<Mutex<Collection<Question>>>,
    request_ids: AtomicU64,
    clock: SystemClock,
}

impl ChildCtx {
    pub fn new(
        session_id: u64,
        workspace: PathBuf,
        unattended: bool,
        allowlist: Arc<Allowlist>,
        link: Arc<dyn HostLink>,
        store: Arc<Mutex<SessionStore>>,
        approvals: Arc<Mutex<Collection<Approval>>>,
        questions: Arc<Mutex<Collection<Question>>>,
    ) -> Self {
        Self {
            session_id,
            workspace,
            unattended,
            allowlist,
            link,
            store,
            approvals,
            questions,
            request_ids: AtomicU64::new(1),
            clock: SystemClock,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    /// Monotonic id for approval/question records created by this child.
    pub fn next_request_id(&self) -> u64 {
        self.request_ids.fetch_add(1, Ordering::Relaxed)
    }

    /// Reload this child's session from the shared store.
    pub fn session(&self) -> Result<Session, String> {
        self.store
            .lock()
            .get(self.session_id)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("session {} not found", self.session_id))
    }

    /// Pause the session for a human-input wait. Already-paused is fine.
    pub fn pause_session(&self) {
        let now = self.now_ms();
        if let Err(e) = self.store.lock().transition(self.session_id, SessionAction::Pause, now) {
            warn!(session = self.session_id, error = %e, "pause before human input failed");
        }
    }

    /// The session's shell allowlist override, if its tool selector
    /// carries one; otherwise the global allowlist.
    pub fn effective_allowlist(&self, session: &Session, tool: &str) -> Arc<Allowlist> {
        let rules = session
            .tool_selector(tool)
            .and_then(|sel| sel.options()?.get("allowlist").cloned());
        match rules {
            Some(value) => match Allowlist::from_json(&value) {
                Ok(list) => Arc::new(list),
                Err(e) => {
                    warn!(session = session.id, error = %e, "bad session allowlist, using global");
                    Arc::clone(&self.allowlist)
                }
            },
            None => Arc::clone(&self.allowlist),
        }
    }

    /// Whether the session carries its own allowlist for `tool`.
    pub fn has_session_allowlist(&self, session: &Session, tool: &str) -> bool {
        session
            .tool_selector(tool)
            .and_then(|sel| sel.options())
            .is_some_and(|o| o.contains_key("allowlist"))
    }
}
