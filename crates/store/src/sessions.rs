//! Session persistence and lifecycle transitions.
//!
//! A session record has exactly one residence at a time: `db/sessions/` from
//! creation until its workspace is seeded, then the workspace's own
//! `db/sessions/` — the file the child shares. Transitions always reload the
//! record, apply the status table, stamp the transition, and save in one
//! step so the peer process observes the change on its next mtime check.

use crate::collection::Collection;
use crate::manifest::Manifest;
use crate::paths::DbLayout;
use crate::StoreError;
use berth_core::{status_fsm, Fsm, Session, SessionAction, SessionStatus, TransitionRecord};
use std::collections::HashMap;

pub struct SessionStore {
    layout: DbLayout,
    main: Collection<Manifest<Session>>,
    /// Collections for workspace-resident sessions, opened lazily.
    resident: HashMap<u64, Collection<Manifest<Session>>>,
    fsm: Fsm<SessionStatus, SessionAction>,
    next_id: u64,
}

impl SessionStore {
    /// Open the store and derive `next_id` from the ids on disk, across
    /// both residences. An empty store starts at 1.
    pub fn open(layout: DbLayout) -> Result<Self, StoreError> {
        let main = Collection::new(layout.sessions_dir());
        let mut store = Self {
            layout,
            main,
            resident: HashMap::new(),
            fsm: status_fsm(),
            next_id: 1,
        };
        store.next_id = store.list_ids()?.into_iter().max().unwrap_or(0) + 1;
        Ok(store)
    }

    pub fn layout(&self) -> &DbLayout {
        &self.layout
    }

    /// Peek at the next id without consuming it.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Allocate the next session id. Monotonic within the process.
    pub fn generate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// All session ids on disk, both residences, ascending.
    pub fn list_ids(&self) -> Result<Vec<u64>, StoreError> {
        let mut ids: Vec<u64> = self
            .main
            .list()?
            .iter()
            .filter_map(|stem| stem.parse().ok())
            .collect();

        let workspaces = self.layout.workspaces_dir();
        match std::fs::read_dir(&workspaces) {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry.map_err(|e| StoreError::io(&workspaces, e))?;
                    let Some(id) = entry
                        .file_name()
                        .to_str()
                        .and_then(|name| name.parse::<u64>().ok())
                    else {
                        continue;
                    };
                    if self.workspace_record_path(id).exists() && !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&workspaces, e)),
        }

        ids.sort_unstable();
        Ok(ids)
    }

    pub fn get(&mut self, id: u64) -> Result<Option<Session>, StoreError> {
        let manifest = self.residence(id).get(&id.to_string())?;
        Ok(manifest.map(|m| m.spec))
    }

    /// Create a new record in the main residence and flush it.
    pub fn create(&mut self, session: Session) -> Result<(), StoreError> {
        let id = session.id;
        self.main.set(&id.to_string(), wrap(session));
        self.main.save()
    }

    /// Write the record back at its current residence and flush it.
    pub fn put(&mut self, session: &Session) -> Result<(), StoreError> {
        let id = session.id;
        let coll = self.residence(id);
        let manifest = match coll.get(&id.to_string())? {
            Some(mut m) => {
                m.metadata.name = session.name.clone();
                m.spec = session.clone();
                m
            }
            None => wrap(session.clone()),
        };
        coll.set(&id.to_string(), manifest);
        coll.save()
    }

    /// Apply a lifecycle action: reload, run the status table, stamp the
    /// transition, save. Invalid transitions are reported and change nothing.
    pub fn transition(
        &mut self,
        id: u64,
        action: SessionAction,
        now_ms: u64,
    ) -> Result<(Session, TransitionRecord), StoreError> {
        let fsm = self.fsm.clone();
        let coll = self.residence(id);
        let key = id.to_string();
        let mut manifest = coll.get(&key)?.ok_or(StoreError::SessionNotFound { id })?;

        let from = manifest.spec.status;
        let to = fsm
            .transition(from, action)
            .map_err(|e| StoreError::InvalidTransition { id, reason: e.to_string() })?;

        let record = TransitionRecord { action, from, to, at: now_ms };
        manifest.spec.status = to;
        manifest.spec.last_transition = Some(record);
        coll.set(&key, manifest.clone());
        coll.save()?;
        Ok((manifest.spec, record))
    }

    /// Stamp the soft-delete time. The file stays on disk.
    pub fn soft_delete(&mut self, id: u64, now_ms: u64) -> Result<(), StoreError> {
        let mut session = self.get(id)?.ok_or(StoreError::SessionNotFound { id })?;
        session.deleted_at = Some(now_ms);
        self.put(&session)
    }

    /// Sessions in ascending id order; soft-deleted ones are excluded from
    /// default listings.
    pub fn list(&mut self, include_deleted: bool) -> Result<Vec<Session>, StoreError> {
        let mut out = Vec::new();
        for id in self.list_ids()? {
            if let Some(session) = self.get(id)? {
                if include_deleted || !session.is_deleted() {
                    out.push(session);
                }
            }
        }
        Ok(out)
    }

    /// Move the record into its workspace residence (the "seeded copy" the
    /// child shares). A no-op when already seeded.
    pub fn adopt_workspace(&mut self, id: u64) -> Result<(), StoreError> {
        if self.workspace_record_path(id).exists() {
            return Ok(());
        }
        let key = id.to_string();
        let manifest = self.main.get(&key)?.ok_or(StoreError::SessionNotFound { id })?;

        let coll = self.resident_collection(id);
        coll.set(&key, manifest);
        coll.save()?;

        self.main.delete(&key);
        self.main.save()
    }

    fn workspace_record_path(&self, id: u64) -> std::path::PathBuf {
        self.layout
            .workspace_layout(id)
            .sessions_dir()
            .join(format!("{id}.yml"))
    }

    fn resident_collection(&mut self, id: u64) -> &mut Collection<Manifest<Session>> {
        let dir = self.layout.workspace_layout(id).sessions_dir();
        self.resident.entry(id).or_insert_with(|| Collection::new(dir))
    }

    fn residence(&mut self, id: u64) -> &mut Collection<Manifest<Session>> {
        if self.resident.contains_key(&id) || self.workspace_record_path(id).exists() {
            self.resident_collection(id)
        } else {
            &mut self.main
        }
    }
}

fn wrap(session: Session) -> Manifest<Session> {
    let name = session.name.clone();
    let mut manifest = Manifest::agent(name, session);
    manifest.metadata.labels = manifest.spec.labels.clone();
    manifest
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
