//! The host's bundle of collections, rooted at the installation directory.

use crate::collection::Collection;
use crate::manifest::Manifest;
use crate::paths::DbLayout;
use crate::sessions::SessionStore;
use crate::StoreError;
use berth_core::{Approval, Group, Question, Template};
use tracing::warn;

pub struct Db {
    layout: DbLayout,
    pub sessions: SessionStore,
    pub approvals: Collection<Approval>,
    pub questions: Collection<Question>,
    pub groups: Collection<Group>,
}

impl Db {
    pub fn open(layout: DbLayout) -> Result<Self, StoreError> {
        Ok(Self {
            sessions: SessionStore::open(layout.clone())?,
            approvals: Collection::new(layout.approvals_dir()),
            questions: Collection::new(layout.questions_dir()),
            groups: Collection::new(layout.groups_dir()),
            layout,
        })
    }

    pub fn layout(&self) -> &DbLayout {
        &self.layout
    }

    /// Load a template by name from `agent/templates/<name>.yaml`.
    pub fn template(&self, name: &str) -> Result<Template, StoreError> {
        let path = self.layout.templates_dir().join(format!("{name}.yaml"));
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::TemplateNotFound { name: name.to_string() })
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };
        let manifest: Manifest<Template> = serde_yaml::from_str(&text)
            .map_err(|e| StoreError::Serialize { path, source: e })?;
        Ok(manifest.spec)
    }

    /// All readable templates, by file name. Unreadable files are skipped.
    pub fn templates(&self) -> Result<Vec<Template>, StoreError> {
        let dir = self.layout.templates_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            match self.template(name) {
                Ok(template) => out.push(template),
                Err(e) => warn!(template = name, error = %e, "unreadable template skipped"),
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    /// Add a session to a group. Membership is exclusive: joining while a
    /// member of another group is a conflict.
    pub fn add_to_group(&mut self, group_name: &str, session_id: u64) -> Result<(), StoreError> {
        for (name, group) in self.groups.get_all()? {
            if name != group_name && group.contains(session_id) {
                return Err(StoreError::GroupConflict { session: session_id, group: name });
            }
        }
        let mut group = self
            .groups
            .get(group_name)?
            .unwrap_or_else(|| Group::new(group_name));
        group.add(session_id);
        self.groups.set(group_name, group);
        self.groups.save()
    }

    /// Remove a session from a group; empty groups are tombstoned.
    pub fn remove_from_group(&mut self, group_name: &str, session_id: u64) -> Result<(), StoreError> {
        let Some(mut group) = self.groups.get(group_name)? else {
            return Ok(());
        };
        group.remove(session_id);
        if group.sessions.is_empty() {
            self.groups.delete(group_name);
        } else {
            self.groups.set(group_name, group);
        }
        self.groups.save()
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
