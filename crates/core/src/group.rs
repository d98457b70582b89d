//! Named session groups for fan-out commands.
//!
//! Membership is exclusive: a session belongs to at most one group. The
//! store layer enforces exclusivity across groups; this type only manages
//! one group's member set.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sessions: Vec<u64>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), sessions: Vec::new() }
    }

    pub fn contains(&self, session_id: u64) -> bool {
        self.sessions.contains(&session_id)
    }

    /// Add a member; returns false if it was already present.
    pub fn add(&mut self, session_id: u64) -> bool {
        if self.contains(session_id) {
            return false;
        }
        self.sessions.push(session_id);
        true
    }

    /// Remove a member; returns false if it was absent.
    pub fn remove(&mut self, session_id: u64) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|id| *id != session_id);
        self.sessions.len() != before
    }
}
