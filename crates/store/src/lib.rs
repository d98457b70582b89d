// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! berth-store: durable file-backed collections.
//!
//! The filesystem doubles as the publish/subscribe bus between the host and
//! the per-session children for "cold" state: one YAML file per record,
//! re-read when its mtime moves. The duplex sockets carry "hot" signals;
//! this crate carries the consistent view.

mod collection;
mod db;
mod manifest;
mod paths;
mod sessions;

pub use collection::Collection;
pub use db::Db;
pub use manifest::{Manifest, Metadata, API_VERSION, KIND_AGENT};
pub use paths::DbLayout;
pub use sessions::SessionStore;

use std::path::PathBuf;

/// Errors surfaced by the store. Parse failures on individual records are
/// logged and treated as absence; these are the errors that propagate.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("session {id} not found")]
    SessionNotFound { id: u64 },

    #[error("invalid transition for session {id}: {reason}")]
    InvalidTransition { id: u64, reason: String },

    #[error("session {session} already belongs to group {group}")]
    GroupConflict { session: u64, group: String },

    #[error("template {name} not found")]
    TemplateNotFound { name: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
