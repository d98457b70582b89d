//! On-disk layout, relative to an installation root.
//!
//! ```text
//! agent/templates/<name>.yaml      read-only templates
//! db/
//!   sessions/<id>.yml              session records (pre-spawn residence)
//!   workspaces/<id>/               per-session workspace root
//!     db/sessions/<id>.yml         session record once seeded (shared with child)
//!     db/sockets/<id>.sock         per-session duplex socket
//!   groups/<name>.yml
//!   questions/<id>.yml
//!   approvals/<id>.yml
//!   control.sock                   CLI control socket
//!   daemon.lock                    single-daemon lock + pid
//! config.yml
//! .env
//! ```
//!
//! A child process receives its workspace directory as the installation
//! root, so the same layout resolves its seeded session file and socket.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbLayout {
    root: PathBuf,
}

impl DbLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db_dir(&self) -> PathBuf {
        self.root.join("db")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.db_dir().join("sessions")
    }

    pub fn approvals_dir(&self) -> PathBuf {
        self.db_dir().join("approvals")
    }

    pub fn questions_dir(&self) -> PathBuf {
        self.db_dir().join("questions")
    }

    pub fn groups_dir(&self) -> PathBuf {
        self.db_dir().join("groups")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("agent").join("templates")
    }

    pub fn workspaces_dir(&self) -> PathBuf {
        self.db_dir().join("workspaces")
    }

    pub fn workspace_dir(&self, session_id: u64) -> PathBuf {
        self.workspaces_dir().join(session_id.to_string())
    }

    /// Layout rooted at a session's workspace — what the child sees.
    pub fn workspace_layout(&self, session_id: u64) -> DbLayout {
        DbLayout::new(self.workspace_dir(session_id))
    }

    pub fn sockets_dir(&self) -> PathBuf {
        self.db_dir().join("sockets")
    }

    /// Per-session duplex socket, inside the session's workspace db.
    pub fn session_socket_path(&self, session_id: u64) -> PathBuf {
        self.workspace_layout(session_id)
            .sockets_dir()
            .join(format!("{session_id}.sock"))
    }

    pub fn control_socket_path(&self) -> PathBuf {
        self.db_dir().join("control.sock")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.db_dir().join("daemon.lock")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.db_dir().join("logs")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.yml")
    }

    pub fn env_path(&self) -> PathBuf {
        self.root.join(".env")
    }
}
