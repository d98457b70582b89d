// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! berth-daemon: the long-lived host process.
//!
//! The daemon owns templates, provider credentials, the per-session
//! sockets, and the CLI control channel. It supervises one child process
//! per session, routes messages between CLI, host, and children, and runs
//! the human side of the approval/question pipeline.

pub mod approvals;
pub mod bridge;
pub mod config;
pub mod ctx;
pub mod event_bus;
pub mod host_tools;
pub mod lifecycle;
pub mod listener;
pub mod providers;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use config::Config;
pub use ctx::HostCtx;
pub use event_bus::{EventBus, SessionEvent};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Store(#[from] berth_store::StoreError),

    #[error(transparent)]
    Protocol(#[from] berth_wire::ProtocolError),

    #[error(transparent)]
    Provider(#[from] providers::ProviderError),

    #[error("another daemon holds the lock at {0}")]
    LockHeld(PathBuf),

    #[error("failed to bind {path}: {source}")]
    BindFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
