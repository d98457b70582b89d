// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! berth-engine: the per-session child process.
//!
//! One engine drives one session: it connects back to the host over the
//! session's socket, ticks the conversation every couple of seconds, fans
//! out tool calls through the resumable executor, and round-trips
//! completions and host-executed tools over the bridge. The host owns
//! credentials; the child owns the message log.

pub mod agent_loop;
pub mod bridge;
pub mod context;
pub mod executor;
pub mod prompt;
pub mod signals;
pub mod tools;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use agent_loop::{AgentLoop, LoopConfig, TickOutcome};
pub use bridge::{ChildBridge, HostLink};
pub use context::ChildCtx;
pub use executor::ToolExecutor;

/// Errors surfaced by the child runtime.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] berth_store::StoreError),

    #[error(transparent)]
    Protocol(#[from] berth_wire::ProtocolError),

    #[error("provider call failed: {0}")]
    Provider(String),

    #[error("host link failed: {0}")]
    Link(String),

    #[error("session {0} not found in workspace store")]
    SessionMissing(u64),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
