//! IPC protocol for the berth daemon.
//!
//! Wire format: UTF-8 JSON records terminated by `\n`, on both the
//! CLI↔host control socket and the per-session host↔child sockets.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod frame;
mod message;
mod pending;
mod request;
mod response;

pub use frame::{decode, encode, write_frame, FrameBuffer, FrameReader};
pub use message::{child_message_id, host_message_id, CorrelationId, Message};
pub use pending::{CommandReply, PendingMap, ROUND_TRIP_TIMEOUT};
pub use request::Request;
pub use response::Response;

/// Errors from framing, parsing, and correlation.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timed out waiting for response")]
    Timeout,

    #[error("no connection registered for session {0}")]
    NoConnection(u64),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod property_tests;
