use serde::{Deserialize, Serialize};

/// Request from CLI to daemon over the control socket.
///
/// Each CLI invocation opens the socket, writes one request, waits for the
/// matching response, and disconnects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Health check.
    Ping,

    /// Daemon status summary.
    Status,

    /// A command string to resolve against the tool registry.
    Command {
        #[serde(rename = "requestId")]
        request_id: String,
        command: String,
        /// Target session; `None` falls back to the configured current
        /// session, 0 forces host execution.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<u64>,
        #[serde(rename = "waitForResponse", default)]
        wait_for_response: bool,
    },

    /// Graceful daemon shutdown.
    Shutdown,
}

impl Request {
    /// Allocate a CLI request id.
    pub fn new_request_id() -> String {
        format!("req_{}", nanoid::nanoid!(10))
    }
}
