use serde::{Deserialize, Serialize};

/// Response from daemon to CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Health check response
    Pong,

    /// Generic success
    Ok,

    /// Daemon is shutting down
    ShuttingDown,

    /// Daemon status
    Status {
        uptime_secs: u64,
        sessions_active: usize,
        version: String,
    },

    /// Result of a `Command` request, matched by `requestId`.
    Command {
        #[serde(rename = "requestId")]
        request_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Error response
    Error { message: String },
}

impl Response {
    pub fn command_ok(request_id: impl Into<String>, data: serde_json::Value) -> Self {
        Self::Command { request_id: request_id.into(), success: true, data: Some(data), error: None }
    }

    pub fn command_err(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Command {
            request_id: request_id.into(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
