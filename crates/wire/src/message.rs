//! Host↔child message taxonomy.
//!
//! Every message carries a `type` tag; request/response pairs carry a
//! `messageId`. The id is a monotonic integer for child→host messages and
//! a `msg_<epochMs>_<rand>` string for host→child; both sides treat the
//! peer's ids as opaque correlation tokens.

use berth_core::{Approval, ApprovalChoice, CompletionRequest, Question, ToolCall};
use serde::{Deserialize, Serialize};

/// An opaque correlation token: integer (child→host) or string (host→child).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrelationId {
    Num(u64),
    Str(String),
}

impl From<u64> for CorrelationId {
    fn from(n: u64) -> Self {
        Self::Num(n)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Allocate a host→child message id: `msg_<epochMs>_<rand>`.
/// Collision-free within a session.
pub fn host_message_id(epoch_ms: u64) -> CorrelationId {
    CorrelationId::Str(format!("msg_{epoch_ms}_{}", nanoid::nanoid!(8)))
}

/// Allocate a child→host message id from the child's monotonic counter.
pub fn child_message_id(counter: u64) -> CorrelationId {
    CorrelationId::Num(counter)
}

/// Messages exchanged on a session's duplex channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// A tool call that must run on the peer (host execution).
    ToolCall {
        #[serde(rename = "messageId")]
        message_id: CorrelationId,
        #[serde(rename = "sessionId")]
        session_id: u64,
        #[serde(rename = "toolCall")]
        tool_call: ToolCall,
    },

    /// Child → host: a tool is waiting on a human approval.
    /// Fire-and-forget; the resolution arrives later as `ApprovalResponse`.
    ApprovalRequest {
        #[serde(rename = "sessionId")]
        session_id: u64,
        approval: Approval,
    },

    /// Host → child: the human resolved an approval.
    ApprovalResponse {
        #[serde(rename = "sessionId")]
        session_id: u64,
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        choice: ApprovalChoice,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },

    /// Child → host: a tool is waiting on a human answer.
    QuestionRequest {
        #[serde(rename = "sessionId")]
        session_id: u64,
        question: Question,
    },

    /// Host → child: the human answered a question.
    QuestionResponse {
        #[serde(rename = "sessionId")]
        session_id: u64,
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        answer: String,
    },

    /// Child → host: run a completion. Credentials never leave the host.
    AiPromptRequest {
        #[serde(rename = "messageId")]
        message_id: CorrelationId,
        #[serde(rename = "sessionId")]
        session_id: u64,
        request: CompletionRequest,
    },

    /// A parsed command to resolve against the tool registry.
    Command {
        #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
        message_id: Option<CorrelationId>,
        #[serde(rename = "sessionId", default)]
        session_id: u64,
        command: String,
        #[serde(rename = "waitForResponse", default)]
        wait_for_response: bool,
    },

    /// Answer to any request above, matched by `messageId`.
    CommandResponse {
        #[serde(rename = "messageId")]
        message_id: CorrelationId,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl Message {
    pub fn ok_response(message_id: CorrelationId, data: serde_json::Value) -> Self {
        Self::CommandResponse { message_id, success: true, data: Some(data), error: None }
    }

    pub fn err_response(message_id: CorrelationId, error: impl Into<String>) -> Self {
        Self::CommandResponse { message_id, success: false, data: None, error: Some(error.into()) }
    }

    /// The session this message belongs to, for routing. `CommandResponse`
    /// is routed by correlation instead.
    pub fn session_id(&self) -> Option<u64> {
        match self {
            Self::ToolCall { session_id, .. }
            | Self::ApprovalRequest { session_id, .. }
            | Self::ApprovalResponse { session_id, .. }
            | Self::QuestionRequest { session_id, .. }
            | Self::QuestionResponse { session_id, .. }
            | Self::AiPromptRequest { session_id, .. }
            | Self::Command { session_id, .. } => Some(*session_id),
            Self::CommandResponse { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
