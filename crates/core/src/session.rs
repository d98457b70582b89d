//! Session entity and its status machine.
//!
//! A session is a live instance of a template: a conversation plus its
//! lifecycle state and isolated workspace. The numeric id is the filename
//! stem, the socket stem, and the container name prefix.

use crate::completion::Usage;
use crate::fsm::Fsm;
use crate::message::{ChatMessage, Role};
use crate::model::ModelRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Session lifecycle status. Initial state is `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    Running,
    Paused,
    Stopped,
    Success,
    Error,
}

crate::simple_display! {
    SessionStatus {
        Pending => "PENDING",
        Running => "RUNNING",
        Paused => "PAUSED",
        Stopped => "STOPPED",
        Success => "SUCCESS",
        Error => "ERROR",
    }
}

impl SessionStatus {
    /// Terminal states are left alone by the recovery scan.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Success | Self::Error)
    }

    /// States in which a child process is expected to be alive.
    pub fn expects_child(self) -> bool {
        matches!(self, Self::Pending | Self::Running | Self::Paused)
    }
}

/// Named lifecycle actions. The table in [`status_fsm`] is the only
/// authority on which transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionAction {
    Start,
    Complete,
    Fail,
    Pause,
    Resume,
    Stop,
    Run,
    Retry,
}

crate::simple_display! {
    SessionAction {
        Start => "start",
        Complete => "complete",
        Fail => "fail",
        Pause => "pause",
        Resume => "resume",
        Stop => "stop",
        Run => "run",
        Retry => "retry",
    }
}

/// The session status transition table.
pub fn status_fsm() -> Fsm<SessionStatus, SessionAction> {
    use SessionAction as A;
    use SessionStatus as S;
    Fsm::new()
        .rule(A::Start, &[S::Pending], S::Running)
        .rule(A::Complete, &[S::Running], S::Success)
        .rule(A::Fail, &[S::Running], S::Error)
        .rule(A::Pause, &[S::Pending, S::Running], S::Paused)
        .rule(A::Resume, &[S::Paused], S::Pending)
        .rule(A::Stop, &[S::Pending, S::Running, S::Paused], S::Stopped)
        .rule(A::Run, &[S::Stopped], S::Running)
        .rule(A::Retry, &[S::Success, S::Error], S::Pending)
}

/// Record of the most recent status transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub action: SessionAction,
    pub from: SessionStatus,
    pub to: SessionStatus,
    /// Epoch milliseconds.
    pub at: u64,
}

/// One entry of a session's tool allowlist: a bare name, or a name carrying
/// a per-session option map.
///
/// ```yaml
/// tools:
///   - human__ask
///   - shell__execute:
///       exec_on: host_danger
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolSelector {
    Name(String),
    WithOptions(IndexMap<String, IndexMap<String, serde_json::Value>>),
}

impl ToolSelector {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::WithOptions(map) => map.keys().next().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn options(&self) -> Option<&IndexMap<String, serde_json::Value>> {
        match self {
            Self::Name(_) => None,
            Self::WithOptions(map) => map.values().next(),
        }
    }

    /// String-valued option, e.g. `exec_on`.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options()?.get(key)?.as_str()
    }
}

impl From<&str> for ToolSelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Container/child name for a session: `<id>_<unix-seconds>`.
pub fn make_container_id(id: u64, epoch_secs: u64) -> String {
    format!("{id}_{epoch_secs}")
}

/// A live instance of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: u64,
    pub name: String,
    pub container_id: String,
    /// Epoch milliseconds.
    pub created_at: u64,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition: Option<TransitionRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSelector>,
    pub model: ModelRef,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
    /// Soft-delete stamp; set sessions are excluded from default listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_usage: Option<Usage>,
    /// Append-only, except when a prior record is replaced in place.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub system_prompt: String,
    /// Set once the prompt template has been rendered in the child.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub system_prompt_evaluated: bool,
}

impl Session {
    /// Instantiate a session from a template.
    pub fn from_template(
        id: u64,
        name: impl Into<String>,
        template: &crate::template::Template,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            container_id: make_container_id(id, created_at_ms / 1000),
            created_at: created_at_ms,
            status: SessionStatus::Pending,
            last_transition: None,
            tools: template.tools.clone(),
            model: template.model.clone(),
            labels: template.labels.clone(),
            deleted_at: None,
            latest_usage: None,
            messages: Vec::new(),
            system_prompt: template.system_prompt.clone(),
            system_prompt_evaluated: false,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// The tool selector for `name`, if the session's allowlist carries it.
    pub fn tool_selector(&self, name: &str) -> Option<&ToolSelector> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Whether the last message requires the loop to act: a `user` or
    /// `tool` message, or an assistant message with unresolved tool calls.
    pub fn wants_tick(&self) -> bool {
        match self.last_message() {
            Some(m) => match m.role {
                Role::User | Role::Tool => true,
                Role::Assistant => m.has_tool_calls(),
                Role::System => false,
            },
            None => false,
        }
    }

    /// Tool calls on the trailing assistant message that have no matching
    /// `tool` result yet. This is the "resumable pending" set.
    pub fn pending_tool_calls(&self) -> Vec<&crate::message::ToolCall> {
        let Some(assistant) = self
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
        else {
            return Vec::new();
        };
        let answered: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assistant
            .tool_calls
            .iter()
            .filter(|c| !answered.contains(&c.id.as_str()))
            .collect()
    }
}

crate::builder! {
    pub struct SessionBuilder => Session {
        into {
            name: String = "test-session",
            system_prompt: String = "",
        }
        set {
            id: u64 = 1,
            created_at: u64 = 0,
            status: SessionStatus = SessionStatus::Pending,
            tools: Vec<ToolSelector> = Vec::new(),
            messages: Vec<ChatMessage> = Vec::new(),
            model: ModelRef = ModelRef::new("xai", "mock"),
            system_prompt_evaluated: bool = false,
        }
        option {
            last_transition: TransitionRecord = None,
            deleted_at: u64 = None,
            latest_usage: Usage = None,
        }
        computed {
            container_id: String = String::new(),
            labels: IndexMap<String, String> = IndexMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
