//! The three-valued tool result and the per-call resumable state.
//!
//! Every tool invocation ends in exactly one of three outcomes. `Running`
//! suspends the call across loop ticks: the tool's private `state` is kept
//! in a [`ToolCallState`] and handed back on the next invocation, together
//! with any [`ExternalData`] a human injected in the meantime.

use crate::approval::ApprovalChoice;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "UPPERCASE")]
pub enum Outcome {
    /// Terminal success; `result` is serialized into the tool message.
    Success { result: Value },
    /// Terminal failure; `error` is surfaced to the model as the tool output.
    Failure { error: String },
    /// Not done; re-invoke later with `state` plus any injected external data.
    Running { state: Value },
}

impl Outcome {
    pub fn success(result: impl Into<Value>) -> Self {
        Self::Success { result: result.into() }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure { error: error.into() }
    }

    pub fn running(state: impl Into<Value>) -> Self {
        Self::Running { state: state.into() }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_running()
    }
}

/// Coarse status of a tracked tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolCallStatus {
    Idle,
    Running,
    Success,
    Failure,
}

/// Identifies the session and call a tool invocation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolContext {
    pub session_id: u64,
    pub tool_call_id: String,
}

/// Data injected from outside the child process while a tool is suspended:
/// an approval resolution or a question answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalData {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub approval_received: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<ApprovalChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub answer_received: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl ExternalData {
    pub fn approval(choice: ApprovalChoice, explanation: Option<String>) -> Self {
        Self { approval_received: true, choice: Some(choice), explanation, ..Self::default() }
    }

    pub fn answer(answer: impl Into<String>) -> Self {
        Self { answer_received: true, answer: Some(answer.into()), ..Self::default() }
    }
}

/// Process-resident state of one tool call in the child. Never persisted;
/// the host never holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallState {
    pub status: ToolCallStatus,
    /// Tool-private phase state, exactly as the tool last returned it.
    pub state: Value,
    pub context: ToolContext,
    pub external: Option<ExternalData>,
}

impl ToolCallState {
    pub fn idle(context: ToolContext) -> Self {
        Self { status: ToolCallStatus::Idle, state: Value::Null, context, external: None }
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
