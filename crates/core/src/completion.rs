//! Provider request/response contract.
//!
//! Concrete provider adapters live outside this workspace; the daemon only
//! depends on this shape. The child never talks to a provider directly — it
//! ships a [`CompletionRequest`] to the host over the bridge and gets a
//! [`CompletionResponse`] back.

use crate::message::{ChatMessage, ToolCall};
use serde::{Deserialize, Serialize};

/// `finish_reason` value signalling that the model wants tools executed.
pub const FINISH_TOOL_CALLS: &str = "tool_calls";

/// A tool definition as offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema of the parameters object.
    pub parameters: serde_json::Value,
}

/// What the child asks the host to complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// `<provider>:<model>` reference, resolved on the host.
    pub model: String,
    #[serde(default)]
    pub system: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,
}

/// Approximate token bookkeeping, as reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// The message half of one provider choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

/// One choice from a provider response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// A provider completion response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Merge all choices of a response into a single assistant message.
///
/// Content and tool-call lists concatenate in choice order. The merged
/// finish reason is `tool_calls` if any choice finished that way, otherwise
/// the last choice's reason.
pub fn merge_choices(choices: &[Choice], timestamp: u64) -> (ChatMessage, Option<String>) {
    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for choice in choices {
        content.push_str(&choice.message.content);
        tool_calls.extend(choice.message.tool_calls.iter().cloned());
    }

    let finish_reason = if choices
        .iter()
        .any(|c| c.finish_reason.as_deref() == Some(FINISH_TOOL_CALLS))
    {
        Some(FINISH_TOOL_CALLS.to_string())
    } else {
        choices.last().and_then(|c| c.finish_reason.clone())
    };

    (ChatMessage::assistant(content, tool_calls, timestamp), finish_reason)
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;
