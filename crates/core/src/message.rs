//! Chat message and tool-call types shared by the session log, the socket
//! protocol, and the provider contract.

use serde::{Deserialize, Serialize};

/// Role of a message in the session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
    System,
}

crate::simple_display! {
    Role {
        User => "user",
        Assistant => "assistant",
        Tool => "tool",
        System => "system",
    }
}

/// The function half of a tool call. `arguments` is the raw JSON string the
/// provider produced; it is parsed lazily so malformed arguments surface as
/// a tool failure rather than a protocol error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn default_call_type() -> String {
    "function".to_string()
}

/// A structured invocation proposed by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: default_call_type(),
            function: FunctionCall { name: name.into(), arguments: arguments.into() },
        }
    }

    /// Parse the JSON arguments. An empty string parses as `{}`.
    pub fn parsed_arguments(&self) -> Result<serde_json::Value, serde_json::Error> {
        if self.function.arguments.trim().is_empty() {
            return Ok(serde_json::Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(&self.function.arguments)
    }
}

/// One entry in a session's message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Correlates a `tool` message with the assistant tool call it answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name on `tool` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp: u64,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, timestamp: u64) -> Self {
        Self::bare(Role::User, content, timestamp)
    }

    pub fn system(content: impl Into<String>, timestamp: u64) -> Self {
        Self::bare(Role::System, content, timestamp)
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>, timestamp: u64) -> Self {
        Self { tool_calls, ..Self::bare(Role::Assistant, content, timestamp) }
    }

    pub fn tool(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            ..Self::bare(Role::Tool, content, timestamp)
        }
    }

    fn bare(role: Role, content: impl Into<String>, timestamp: u64) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            name: None,
            tool_calls: Vec::new(),
            timestamp,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
