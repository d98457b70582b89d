//! Persisted pending requests for human input tied to a specific tool call.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Status of an approval record. Transitions from `pending` to a terminal
/// status exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approve,
    Reject,
    Modify,
}

crate::simple_display! {
    ApprovalStatus {
        Pending => "pending",
        Approve => "approve",
        Reject => "reject",
        Modify => "modify",
    }
}

/// The human's decision, as delivered back to the child.
///
/// `Modify` carries no rewritten command; it is rejection with guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalChoice {
    Approve,
    Reject,
    Modify,
}

crate::simple_display! {
    ApprovalChoice {
        Approve => "APPROVE",
        Reject => "REJECT",
        Modify => "MODIFY",
    }
}

impl FromStr for ApprovalChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "APPROVE" => Ok(Self::Approve),
            "REJECT" => Ok(Self::Reject),
            "MODIFY" => Ok(Self::Modify),
            other => Err(format!("unknown approval choice {other:?}")),
        }
    }
}

impl From<ApprovalChoice> for ApprovalStatus {
    fn from(choice: ApprovalChoice) -> Self {
        match choice {
            ApprovalChoice::Approve => ApprovalStatus::Approve,
            ApprovalChoice::Reject => ApprovalStatus::Reject,
            ApprovalChoice::Modify => ApprovalStatus::Modify,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("record {id} was already resolved")]
pub struct AlreadyResolved {
    pub id: u64,
}

/// A pending command approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub id: u64,
    pub session_id: u64,
    pub tool_call_id: String,
    /// Type tag, e.g. `command`.
    pub kind: String,
    /// Human-facing description (typically the command line).
    pub description: String,
    pub status: ApprovalStatus,
    /// Free-form explanation entered by the human on resolve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<u64>,
}

impl Approval {
    pub fn pending(
        id: u64,
        session_id: u64,
        tool_call_id: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            session_id,
            tool_call_id: tool_call_id.into(),
            kind: kind.into(),
            description: description.into(),
            status: ApprovalStatus::Pending,
            response: None,
            created_at,
            resolved_at: None,
        }
    }

    /// Resolve exactly once; a second resolve is an error.
    pub fn resolve(
        &mut self,
        choice: ApprovalChoice,
        response: Option<String>,
        resolved_at: u64,
    ) -> Result<(), AlreadyResolved> {
        if self.status != ApprovalStatus::Pending {
            return Err(AlreadyResolved { id: self.id });
        }
        self.status = choice.into();
        self.response = response;
        self.resolved_at = Some(resolved_at);
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }
}

/// Status of a question record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    Pending,
    Answered,
}

crate::simple_display! {
    QuestionStatus {
        Pending => "pending",
        Answered => "answered",
    }
}

/// A pending question from the agent to the human.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u64,
    pub session_id: u64,
    pub tool_call_id: String,
    pub kind: String,
    pub description: String,
    pub status: QuestionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<u64>,
}

impl Question {
    pub fn pending(
        id: u64,
        session_id: u64,
        tool_call_id: impl Into<String>,
        description: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            session_id,
            tool_call_id: tool_call_id.into(),
            kind: "question".to_string(),
            description: description.into(),
            status: QuestionStatus::Pending,
            answer: None,
            created_at,
            answered_at: None,
        }
    }

    pub fn answer_with(
        &mut self,
        answer: impl Into<String>,
        answered_at: u64,
    ) -> Result<(), AlreadyResolved> {
        if self.status != QuestionStatus::Pending {
            return Err(AlreadyResolved { id: self.id });
        }
        self.status = QuestionStatus::Answered;
        self.answer = Some(answer.into());
        self.answered_at = Some(answered_at);
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == QuestionStatus::Pending
    }
}

#[cfg(test)]
#[path = "approval_tests.rs"]
mod tests;
