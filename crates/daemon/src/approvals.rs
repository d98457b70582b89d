//! Host side of the approval/question pipeline.
//!
//! Children forward their pending human-input requests here; the host
//! re-persists them under its own monotonic ids (the canonical records the
//! CLI lists and resolves) and raises a best-effort desktop notification.
//! Resolutions travel back over the bridge; the child injects the external
//! data and resumes its session.

use crate::bridge;
use crate::ctx::HostCtx;
use berth_core::{
    Approval, ApprovalChoice, ChatMessage, Question, SessionStatus,
};
use berth_wire::Message;
use std::sync::Arc;
use tracing::{info, warn};

/// Persist a child's approval request under a host id. Returns the id the
/// human will reference.
pub fn record_approval(ctx: &HostCtx, session_id: u64, mut approval: Approval) -> u64 {
    let id = ctx.next_approval_id();
    approval.id = id;
    approval.session_id = session_id;

    let mut db = ctx.db.lock();
    db.approvals.set(&id.to_string(), approval.clone());
    if let Err(e) = db.approvals.save() {
        warn!(approval = id, error = %e, "approval record not persisted");
    }
    drop(db);

    desktop_notify(
        &format!("berth: session {session_id} wants to run a command"),
        &approval.description,
    );
    id
}

/// Persist a child's question under a host id.
pub fn record_question(ctx: &HostCtx, session_id: u64, mut question: Question) -> u64 {
    let id = ctx.next_question_id();
    question.id = id;
    question.session_id = session_id;

    let mut db = ctx.db.lock();
    db.questions.set(&id.to_string(), question.clone());
    if let Err(e) = db.questions.save() {
        warn!(question = id, error = %e, "question record not persisted");
    }
    drop(db);

    desktop_notify(
        &format!("berth: session {session_id} has a question"),
        &question.description,
    );
    id
}

/// Resolve an approval exactly once and forward the decision to the
/// owning child. The child injects the external data and resumes.
pub async fn resolve_approval(
    ctx: &Arc<HostCtx>,
    id: u64,
    choice: ApprovalChoice,
    explanation: Option<String>,
) -> Result<serde_json::Value, String> {
    let (session_id, tool_call_id) = {
        let mut db = ctx.db.lock();
        let mut approval = db
            .approvals
            .get(&id.to_string())
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("approval {id} not found"))?;
        approval
            .resolve(choice, explanation.clone(), ctx.now_ms())
            .map_err(|e| e.to_string())?;
        let keys = (approval.session_id, approval.tool_call_id.clone());
        db.approvals.set(&id.to_string(), approval);
        db.approvals.save().map_err(|e| e.to_string())?;
        keys
    };

    let message = Message::ApprovalResponse {
        session_id,
        tool_call_id: tool_call_id.clone(),
        choice,
        explanation,
    };
    bridge::send_to_container(ctx, session_id, &message)
        .await
        .map_err(|e| format!("approval recorded but child unreachable: {e}"))?;

    info!(approval = id, session = session_id, %choice, "approval resolved");
    Ok(serde_json::json!({"id": id, "session": session_id, "toolCall": tool_call_id, "choice": choice}))
}

/// Answer a question exactly once: persist, append the synthetic `tool`
/// message so the model observes the answer, and forward to the child.
pub async fn answer_question(
    ctx: &Arc<HostCtx>,
    id: u64,
    answer: String,
) -> Result<serde_json::Value, String> {
    let (session_id, tool_call_id) = {
        let mut db = ctx.db.lock();
        let mut question = db
            .questions
            .get(&id.to_string())
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("question {id} not found"))?;
        question
            .answer_with(answer.clone(), ctx.now_ms())
            .map_err(|e| e.to_string())?;
        let keys = (question.session_id, question.tool_call_id.clone());
        db.questions.set(&id.to_string(), question);
        db.questions.save().map_err(|e| e.to_string())?;
        keys
    };

    append_synthetic_answer(ctx, session_id, &tool_call_id, &answer);

    let message = Message::QuestionResponse {
        session_id,
        tool_call_id: tool_call_id.clone(),
        answer,
    };
    bridge::send_to_container(ctx, session_id, &message)
        .await
        .map_err(|e| format!("answer recorded but child unreachable: {e}"))?;

    info!(question = id, session = session_id, "question answered");
    Ok(serde_json::json!({"id": id, "session": session_id, "toolCall": tool_call_id}))
}

/// The one cross-process log append the host performs, and only while the
/// session is paused — the child is quiescent then, so the single-writer
/// discipline holds.
fn append_synthetic_answer(ctx: &HostCtx, session_id: u64, tool_call_id: &str, answer: &str) {
    let mut db = ctx.db.lock();
    let session = match db.sessions.get(session_id) {
        Ok(Some(session)) => session,
        Ok(None) => {
            warn!(session = session_id, "session missing, synthetic answer skipped");
            return;
        }
        Err(e) => {
            warn!(session = session_id, error = %e, "synthetic answer skipped");
            return;
        }
    };
    if session.status != SessionStatus::Paused {
        warn!(session = session_id, status = %session.status, "not paused, synthetic answer skipped");
        return;
    }
    let mut session = session;
    session.push_message(ChatMessage::tool(
        tool_call_id,
        "human__ask",
        answer,
        ctx.now_ms(),
    ));
    if let Err(e) = db.sessions.put(&session) {
        warn!(session = session_id, error = %e, "synthetic answer not persisted");
    }
}

/// Best-effort desktop notification; failures never affect the pipeline.
fn desktop_notify(summary: &str, body: &str) {
    let summary = summary.to_string();
    let body = body.to_string();
    std::thread::spawn(move || {
        if let Err(e) = notify_rust::Notification::new()
            .summary(&summary)
            .body(&body)
            .show()
        {
            tracing::debug!(error = %e, "desktop notification unavailable");
        }
    });
}

#[cfg(test)]
#[path = "approvals_tests.rs"]
mod tests;
