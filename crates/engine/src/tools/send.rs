//! `session__send`: append a user message to this session's log.
//!
//! Forwarded here from the CLI because the child is the single writer of
//! the message log; the next tick picks the message up.

use crate::context::ChildCtx;
use async_trait::async_trait;
use berth_core::{ChatMessage, Outcome};
use berth_tools::{Invocation, ToolHandler};
use serde_json::json;

pub struct SessionSend;

#[async_trait]
impl ToolHandler<ChildCtx> for SessionSend {
    async fn execute(&self, ctx: &ChildCtx, invocation: Invocation) -> Outcome {
        let text = match invocation.str_arg("text") {
            Ok(text) => text,
            Err(e) => return Outcome::failure(e),
        };

        let mut store = ctx.store.lock();
        let mut session = match store.get(ctx.session_id) {
            Ok(Some(session)) => session,
            Ok(None) => return Outcome::failure(format!("session {} not found", ctx.session_id)),
            Err(e) => return Outcome::failure(e.to_string()),
        };
        session.push_message(ChatMessage::user(text, ctx.now_ms()));
        if let Err(e) = store.put(&session) {
            return Outcome::failure(e.to_string());
        }
        Outcome::success(json!({"session": ctx.session_id, "messages": session.messages.len()}))
    }
}
