//! `human__ask`: ask the operator a question and suspend until answered.
//!
//! Phases `initial` / `awaiting_answer`, mirroring the approval flow. When
//! the answer lands, the host also appends the synthetic `tool` message to
//! the session log; the completion here covers the path where the call is
//! still unanswered in the log.

use crate::context::ChildCtx;
use async_trait::async_trait;
use berth_core::{Outcome, Question};
use berth_tools::{Invocation, ToolHandler};
use berth_wire::Message;
use serde_json::json;
use tracing::{info, warn};

const PHASE_INITIAL: &str = "initial";
const PHASE_AWAITING: &str = "awaiting_answer";

pub struct HumanAsk;

#[async_trait]
impl ToolHandler<ChildCtx> for HumanAsk {
    async fn execute(&self, ctx: &ChildCtx, invocation: Invocation) -> Outcome {
        let phase = invocation
            .state
            .get("phase")
            .and_then(|v| v.as_str())
            .unwrap_or(PHASE_INITIAL);
        match phase {
            PHASE_INITIAL => self.initial(ctx, invocation).await,
            PHASE_AWAITING => self.awaiting(invocation),
            other => Outcome::failure(format!("human__ask in unknown phase {other:?}")),
        }
    }
}

impl HumanAsk {
    async fn initial(&self, ctx: &ChildCtx, invocation: Invocation) -> Outcome {
        let text = match invocation.str_arg("question") {
            Ok(text) => text,
            Err(e) => return Outcome::failure(e),
        };

        let question = Question::pending(
            ctx.next_request_id(),
            ctx.session_id,
            invocation.context.tool_call_id.clone(),
            text.clone(),
            ctx.now_ms(),
        );

        {
            let mut questions = ctx.questions.lock();
            questions.set(&question.id.to_string(), question.clone());
            if let Err(e) = questions.save() {
                return Outcome::failure(format!("failed to persist question: {e}"));
            }
        }

        ctx.pause_session();
        if let Err(e) = ctx
            .link
            .notify(Message::QuestionRequest { session_id: ctx.session_id, question })
            .await
        {
            warn!(error = %e, "question request did not reach the host");
        }
        info!(session = ctx.session_id, question = %text, "suspended awaiting answer");
        Outcome::running(json!({"phase": PHASE_AWAITING, "question": text}))
    }

    fn awaiting(&self, invocation: Invocation) -> Outcome {
        match invocation.external {
            Some(external) if external.answer_received => {
                Outcome::success(json!(external.answer.unwrap_or_default()))
            }
            _ => Outcome::Running { state: invocation.state },
        }
    }
}
