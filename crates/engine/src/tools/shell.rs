//! `shell__execute`: run a command line in the session workspace, gated by
//! the allowlist and, when needed, a human approval.
//!
//! Two-phase resumable FSM:
//! - `initial` — allowlist check; approved commands run immediately,
//!   unapproved ones fail under `unattended` or emit an approval request
//!   and suspend.
//! - `awaiting_approval` — re-invoked once the human resolves; APPROVE
//!   executes the original command, REJECT and MODIFY fail with the
//!   human's explanation as guidance.

use crate::context::ChildCtx;
use async_trait::async_trait;
use berth_core::{Approval, ApprovalChoice, Outcome};
use berth_tools::{Decision, Invocation, ToolHandler};
use berth_wire::Message;
use serde_json::json;
use tracing::{info, warn};

const PHASE_INITIAL: &str = "initial";
const PHASE_AWAITING: &str = "awaiting_approval";

/// Cap captured output fed back to the model.
const OUTPUT_LIMIT: usize = 8 * 1024;

pub struct ShellExecute;

#[async_trait]
impl ToolHandler<ChildCtx> for ShellExecute {
    async fn execute(&self, ctx: &ChildCtx, invocation: Invocation) -> Outcome {
        let phase = invocation
            .state
            .get("phase")
            .and_then(|v| v.as_str())
            .unwrap_or(PHASE_INITIAL);
        match phase {
            PHASE_INITIAL => self.initial(ctx, invocation).await,
            PHASE_AWAITING => self.awaiting(ctx, invocation).await,
            other => Outcome::failure(format!("shell__execute in unknown phase {other:?}")),
        }
    }
}

impl ShellExecute {
    async fn initial(&self, ctx: &ChildCtx, invocation: Invocation) -> Outcome {
        let command = match invocation.str_arg("command") {
            Ok(command) => command,
            Err(e) => return Outcome::failure(e),
        };

        let session = match ctx.session() {
            Ok(session) => session,
            Err(e) => return Outcome::failure(e),
        };
        let allowlist = ctx.effective_allowlist(&session, "shell__execute");

        match allowlist.check(&command) {
            Decision::Approved => run_command(ctx, &command).await,
            decision => {
                let reason = match &decision {
                    Decision::Denied { rule } => format!("denied by allowlist rule {rule:?}"),
                    _ => "not covered by the allowlist".to_string(),
                };
                if ctx.unattended {
                    let mut error =
                        format!("command {command:?} requires approval ({reason}) and the daemon is unattended");
                    if ctx.has_session_allowlist(&session, "shell__execute") {
                        error.push_str(&format!(
                            "; session allowlist permits: {}",
                            allowlist.approved_patterns().join(", ")
                        ));
                    }
                    return Outcome::failure(error);
                }
                self.request_approval(ctx, &invocation, command).await
            }
        }
    }

    /// Persist a pending approval, forward it to the host, pause the
    /// session, and suspend. The resolution arrives as external data.
    async fn request_approval(
        &self,
        ctx: &ChildCtx,
        invocation: &Invocation,
        command: String,
    ) -> Outcome {
        let approval = Approval::pending(
            ctx.next_request_id(),
            ctx.session_id,
            invocation.context.tool_call_id.clone(),
            "command",
            command.clone(),
            ctx.now_ms(),
        );

        {
            let mut approvals = ctx.approvals.lock();
            approvals.set(&approval.id.to_string(), approval.clone());
            if let Err(e) = approvals.save() {
                return Outcome::failure(format!("failed to persist approval: {e}"));
            }
        }

        ctx.pause_session();
        if let Err(e) = ctx
            .link
            .notify(Message::ApprovalRequest { session_id: ctx.session_id, approval })
            .await
        {
            warn!(error = %e, "approval request did not reach the host");
        }
        info!(session = ctx.session_id, %command, "suspended awaiting approval");
        Outcome::running(json!({"phase": PHASE_AWAITING, "command": command}))
    }

    async fn awaiting(&self, ctx: &ChildCtx, invocation: Invocation) -> Outcome {
        let Some(external) = invocation.external.as_ref() else {
            // Spurious re-invocation: stay suspended, state unchanged.
            return Outcome::Running { state: invocation.state.clone() };
        };
        if !external.approval_received {
            return Outcome::Running { state: invocation.state.clone() };
        }

        let command = invocation
            .state
            .get("command")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        match external.choice {
            Some(ApprovalChoice::Approve) => run_command(ctx, &command).await,
            _ => {
                let guidance = external
                    .explanation
                    .as_deref()
                    .unwrap_or("no explanation given");
                Outcome::failure(format!("command {command:?} rejected by human: {guidance}"))
            }
        }
    }
}

/// Run the command line under `sh -c` in the workspace and capture output.
async fn run_command(ctx: &ChildCtx, command: &str) -> Outcome {
    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(&ctx.workspace)
        .output()
        .await;

    let output = match output {
        Ok(output) => output,
        Err(e) => return Outcome::failure(format!("failed to spawn {command:?}: {e}")),
    };

    let stdout = snippet(&output.stdout);
    let stderr = snippet(&output.stderr);
    let code = output.status.code();

    if output.status.success() {
        Outcome::success(json!({"stdout": stdout, "stderr": stderr, "exit_code": code}))
    } else {
        Outcome::failure(format!(
            "command exited with {}: {}",
            code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
            if stderr.is_empty() { stdout } else { stderr },
        ))
    }
}

fn snippet(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= OUTPUT_LIMIT {
        return text.into_owned();
    }
    let mut end = OUTPUT_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n[truncated]", &text[..end])
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
