//! The per-session conversation driver.
//!
//! One loop per child process. Every ~2 s it reloads the session from the
//! shared store (the mtime refresh is the synchronization point with the
//! host), decides whether the trailing message calls for work, and either
//! requests a completion or resumes pending tool calls. Pause/stop arrive
//! as status changes on disk or as signals; both abort in-flight work
//! through a cancellation token.

use crate::bridge::HostLink;
use crate::context::ChildCtx;
use crate::executor::ToolExecutor;
use crate::prompt::render_system_prompt;
use crate::signals::SignalAction;
use crate::EngineError;
use berth_core::{
    merge_choices, ChatMessage, Clock, CompletionRequest, Outcome, Role, Session, SessionAction,
    SessionStatus, SystemClock, ToolCall, ToolSchema, Usage,
};
use berth_tools::Registry;
use berth_wire::Message;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Cap on serialized tool results appended to the log.
const TOOL_RESULT_LIMIT: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub tick_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { tick_interval: Duration::from_secs(2) }
    }
}

/// What one tick did, for the driver and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do (paused, idle log, or suppressed retry).
    Idle,
    /// Progress was made this tick.
    Acted,
    /// Terminal status reached; the loop exits.
    Finished,
}

pub struct AgentLoop {
    session_id: u64,
    ctx: Arc<ChildCtx>,
    registry: Arc<Registry<ChildCtx>>,
    executor: Arc<ToolExecutor>,
    config: LoopConfig,
    clock: SystemClock,
    /// Prompt attempts that failed, keyed by (session, log length) so a
    /// failing request is not retried until the conversation moves.
    failed_attempts: HashSet<(u64, usize)>,
    /// Replaced after each pause-triggered cancellation.
    abort: Arc<Mutex<CancellationToken>>,
}

impl AgentLoop {
    pub fn new(
        ctx: Arc<ChildCtx>,
        registry: Arc<Registry<ChildCtx>>,
        executor: Arc<ToolExecutor>,
        config: LoopConfig,
    ) -> Self {
        Self {
            session_id: ctx.session_id,
            ctx,
            registry,
            executor,
            config,
            clock: SystemClock,
            failed_attempts: HashSet::new(),
            abort: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    /// Startup: transition `start` and render the system prompt once, in
    /// this process's environment.
    pub fn startup(&self) -> Result<(), EngineError> {
        let now = self.clock.epoch_ms();
        let mut store = self.ctx.store.lock();
        let mut session = store
            .get(self.session_id)?
            .ok_or(EngineError::SessionMissing(self.session_id))?;

        if session.status == SessionStatus::Pending {
            let (updated, record) = store.transition(self.session_id, SessionAction::Start, now)?;
            info!(session = self.session_id, from = %record.from, to = %record.to, "session started");
            session = updated;
        }

        if !session.system_prompt_evaluated {
            session.system_prompt = render_system_prompt(&session.system_prompt);
            session.system_prompt_evaluated = true;
            store.put(&session)?;
            debug!(session = self.session_id, "system prompt rendered");
        }
        Ok(())
    }

    /// Drive the loop until the session reaches a terminal status.
    pub async fn run(
        mut self,
        mut inbox: mpsc::Receiver<Message>,
        signals: mpsc::Receiver<SignalAction>,
    ) -> Result<(), EngineError> {
        self.startup()?;
        self.spawn_signal_task(signals);

        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(message) = inbox.recv() => self.handle_message(message).await,
                _ = interval.tick() => {
                    self.refresh_abort_token();
                    if self.tick().await? == TickOutcome::Finished {
                        info!(session = self.session_id, "loop finished");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// One tick of the conversation.
    pub async fn tick(&mut self) -> Result<TickOutcome, EngineError> {
        let session = {
            let mut store = self.ctx.store.lock();
            let Some(session) = store.get(self.session_id)? else {
                warn!(session = self.session_id, "record disappeared, stopping loop");
                return Ok(TickOutcome::Finished);
            };
            match session.status {
                SessionStatus::Paused => return Ok(TickOutcome::Idle),
                SessionStatus::Stopped | SessionStatus::Success | SessionStatus::Error => {
                    return Ok(TickOutcome::Finished)
                }
                SessionStatus::Pending => {
                    let now = self.clock.epoch_ms();
                    let (updated, _) =
                        store.transition(self.session_id, SessionAction::Start, now)?;
                    updated
                }
                SessionStatus::Running => session,
            }
        };

        if !session.wants_tick() {
            return Ok(TickOutcome::Idle);
        }

        let pending: Vec<ToolCall> =
            session.pending_tool_calls().into_iter().cloned().collect();
        if pending.is_empty() {
            self.prompt_and_advance(session).await
        } else {
            // Resuming a previously appended assistant message: do not
            // re-append, just revisit its unanswered calls.
            self.run_tool_calls(&pending).await?;
            Ok(TickOutcome::Acted)
        }
    }

    async fn prompt_and_advance(&mut self, session: Session) -> Result<TickOutcome, EngineError> {
        let attempt_key = (self.session_id, session.messages.len());
        if self.failed_attempts.contains(&attempt_key) {
            debug!(session = self.session_id, "prompt retry suppressed until log moves");
            return Ok(TickOutcome::Idle);
        }

        let request = CompletionRequest {
            model: session.model.to_string(),
            system: session.system_prompt.clone(),
            messages: session.messages.clone(),
            tools: self.allowed_tools(&session),
        };

        let abort = self.abort.lock().clone();
        let response = tokio::select! {
            _ = abort.cancelled() => return Ok(TickOutcome::Idle),
            r = self.ctx.link.complete(self.session_id, request) => r,
        };

        let response = match response {
            Ok(response) => {
                self.failed_attempts.clear();
                response
            }
            Err(e) => {
                warn!(session = self.session_id, error = %e, "prompt request failed");
                self.failed_attempts.insert(attempt_key);
                return Ok(TickOutcome::Idle);
            }
        };

        let now = self.clock.epoch_ms();
        // finish_reason is scoped to this tick on purpose; it never leaks
        // into the next one.
        let (merged, finish_reason) = merge_choices(&response.choices, now);

        if merged.has_tool_calls() {
            let calls = merged.tool_calls.clone();
            self.append_message(merged, response.usage)?;
            self.run_tool_calls(&calls).await?;
            return Ok(TickOutcome::Acted);
        }

        self.append_message(merged, response.usage)?;
        match finish_reason.as_deref() {
            Some("stop") | Some("end_turn") => {
                let now = self.clock.epoch_ms();
                self.ctx
                    .store
                    .lock()
                    .transition(self.session_id, SessionAction::Complete, now)?;
                Ok(TickOutcome::Finished)
            }
            other => {
                debug!(session = self.session_id, finish = ?other, "turn left open");
                Ok(TickOutcome::Acted)
            }
        }
    }

    async fn run_tool_calls(&self, calls: &[ToolCall]) -> Result<(), EngineError> {
        for call in calls {
            let abort = self.abort.lock().clone();
            let outcome = tokio::select! {
                _ = abort.cancelled() => return Ok(()),
                outcome = self.executor.execute(&self.ctx, &self.registry, call) => outcome,
            };

            let content = match outcome {
                // Suspended: no tool message; a later tick revisits the
                // call once external data arrives.
                Outcome::Running { .. } => continue,
                Outcome::Success { result } => render_result(&result),
                Outcome::Failure { error } => error,
            };
            let now = self.clock.epoch_ms();
            let message = ChatMessage::tool(&call.id, &call.function.name, content, now);
            self.append_message(message, None)?;
        }
        Ok(())
    }

    /// Append to the log through a fresh reload: the host may have toggled
    /// status or added the synthetic answer message during the wait.
    fn append_message(&self, message: ChatMessage, usage: Option<Usage>) -> Result<(), EngineError> {
        let mut store = self.ctx.store.lock();
        let mut session = store
            .get(self.session_id)?
            .ok_or(EngineError::SessionMissing(self.session_id))?;

        if let Some(call_id) = message.tool_call_id.as_deref() {
            let already_answered = session
                .messages
                .iter()
                .any(|m| m.role == Role::Tool && m.tool_call_id.as_deref() == Some(call_id));
            if already_answered {
                debug!(call_id, "tool result already in the log, skipping append");
                return Ok(());
            }
        }

        session.push_message(message);
        if usage.is_some() {
            session.latest_usage = usage;
        }
        store.put(&session)?;
        Ok(())
    }

    /// The tool set offered to the model: the session's allowlist
    /// intersected with the catalog, human-only tools rejected.
    fn allowed_tools(&self, session: &Session) -> Vec<ToolSchema> {
        let mut out = Vec::new();
        for selector in &session.tools {
            let name = selector.name();
            let Some(def) = self.registry.get(name) else {
                warn!(tool = name, "session lists a tool missing from the catalog");
                continue;
            };
            if def.meta.human_only {
                continue;
            }
            out.push(def.schema());
        }
        out
    }

    /// Handle a message delivered by the bridge pump.
    pub async fn handle_message(&self, message: Message) {
        match message {
            Message::ApprovalResponse { tool_call_id, choice, explanation, .. } => {
                self.executor.inject_external(
                    &tool_call_id,
                    berth_core::ExternalData::approval(choice, explanation),
                );
                self.resume_session();
            }
            Message::QuestionResponse { tool_call_id, answer, .. } => {
                // When the host already appended the synthetic answer to
                // the log, the call will never be re-invoked: drop its
                // parked state. Otherwise inject the answer so the tool's
                // awaiting phase completes it on the next tick.
                if self.call_answered_in_log(&tool_call_id) {
                    self.executor.forget(&tool_call_id);
                } else {
                    self.executor
                        .inject_external(&tool_call_id, berth_core::ExternalData::answer(answer));
                }
                self.resume_session();
            }
            Message::Command { message_id, command, wait_for_response, .. } => {
                let result = self.run_local_command(&command).await;
                if wait_for_response {
                    if let Some(id) = message_id {
                        let reply = match result {
                            Ok(data) => Message::ok_response(id, data),
                            Err(error) => Message::err_response(id, error),
                        };
                        if let Err(e) = self.ctx.link.notify(reply).await {
                            warn!(error = %e, "command response did not reach the host");
                        }
                    }
                }
            }
            other => warn!(message = ?other, "unexpected message in child"),
        }
    }

    /// Resolve and execute a command forwarded to this session.
    async fn run_local_command(&self, command: &str) -> Result<serde_json::Value, String> {
        let resolved = self.registry.resolve(command).map_err(|e| e.to_string())?;
        let Some(handler) = resolved.handler else {
            return Err(format!("command not found: {command}"));
        };
        let context = berth_core::ToolContext {
            session_id: self.session_id,
            tool_call_id: format!("cmd_{}", self.ctx.next_request_id()),
        };
        let invocation = berth_tools::Invocation::first(resolved.args, context);
        match handler.execute(&self.ctx, invocation).await {
            Outcome::Success { result } => Ok(result),
            Outcome::Failure { error } => Err(error),
            Outcome::Running { .. } => Ok(serde_json::json!({"status": "RUNNING"})),
        }
    }

    /// Whether the log already holds a `tool` result for this call id.
    fn call_answered_in_log(&self, tool_call_id: &str) -> bool {
        self.ctx
            .store
            .lock()
            .get(self.session_id)
            .ok()
            .flatten()
            .is_some_and(|session| {
                session
                    .messages
                    .iter()
                    .any(|m| m.role == Role::Tool && m.tool_call_id.as_deref() == Some(tool_call_id))
            })
    }

    fn resume_session(&self) {
        let now = self.clock.epoch_ms();
        match self
            .ctx
            .store
            .lock()
            .transition(self.session_id, SessionAction::Resume, now)
        {
            Ok((_, record)) => {
                info!(session = self.session_id, from = %record.from, "session resumed")
            }
            Err(e) => debug!(session = self.session_id, error = %e, "resume skipped"),
        }
    }

    fn refresh_abort_token(&self) {
        let mut token = self.abort.lock();
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
    }

    fn spawn_signal_task(&self, mut signals: mpsc::Receiver<SignalAction>) {
        let store = Arc::clone(&self.ctx.store);
        let abort = Arc::clone(&self.abort);
        let session_id = self.session_id;
        let clock = self.clock.clone();
        tokio::spawn(async move {
            while let Some(action) = signals.recv().await {
                let (verb, lifecycle) = match action {
                    SignalAction::Pause => ("pause", SessionAction::Pause),
                    SignalAction::Stop => ("stop", SessionAction::Stop),
                };
                info!(session = session_id, signal = verb, "coercion signal received");
                let now = clock.epoch_ms();
                if let Err(e) = store.lock().transition(session_id, lifecycle, now) {
                    warn!(session = session_id, error = %e, "signal transition rejected");
                }
                abort.lock().cancel();
            }
        });
    }
}

/// Tool results become message content: strings verbatim, everything else
/// as JSON, truncated to a sane size.
fn render_result(result: &serde_json::Value) -> String {
    let text = match result {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.len() <= TOOL_RESULT_LIMIT {
        return text;
    }
    let mut end = TOOL_RESULT_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n[truncated]", &text[..end])
}

#[cfg(test)]
#[path = "agent_loop_tests.rs"]
mod tests;
