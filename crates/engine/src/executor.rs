//! Resumable tool execution.
//!
//! Each tool call is tracked in a process-resident [`ToolCallState`]. A
//! `Running` outcome parks the tool's private state; the next invocation of
//! the same call id receives that exact state plus any external data a
//! human injected in the meantime. Terminal outcomes drop the entry.

use crate::context::ChildCtx;
use berth_core::{ExternalData, Outcome, ToolCall, ToolCallState, ToolCallStatus, ToolContext};
use berth_tools::{Invocation, Registry};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Default)]
pub struct ToolExecutor {
    states: Mutex<HashMap<String, ToolCallState>>,
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject approval/answer data for a suspended call.
    pub fn inject_external(&self, tool_call_id: &str, external: ExternalData) {
        let mut states = self.states.lock();
        match states.get_mut(tool_call_id) {
            Some(state) => state.external = Some(external),
            None => {
                // The call may not have run yet (e.g. recovery races); park
                // the data under an idle state so the first invocation sees it.
                warn!(tool_call_id, "external data for untracked call, parking");
                let mut state = ToolCallState::idle(ToolContext {
                    session_id: 0,
                    tool_call_id: tool_call_id.to_string(),
                });
                state.external = Some(external);
                states.insert(tool_call_id.to_string(), state);
            }
        }
    }

    pub fn state_of(&self, tool_call_id: &str) -> Option<ToolCallState> {
        self.states.lock().get(tool_call_id).cloned()
    }

    /// Drop entries for calls that no longer need tracking (answered
    /// externally, or belonging to finished turns).
    pub fn forget(&self, tool_call_id: &str) {
        self.states.lock().remove(tool_call_id);
    }

    /// Execute one tool call in the child.
    ///
    /// Host-routed tools (metadata, or a per-session `exec_on:
    /// host_danger` upgrade) round-trip over the link; everything else
    /// runs the local handler through the resumable state machine.
    pub async fn execute(
        &self,
        ctx: &ChildCtx,
        registry: &Registry<ChildCtx>,
        call: &ToolCall,
    ) -> Outcome {
        let name = call.function.name.as_str();
        let Some(def) = registry.get(name) else {
            return Outcome::failure(format!("unknown tool {name}"));
        };
        if def.meta.human_only {
            return Outcome::failure(format!("tool {name} is not available to the model"));
        }

        let host_upgrade = ctx
            .session()
            .ok()
            .and_then(|s| {
                s.tool_selector(name)
                    .and_then(|sel| sel.option_str("exec_on").map(str::to_string))
            })
            .is_some_and(|v| v == "host_danger");

        if def.meta.requires_host_execution || host_upgrade {
            debug!(tool = name, call = %call.id, "routing tool call to host");
            return ctx.link.call_host_tool(ctx.session_id, call.clone()).await;
        }

        let args = match call.parsed_arguments() {
            Ok(args) => args,
            Err(e) => return Outcome::failure(format!("malformed tool arguments: {e}")),
        };

        let Some(handler) = registry.handler(name) else {
            return Outcome::failure(format!("no local handler for tool {name}"));
        };

        // Pick up parked state and consume any injected external data.
        let (state, external) = {
            let mut states = self.states.lock();
            match states.get_mut(&call.id) {
                Some(tracked) => {
                    tracked.status = ToolCallStatus::Running;
                    (tracked.state.clone(), tracked.external.take())
                }
                None => (serde_json::Value::Null, None),
            }
        };

        let context = ToolContext { session_id: ctx.session_id, tool_call_id: call.id.clone() };
        let invocation = Invocation { args, state, external, context: context.clone() };
        let outcome = handler.execute(ctx, invocation).await;

        let mut states = self.states.lock();
        match &outcome {
            Outcome::Running { state } => {
                let entry = states
                    .entry(call.id.clone())
                    .or_insert_with(|| ToolCallState::idle(context));
                entry.status = ToolCallStatus::Running;
                entry.state = state.clone();
            }
            Outcome::Success { .. } | Outcome::Failure { .. } => {
                states.remove(&call.id);
            }
        }
        outcome
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
