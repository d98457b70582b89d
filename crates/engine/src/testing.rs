//! Test doubles and harness helpers for exercising the child runtime
//! without sockets or a daemon.

use crate::agent_loop::{AgentLoop, LoopConfig};
use crate::bridge::HostLink;
use crate::context::ChildCtx;
use crate::executor::ToolExecutor;
use crate::tools::child_registry;
use crate::EngineError;
use async_trait::async_trait;
use berth_core::{Choice, ChoiceMessage, CompletionRequest, CompletionResponse, Outcome, Session, ToolCall};
use berth_store::{Collection, DbLayout, SessionStore};
use berth_tools::{Allowlist, Registry};
use berth_wire::Message;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

/// Scripted stand-in for the host side of the bridge.
#[derive(Default)]
pub struct FakeHostLink {
    completions: Mutex<VecDeque<Result<CompletionResponse, String>>>,
    host_tools: Mutex<VecDeque<Outcome>>,
    sent: Mutex<Vec<Message>>,
}

impl FakeHostLink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_completion(&self, response: CompletionResponse) {
        self.completions.lock().push_back(Ok(response));
    }

    pub fn push_completion_error(&self, error: impl Into<String>) {
        self.completions.lock().push_back(Err(error.into()));
    }

    pub fn push_host_tool(&self, outcome: Outcome) {
        self.host_tools.lock().push_back(outcome);
    }

    /// Everything sent through `notify` (approval/question requests,
    /// command replies).
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl HostLink for FakeHostLink {
    async fn complete(
        &self,
        _session_id: u64,
        _request: CompletionRequest,
    ) -> Result<CompletionResponse, EngineError> {
        match self.completions.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(error)) => Err(EngineError::Provider(error)),
            None => Err(EngineError::Provider("no scripted completion".to_string())),
        }
    }

    async fn call_host_tool(&self, _session_id: u64, _call: ToolCall) -> Outcome {
        self.host_tools
            .lock()
            .pop_front()
            .unwrap_or_else(|| Outcome::failure("no scripted host tool outcome"))
    }

    async fn notify(&self, message: Message) -> Result<(), EngineError> {
        self.sent.lock().push(message);
        Ok(())
    }
}

/// A ready-to-tick child runtime over a workspace directory.
pub struct Harness {
    pub ctx: Arc<ChildCtx>,
    pub registry: Arc<Registry<ChildCtx>>,
    pub executor: Arc<ToolExecutor>,
    pub link: Arc<FakeHostLink>,
}

impl Harness {
    /// Seed `session` into `workspace` and wire a fake host around it.
    pub fn new(workspace: &Path, session: Session) -> Result<Self, EngineError> {
        Self::with_options(workspace, session, false, Allowlist::empty())
    }

    pub fn with_options(
        workspace: &Path,
        session: Session,
        unattended: bool,
        allowlist: Allowlist,
    ) -> Result<Self, EngineError> {
        let layout = DbLayout::new(workspace);
        let mut store = SessionStore::open(layout.clone())?;
        let session_id = session.id;
        store.create(session)?;

        let link = FakeHostLink::new();
        let host_link: Arc<dyn HostLink> = link.clone();
        let ctx = Arc::new(ChildCtx::new(
            session_id,
            workspace.to_path_buf(),
            unattended,
            Arc::new(allowlist),
            host_link,
            Arc::new(Mutex::new(store)),
            Arc::new(Mutex::new(Collection::new(layout.approvals_dir()))),
            Arc::new(Mutex::new(Collection::new(layout.questions_dir()))),
        ));

        Ok(Self {
            ctx,
            registry: Arc::new(child_registry()),
            executor: Arc::new(ToolExecutor::new()),
            link,
        })
    }

    pub fn agent_loop(&self) -> AgentLoop {
        AgentLoop::new(
            Arc::clone(&self.ctx),
            Arc::clone(&self.registry),
            Arc::clone(&self.executor),
            LoopConfig::default(),
        )
    }

    pub fn session(&self) -> Option<Session> {
        self.ctx.store.lock().get(self.ctx.session_id).ok().flatten()
    }
}

/// A one-choice text response.
pub fn text_response(content: &str, finish: &str) -> CompletionResponse {
    CompletionResponse {
        choices: vec![Choice {
            message: ChoiceMessage { content: content.to_string(), tool_calls: vec![] },
            finish_reason: Some(finish.to_string()),
        }],
        usage: None,
    }
}

/// A one-choice tool-call response.
pub fn tool_call_response(calls: Vec<ToolCall>) -> CompletionResponse {
    CompletionResponse {
        choices: vec![Choice {
            message: ChoiceMessage { content: String::new(), tool_calls: calls },
            finish_reason: Some(berth_core::FINISH_TOOL_CALLS.to_string()),
        }],
        usage: None,
    }
}
