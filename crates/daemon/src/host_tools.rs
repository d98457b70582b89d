//! Host tool handlers: session management verbs, approval/question
//! resolution, groups, templates, and the host-executed filesystem tool.

use crate::approvals;
use crate::bridge::{self, HostRegistry};
use crate::ctx::HostCtx;
use crate::supervisor;
use async_trait::async_trait;
use berth_core::{ApprovalChoice, Outcome, Session, SessionAction};
use berth_tools::{catalog, Invocation, Registry, ToolHandler};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

/// Build the host registry: the full catalog with handlers for every tool
/// the host executes.
pub fn host_registry() -> HostRegistry {
    let mut registry = Registry::new();
    for def in catalog::builtin_defs() {
        let handler: Option<Arc<dyn ToolHandler<Arc<HostCtx>>>> = match def.name.as_str() {
            "session__new" => Some(Arc::new(SessionNew)),
            "session__list" => Some(Arc::new(SessionList)),
            "session__pause" => Some(Arc::new(Lifecycle { action: SessionAction::Pause })),
            "session__resume" => Some(Arc::new(Lifecycle { action: SessionAction::Resume })),
            "session__stop" => Some(Arc::new(Lifecycle { action: SessionAction::Stop })),
            "session__run" => Some(Arc::new(Lifecycle { action: SessionAction::Run })),
            "session__retry" => Some(Arc::new(Lifecycle { action: SessionAction::Retry })),
            "session__delete" => Some(Arc::new(SessionDelete)),
            "approval__resolve" => Some(Arc::new(ApprovalResolve)),
            "question__answer" => Some(Arc::new(QuestionAnswer)),
            "group__add" => Some(Arc::new(GroupAdd)),
            "group__remove" => Some(Arc::new(GroupRemove)),
            "group__list" => Some(Arc::new(GroupList)),
            "group__send" => Some(Arc::new(GroupSend)),
            "template__list" => Some(Arc::new(TemplateList)),
            "fs__directory__list" => Some(Arc::new(FsDirectoryList)),
            // Only reachable through a per-session `exec_on: host_danger`
            // upgrade; the session opted into host execution explicitly.
            "shell__execute" => Some(Arc::new(HostShellExecute)),
            _ => None,
        };
        registry.register(def, handler);
    }
    registry
}

/// `session` argument, accepting integer (aliases) or string (positional).
fn session_arg(args: &Value) -> Result<u64, String> {
    match args.get("session") {
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| "invalid session id".to_string()),
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| format!("invalid session id {s:?}")),
        _ => Err("missing required argument \"session\"".to_string()),
    }
}

fn u64_arg(args: &Value, key: &str) -> Result<u64, String> {
    match args.get(key) {
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| format!("invalid {key}")),
        Some(Value::String(s)) => s.parse().map_err(|_| format!("invalid {key} {s:?}")),
        _ => Err(format!("missing required argument {key:?}")),
    }
}

fn summary(session: &Session) -> Value {
    json!({
        "id": session.id,
        "name": session.name,
        "status": session.status,
        "model": session.model.to_string(),
        "container": session.container_id,
        "messages": session.messages.len(),
    })
}

struct SessionNew;

#[async_trait]
impl ToolHandler<Arc<HostCtx>> for SessionNew {
    async fn execute(&self, ctx: &Arc<HostCtx>, invocation: Invocation) -> Outcome {
        let template_name = match invocation.str_arg("template") {
            Ok(name) => name,
            Err(e) => return Outcome::failure(e),
        };

        let session = {
            let mut db = ctx.db.lock();
            let template = match db.template(&template_name) {
                Ok(template) => template,
                Err(e) => return Outcome::failure(e.to_string()),
            };
            let id = db.sessions.generate_id();
            let name = invocation
                .args
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{template_name}-{id}"));
            let session = Session::from_template(id, name, &template, ctx.now_ms());
            if let Err(e) = db.sessions.create(session.clone()) {
                return Outcome::failure(e.to_string());
            }
            session
        };

        if let Err(e) = supervisor::spawn_session(ctx, session.id).await {
            return Outcome::failure(format!("session {} created but not spawned: {e}", session.id));
        }
        Outcome::success(summary(&session))
    }
}

struct SessionList;

#[async_trait]
impl ToolHandler<Arc<HostCtx>> for SessionList {
    async fn execute(&self, ctx: &Arc<HostCtx>, _invocation: Invocation) -> Outcome {
        match ctx.db.lock().sessions.list(false) {
            Ok(sessions) => {
                Outcome::success(Value::Array(sessions.iter().map(summary).collect()))
            }
            Err(e) => Outcome::failure(e.to_string()),
        }
    }
}

/// External lifecycle verbs. The transition is the contract; signals and
/// respawns are follow-through.
struct Lifecycle {
    action: SessionAction,
}

#[async_trait]
impl ToolHandler<Arc<HostCtx>> for Lifecycle {
    async fn execute(&self, ctx: &Arc<HostCtx>, invocation: Invocation) -> Outcome {
        let id = match session_arg(&invocation.args) {
            Ok(id) => id,
            Err(e) => return Outcome::failure(e),
        };
        let session = match ctx.transition(id, self.action) {
            Ok(session) => session,
            Err(e) => return Outcome::failure(e.to_string()),
        };

        match self.action {
            SessionAction::Pause => supervisor::signal_child(ctx, id, supervisor::Coercion::Pause),
            SessionAction::Stop => supervisor::signal_child(ctx, id, supervisor::Coercion::Stop),
            SessionAction::Run | SessionAction::Retry => {
                if let Err(e) = supervisor::ensure_child(ctx, id).await {
                    warn!(session = id, error = %e, "child not ensured after transition");
                }
            }
            _ => {}
        }
        Outcome::success(summary(&session))
    }
}

struct SessionDelete;

#[async_trait]
impl ToolHandler<Arc<HostCtx>> for SessionDelete {
    async fn execute(&self, ctx: &Arc<HostCtx>, invocation: Invocation) -> Outcome {
        let id = match session_arg(&invocation.args) {
            Ok(id) => id,
            Err(e) => return Outcome::failure(e),
        };
        // Stop a live session first; already-terminal is fine.
        if ctx.transition(id, SessionAction::Stop).is_ok() {
            supervisor::signal_child(ctx, id, supervisor::Coercion::Stop);
        }
        let now = ctx.now_ms();
        match ctx.db.lock().sessions.soft_delete(id, now) {
            Ok(()) => Outcome::success(json!({"id": id, "deleted": true})),
            Err(e) => Outcome::failure(e.to_string()),
        }
    }
}

struct ApprovalResolve;

#[async_trait]
impl ToolHandler<Arc<HostCtx>> for ApprovalResolve {
    async fn execute(&self, ctx: &Arc<HostCtx>, invocation: Invocation) -> Outcome {
        let id = match u64_arg(&invocation.args, "id") {
            Ok(id) => id,
            Err(e) => return Outcome::failure(e),
        };
        let choice: ApprovalChoice = match invocation
            .str_arg("choice")
            .and_then(|c| c.parse().map_err(|e: String| e))
        {
            Ok(choice) => choice,
            Err(e) => return Outcome::failure(e),
        };
        let explanation = invocation
            .args
            .get("explanation")
            .and_then(Value::as_str)
            .map(str::to_string);

        match approvals::resolve_approval(ctx, id, choice, explanation).await {
            Ok(data) => Outcome::success(data),
            Err(e) => Outcome::failure(e),
        }
    }
}

struct QuestionAnswer;

#[async_trait]
impl ToolHandler<Arc<HostCtx>> for QuestionAnswer {
    async fn execute(&self, ctx: &Arc<HostCtx>, invocation: Invocation) -> Outcome {
        let id = match u64_arg(&invocation.args, "id") {
            Ok(id) => id,
            Err(e) => return Outcome::failure(e),
        };
        let answer = match invocation.str_arg("answer") {
            Ok(answer) => answer,
            Err(e) => return Outcome::failure(e),
        };
        match approvals::answer_question(ctx, id, answer).await {
            Ok(data) => Outcome::success(data),
            Err(e) => Outcome::failure(e),
        }
    }
}

struct GroupAdd;

#[async_trait]
impl ToolHandler<Arc<HostCtx>> for GroupAdd {
    async fn execute(&self, ctx: &Arc<HostCtx>, invocation: Invocation) -> Outcome {
        let group = match invocation.str_arg("group") {
            Ok(group) => group,
            Err(e) => return Outcome::failure(e),
        };
        let session = match session_arg(&invocation.args) {
            Ok(session) => session,
            Err(e) => return Outcome::failure(e),
        };
        match ctx.db.lock().add_to_group(&group, session) {
            Ok(()) => Outcome::success(json!({"group": group, "session": session})),
            Err(e) => Outcome::failure(e.to_string()),
        }
    }
}

struct GroupRemove;

#[async_trait]
impl ToolHandler<Arc<HostCtx>> for GroupRemove {
    async fn execute(&self, ctx: &Arc<HostCtx>, invocation: Invocation) -> Outcome {
        let group = match invocation.str_arg("group") {
            Ok(group) => group,
            Err(e) => return Outcome::failure(e),
        };
        let session = match session_arg(&invocation.args) {
            Ok(session) => session,
            Err(e) => return Outcome::failure(e),
        };
        match ctx.db.lock().remove_from_group(&group, session) {
            Ok(()) => Outcome::success(json!({"group": group, "session": session})),
            Err(e) => Outcome::failure(e.to_string()),
        }
    }
}

struct GroupList;

#[async_trait]
impl ToolHandler<Arc<HostCtx>> for GroupList {
    async fn execute(&self, ctx: &Arc<HostCtx>, _invocation: Invocation) -> Outcome {
        match ctx.db.lock().groups.get_all() {
            Ok(groups) => Outcome::success(Value::Array(
                groups
                    .into_iter()
                    .map(|(name, group)| json!({"name": name, "sessions": group.sessions}))
                    .collect(),
            )),
            Err(e) => Outcome::failure(e.to_string()),
        }
    }
}

/// Fan a user message out to every member of a group.
struct GroupSend;

#[async_trait]
impl ToolHandler<Arc<HostCtx>> for GroupSend {
    async fn execute(&self, ctx: &Arc<HostCtx>, invocation: Invocation) -> Outcome {
        let group = match invocation.str_arg("group") {
            Ok(group) => group,
            Err(e) => return Outcome::failure(e),
        };
        let text = match invocation.str_arg("text") {
            Ok(text) => text,
            Err(e) => return Outcome::failure(e),
        };
        let members = match ctx.db.lock().groups.get(&group) {
            Ok(Some(g)) => g.sessions,
            Ok(None) => return Outcome::failure(format!("group {group} not found")),
            Err(e) => return Outcome::failure(e.to_string()),
        };

        let mut delivered = Vec::new();
        let mut failed = Vec::new();
        for member in members {
            let command = format!("send {member} {text}");
            match bridge::command_fire_and_forget(ctx, member, &command).await {
                Ok(()) => delivered.push(member),
                Err(e) => {
                    warn!(session = member, error = %e, "group send undeliverable");
                    failed.push(member);
                }
            }
        }
        Outcome::success(json!({"group": group, "delivered": delivered, "failed": failed}))
    }
}

struct TemplateList;

#[async_trait]
impl ToolHandler<Arc<HostCtx>> for TemplateList {
    async fn execute(&self, ctx: &Arc<HostCtx>, _invocation: Invocation) -> Outcome {
        match ctx.db.lock().templates() {
            Ok(templates) => Outcome::success(Value::Array(
                templates
                    .into_iter()
                    .map(|t| {
                        json!({
                            "name": t.name,
                            "description": t.description,
                            "model": t.model.to_string(),
                            "tools": t.tools.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
                        })
                    })
                    .collect(),
            )),
            Err(e) => Outcome::failure(e.to_string()),
        }
    }
}

/// Host-executed directory listing, offered to the LLM.
struct FsDirectoryList;

#[async_trait]
impl ToolHandler<Arc<HostCtx>> for FsDirectoryList {
    async fn execute(&self, _ctx: &Arc<HostCtx>, invocation: Invocation) -> Outcome {
        let path = match invocation.str_arg("path") {
            Ok(path) => path,
            Err(e) => return Outcome::failure(e),
        };
        let entries = match std::fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(e) => return Outcome::failure(format!("cannot list {path}: {e}")),
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        Outcome::success(json!(names))
    }
}

/// `shell__execute` upgraded to the host by `exec_on: host_danger`.
/// Runs in the session's workspace directory, on the host, unguarded —
/// the session's template opted in by name.
struct HostShellExecute;

#[async_trait]
impl ToolHandler<Arc<HostCtx>> for HostShellExecute {
    async fn execute(&self, ctx: &Arc<HostCtx>, invocation: Invocation) -> Outcome {
        let command = match invocation.str_arg("command") {
            Ok(command) => command,
            Err(e) => return Outcome::failure(e),
        };
        let workspace = ctx.layout().workspace_dir(invocation.context.session_id);

        let output = match tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&workspace)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => return Outcome::failure(format!("failed to spawn {command:?}: {e}")),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.status.success() {
            Outcome::success(json!({
                "stdout": stdout,
                "stderr": stderr,
                "exit_code": output.status.code(),
            }))
        } else {
            Outcome::failure(format!(
                "command exited with {:?}: {}",
                output.status.code(),
                if stderr.is_empty() { stdout } else { stderr },
            ))
        }
    }
}

#[cfg(test)]
#[path = "host_tools_tests.rs"]
mod tests;
