//! Builtin tool definitions.
//!
//! Definitions are data shared by host and child; each process attaches
//! handlers for the tools it executes. Session-management verbs are
//! human-only local commands with short CLI aliases; `fs__directory__list`
//! is offered to the LLM but runs on the host; `shell__execute` and
//! `human__ask` run in the child with resumable phases.

use crate::registry::{AliasMatch, ToolDef};
use serde_json::json;

/// The full builtin catalog, in registration order. Alias scan order
/// follows this order.
pub fn builtin_defs() -> Vec<ToolDef> {
    vec![
        session_new(),
        session_list(),
        session_send(),
        session_pause(),
        session_resume(),
        session_stop(),
        session_run(),
        session_retry(),
        session_delete(),
        approval_resolve(),
        question_answer(),
        group_add(),
        group_remove(),
        group_list(),
        group_send(),
        template_list(),
        fs_directory_list(),
        shell_execute(),
        human_ask(),
    ]
}

fn no_params() -> serde_json::Value {
    json!({"type": "object", "properties": {}})
}

fn session_param() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "session": {"type": "integer", "description": "Target session id"}
        },
        "required": ["session"]
    })
}

fn session_id_arg(token: &str) -> Option<serde_json::Value> {
    token.parse::<u64>().ok().map(|id| json!({"session": id}))
}

fn session_new() -> ToolDef {
    fn alias(argv: &[String]) -> Option<AliasMatch> {
        if argv[0] != "new" || argv.len() < 2 {
            return None;
        }
        let mut args = json!({"template": argv[1]});
        if let Some(name) = argv.get(2) {
            args["name"] = json!(name);
        }
        Some(AliasMatch { name: "session__new".to_string(), args })
    }
    ToolDef::new(
        "session__new",
        "Create a session from a template",
        json!({
            "type": "object",
            "properties": {
                "template": {"type": "string"},
                "name": {"type": "string"}
            },
            "required": ["template"]
        }),
    )
    .positional(&["template", "name"])
    .human_only()
    .local_command()
    .host_execution()
    .alias(alias)
}

fn session_list() -> ToolDef {
    fn alias(argv: &[String]) -> Option<AliasMatch> {
        (argv[0] == "ls")
            .then(|| AliasMatch { name: "session__list".to_string(), args: json!({}) })
    }
    ToolDef::new("session__list", "List sessions", no_params())
        .human_only()
        .local_command()
        .host_execution()
        .alias(alias)
}

fn session_send() -> ToolDef {
    fn alias(argv: &[String]) -> Option<AliasMatch> {
        if argv[0] != "send" || argv.len() < 3 {
            return None;
        }
        let mut args = session_id_arg(&argv[1])?;
        args["text"] = json!(argv[2..].join(" "));
        Some(AliasMatch { name: "session__send".to_string(), args })
    }
    // Routed to the owning child: the child is the only writer of the
    // message log.
    ToolDef::new(
        "session__send",
        "Append a user message to a session",
        json!({
            "type": "object",
            "properties": {
                "session": {"type": "integer"},
                "text": {"type": "string"}
            },
            "required": ["session", "text"]
        }),
    )
    .positional(&["session", "text"])
    .human_only()
    .alias(alias)
}

/// Generate a lifecycle verb definition with a `<verb> <id>` alias.
macro_rules! lifecycle_tool {
    ($fn_name:ident, $tool:literal, $verb:literal, $help:literal) => {
        fn $fn_name() -> ToolDef {
            fn alias(argv: &[String]) -> Option<AliasMatch> {
                if argv[0] != $verb || argv.len() != 2 {
                    return None;
                }
                let args = session_id_arg(&argv[1])?;
                Some(AliasMatch { name: $tool.to_string(), args })
            }
            ToolDef::new($tool, $help, session_param())
                .positional(&["session"])
                .human_only()
                .local_command()
                .host_execution()
                .alias(alias)
        }
    };
}

lifecycle_tool!(session_pause, "session__pause", "pause", "Pause a session");
lifecycle_tool!(session_resume, "session__resume", "resume", "Resume a paused session");
lifecycle_tool!(session_stop, "session__stop", "stop", "Stop a session");
lifecycle_tool!(session_run, "session__run", "run", "Run a stopped session");
lifecycle_tool!(session_retry, "session__retry", "retry", "Retry a finished session");
lifecycle_tool!(session_delete, "session__delete", "rm", "Soft-delete a session");

fn approval_resolve() -> ToolDef {
    fn alias(argv: &[String]) -> Option<AliasMatch> {
        if argv[0] != "approve" || argv.len() < 3 {
            return None;
        }
        let id: u64 = argv[1].parse().ok()?;
        let mut args = json!({"id": id, "choice": argv[2]});
        if argv.len() > 3 {
            args["explanation"] = json!(argv[3..].join(" "));
        }
        Some(AliasMatch { name: "approval__resolve".to_string(), args })
    }
    ToolDef::new(
        "approval__resolve",
        "Resolve a pending approval (APPROVE, REJECT, or MODIFY)",
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "choice": {"type": "string", "enum": ["APPROVE", "REJECT", "MODIFY"]},
                "explanation": {"type": "string"}
            },
            "required": ["id", "choice"]
        }),
    )
    .positional(&["id", "choice", "explanation"])
    .human_only()
    .local_command()
    .host_execution()
    .alias(alias)
}

fn question_answer() -> ToolDef {
    fn alias(argv: &[String]) -> Option<AliasMatch> {
        if argv[0] != "answer" || argv.len() < 3 {
            return None;
        }
        let id: u64 = argv[1].parse().ok()?;
        let args = json!({"id": id, "answer": argv[2..].join(" ")});
        Some(AliasMatch { name: "question__answer".to_string(), args })
    }
    ToolDef::new(
        "question__answer",
        "Answer a pending question",
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "answer": {"type": "string"}
            },
            "required": ["id", "answer"]
        }),
    )
    .positional(&["id", "answer"])
    .human_only()
    .local_command()
    .host_execution()
    .alias(alias)
}

fn group_add() -> ToolDef {
    ToolDef::new(
        "group__add",
        "Add a session to a group (membership is exclusive)",
        json!({
            "type": "object",
            "properties": {
                "group": {"type": "string"},
                "session": {"type": "integer"}
            },
            "required": ["group", "session"]
        }),
    )
    .positional(&["group", "session"])
    .human_only()
    .local_command()
    .host_execution()
}

fn group_remove() -> ToolDef {
    ToolDef::new(
        "group__remove",
        "Remove a session from a group",
        json!({
            "type": "object",
            "properties": {
                "group": {"type": "string"},
                "session": {"type": "integer"}
            },
            "required": ["group", "session"]
        }),
    )
    .positional(&["group", "session"])
    .human_only()
    .local_command()
    .host_execution()
}

fn group_list() -> ToolDef {
    fn alias(argv: &[String]) -> Option<AliasMatch> {
        (argv[0] == "groups")
            .then(|| AliasMatch { name: "group__list".to_string(), args: json!({}) })
    }
    ToolDef::new("group__list", "List groups and their members", no_params())
        .human_only()
        .local_command()
        .host_execution()
        .alias(alias)
}

fn group_send() -> ToolDef {
    ToolDef::new(
        "group__send",
        "Send a user message to every session in a group",
        json!({
            "type": "object",
            "properties": {
                "group": {"type": "string"},
                "text": {"type": "string"}
            },
            "required": ["group", "text"]
        }),
    )
    .positional(&["group", "text"])
    .human_only()
    .local_command()
    .host_execution()
}

fn template_list() -> ToolDef {
    fn alias(argv: &[String]) -> Option<AliasMatch> {
        (argv[0] == "templates")
            .then(|| AliasMatch { name: "template__list".to_string(), args: json!({}) })
    }
    ToolDef::new("template__list", "List available templates", no_params())
        .human_only()
        .local_command()
        .host_execution()
        .alias(alias)
}

fn fs_directory_list() -> ToolDef {
    ToolDef::new(
        "fs__directory__list",
        "List the entries of a directory",
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Absolute directory path"}
            },
            "required": ["path"]
        }),
    )
    .positional(&["path"])
    .host_execution()
}

fn shell_execute() -> ToolDef {
    ToolDef::new(
        "shell__execute",
        "Execute a shell command in the session workspace",
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "Command line to run"}
            },
            "required": ["command"]
        }),
    )
    .positional(&["command"])
}

fn human_ask() -> ToolDef {
    ToolDef::new(
        "human__ask",
        "Ask the human operator a question and wait for the answer",
        json!({
            "type": "object",
            "properties": {
                "question": {"type": "string"}
            },
            "required": ["question"]
        }),
    )
    .positional(&["question"])
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
