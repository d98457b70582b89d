//! Workspace-level scenario tests: the end-to-end behaviors the system
//! promises, driven through the public crate APIs without real sockets
//! where a fake host link suffices.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use berth_core::{
    merge_choices, ApprovalChoice, ChatMessage, Choice, ChoiceMessage, Role, Session,
    SessionAction, SessionStatus, ToolCall, ToolSelector,
};
use berth_engine::agent_loop::TickOutcome;
use berth_engine::testing::{text_response, tool_call_response, Harness};
use berth_store::{DbLayout, SessionStore};
use tempfile::TempDir;

fn session(id: u64, tools: Vec<ToolSelector>, user_text: &str) -> Session {
    Session::builder()
        .id(id)
        .tools(tools)
        .messages(vec![ChatMessage::user(user_text, 1)])
        .system_prompt("You are an echo.")
        .system_prompt_evaluated(true)
        .build()
}

// --- Store and lifecycle invariants -----------------------------------

#[test]
fn session_ids_survive_restart_and_reset_after_clean() {
    let tmp = TempDir::new().unwrap();
    {
        let mut store = SessionStore::open(DbLayout::new(tmp.path())).unwrap();
        assert_eq!(store.generate_id(), 1);
        store.create(Session::builder().id(1).build()).unwrap();
        store.create(Session::builder().id(5).build()).unwrap();
    }
    {
        let store = SessionStore::open(DbLayout::new(tmp.path())).unwrap();
        assert_eq!(store.next_id(), 6, "max(existing)+1 after restart");
    }
    std::fs::remove_dir_all(tmp.path().join("db")).unwrap();
    let store = SessionStore::open(DbLayout::new(tmp.path())).unwrap();
    assert_eq!(store.next_id(), 1, "clean resets allocation");
}

#[test]
fn successful_transitions_are_visible_on_disk() {
    let tmp = TempDir::new().unwrap();
    let mut store = SessionStore::open(DbLayout::new(tmp.path())).unwrap();
    store.create(Session::builder().id(1).build()).unwrap();

    let (_, record) = store.transition(1, SessionAction::Start, 10).unwrap();
    assert_eq!(record.to, SessionStatus::Running);

    let mut fresh = SessionStore::open(DbLayout::new(tmp.path())).unwrap();
    assert_eq!(fresh.get(1).unwrap().unwrap().status, SessionStatus::Running);
}

#[test]
fn choice_merge_concatenates_in_order() {
    let choices = vec![
        Choice {
            message: ChoiceMessage {
                content: "A".into(),
                tool_calls: vec![ToolCall::new("c1", "t", "{}")],
            },
            finish_reason: Some("stop".into()),
        },
        Choice {
            message: ChoiceMessage {
                content: "B".into(),
                tool_calls: vec![ToolCall::new("c2", "t", "{}")],
            },
            finish_reason: Some("tool_calls".into()),
        },
    ];
    let (merged, finish) = merge_choices(&choices, 0);
    assert_eq!(merged.content, "AB");
    let ids: Vec<&str> = merged.tool_calls.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["c1", "c2"]);
    assert_eq!(finish.as_deref(), Some("tool_calls"));
}

#[test]
fn command_resolution_is_deterministic() {
    let mut registry: berth_tools::Registry<()> = berth_tools::Registry::new();
    for def in berth_tools::catalog::builtin_defs() {
        registry.register(def, None);
    }
    // Alias beats gluing; gluing picks the shortest existing name.
    assert_eq!(registry.resolve("ls").unwrap().def.name, "session__list");
    assert_eq!(
        registry.resolve("fs directory list /tmp").unwrap().def.name,
        "fs__directory__list"
    );
    assert!(registry.resolve("no such command").is_err());
}

#[test]
fn allowlist_approval_matrix() {
    let rules = serde_json::json!({
        "git": true,
        "rm": false,
        "/^cargo (build|test)/": true,
    });
    let allowlist = berth_tools::Allowlist::from_json(&rules).unwrap();
    use berth_tools::Decision;

    assert_eq!(allowlist.check("git status"), Decision::Approved);
    assert_eq!(allowlist.check("cargo build --release"), Decision::Approved);
    assert_eq!(allowlist.check("git pull && cargo test"), Decision::Approved);
    assert_eq!(
        allowlist.check("git pull && rm -rf target"),
        Decision::Denied { rule: "rm".into() }
    );
    assert_eq!(allowlist.check("echo $(rm x)"), Decision::Denied { rule: "rm".into() });
    assert_eq!(allowlist.check("make"), Decision::Unmatched);
}

// --- S1: happy path, no tools -----------------------------------------

#[tokio::test]
async fn s1_echo_session_completes() {
    let tmp = TempDir::new().unwrap();
    let h = Harness::new(tmp.path(), session(1, vec![], "Ping")).unwrap();
    h.link.push_completion(text_response("Pong", "stop"));

    let mut agent = h.agent_loop();
    agent.startup().unwrap();
    assert_eq!(agent.tick().await.unwrap(), TickOutcome::Finished);

    let done = h.session().unwrap();
    assert_eq!(done.status, SessionStatus::Success);
    let log: Vec<(Role, &str)> =
        done.messages.iter().map(|m| (m.role, m.content.as_str())).collect();
    assert_eq!(log, [(Role::User, "Ping"), (Role::Assistant, "Pong")]);
}

// --- S2: host-executed tool round-trip --------------------------------

#[tokio::test]
async fn s2_host_tool_round_trip() {
    let tmp = TempDir::new().unwrap();
    let h = Harness::new(
        tmp.path(),
        session(1, vec![ToolSelector::from("fs__directory__list")], "ls /tmp"),
    )
    .unwrap();
    h.link.push_completion(tool_call_response(vec![ToolCall::new(
        "c1",
        "fs__directory__list",
        "{\"path\": \"/tmp\"}",
    )]));
    h.link
        .push_host_tool(berth_core::Outcome::success(serde_json::json!(["a", "b"])));
    h.link.push_completion(text_response("done", "stop"));

    let mut agent = h.agent_loop();
    agent.startup().unwrap();
    assert_eq!(agent.tick().await.unwrap(), TickOutcome::Acted);
    assert_eq!(agent.tick().await.unwrap(), TickOutcome::Finished);

    let done = h.session().unwrap();
    assert_eq!(done.status, SessionStatus::Success);
    assert_eq!(done.messages[2].role, Role::Tool);
    assert!(done.messages[2].content.contains("\"a\""));
    assert_eq!(done.messages[3].content, "done");
}

// --- S3: allowlist deny under unattended ------------------------------

#[tokio::test]
async fn s3_unattended_deny_fails_without_pausing() {
    let tmp = TempDir::new().unwrap();
    let allowlist =
        berth_tools::Allowlist::from_json(&serde_json::json!({"rm": false})).unwrap();
    let h = Harness::with_options(
        tmp.path(),
        session(1, vec![ToolSelector::from("shell__execute")], "clean up"),
        true,
        allowlist,
    )
    .unwrap();
    h.link.push_completion(tool_call_response(vec![ToolCall::new(
        "c1",
        "shell__execute",
        "{\"command\": \"rm -rf /\"}",
    )]));

    let mut agent = h.agent_loop();
    agent.startup().unwrap();
    assert_eq!(agent.tick().await.unwrap(), TickOutcome::Acted);

    let after = h.session().unwrap();
    assert_ne!(after.status, SessionStatus::Paused, "no pause under unattended");
    let tool_msg = after.messages.last().unwrap();
    assert_eq!(tool_msg.role, Role::Tool);
    assert!(tool_msg.content.contains("rm"), "names the deny rule: {}", tool_msg.content);
    assert!(h.link.sent().is_empty(), "no approval request emitted");
}

// --- S4: approval resumption ------------------------------------------

#[tokio::test]
async fn s4_approval_resumption_executes_the_original_command() {
    let tmp = TempDir::new().unwrap();
    let h = Harness::new(
        tmp.path(),
        session(1, vec![ToolSelector::from("shell__execute")], "push it"),
    )
    .unwrap();
    h.link.push_completion(tool_call_response(vec![ToolCall::new(
        "T",
        "shell__execute",
        "{\"command\": \"echo pushed\"}",
    )]));

    let mut agent = h.agent_loop();
    agent.startup().unwrap();

    // RUNNING outcome: paused, pending approval persisted, no tool message.
    agent.tick().await.unwrap();
    let paused = h.session().unwrap();
    assert_eq!(paused.status, SessionStatus::Paused);
    let approval_ids = h.ctx.approvals.lock().list().unwrap();
    let approval = h.ctx.approvals.lock().get(&approval_ids[0]).unwrap().unwrap();
    assert!(approval.is_pending());
    assert_eq!(approval.tool_call_id, "T");

    // Approval arrives over the bridge.
    agent
        .handle_message(berth_wire::Message::ApprovalResponse {
            session_id: 1,
            tool_call_id: "T".into(),
            choice: ApprovalChoice::Approve,
            explanation: None,
        })
        .await;
    assert_eq!(h.session().unwrap().status, SessionStatus::Pending, "resume = PAUSED→PENDING");

    // Next tick re-invokes with the stored state and executes.
    assert_eq!(agent.tick().await.unwrap(), TickOutcome::Acted);
    let done = h.session().unwrap();
    let tool_msg = done.messages.last().unwrap();
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("T"));
    assert!(tool_msg.content.contains("pushed"));
}

// --- S5: question answered --------------------------------------------

#[tokio::test]
async fn s5_question_flow_observes_the_answer() {
    let tmp = TempDir::new().unwrap();
    let h = Harness::new(
        tmp.path(),
        session(1, vec![ToolSelector::from("human__ask")], "need input"),
    )
    .unwrap();
    h.link.push_completion(tool_call_response(vec![ToolCall::new(
        "Q",
        "human__ask",
        "{\"question\": \"file?\"}",
    )]));
    h.link.push_completion(text_response("opening foo.txt", "stop"));

    let mut agent = h.agent_loop();
    agent.startup().unwrap();
    agent.tick().await.unwrap();

    let paused = h.session().unwrap();
    assert_eq!(paused.status, SessionStatus::Paused);
    let question_ids = h.ctx.questions.lock().list().unwrap();
    let question = h.ctx.questions.lock().get(&question_ids[0]).unwrap().unwrap();
    assert!(question.is_pending());
    assert_eq!(question.tool_call_id, "Q");

    // The host answers: synthetic tool message while paused, then the
    // response reaches the child.
    {
        let mut store = h.ctx.store.lock();
        let mut s = store.get(1).unwrap().unwrap();
        s.push_message(ChatMessage::tool("Q", "human__ask", "foo.txt", 9));
        store.put(&s).unwrap();
    }
    agent
        .handle_message(berth_wire::Message::QuestionResponse {
            session_id: 1,
            tool_call_id: "Q".into(),
            answer: "foo.txt".into(),
        })
        .await;

    assert_eq!(agent.tick().await.unwrap(), TickOutcome::Finished);
    let done = h.session().unwrap();
    assert_eq!(done.status, SessionStatus::Success);
    let answers: Vec<&str> = done
        .messages
        .iter()
        .filter(|m| m.tool_call_id.as_deref() == Some("Q"))
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(answers, ["foo.txt"], "exactly one tool answer for Q");
    assert_eq!(done.messages.last().unwrap().content, "opening foo.txt");
    assert!(
        h.executor.state_of("Q").is_none(),
        "answered call leaves no parked tool state"
    );
}

// --- S6: recovery after host restart ----------------------------------

#[tokio::test]
async fn s6_recovery_scan_respawns_only_what_needs_it() {
    let tmp = TempDir::new().unwrap();
    std::env::set_var("BERTH_AGENT_BIN", "/bin/true");

    let mut config = berth_daemon::Config::default();
    config.root = tmp.path().to_path_buf();
    let db = berth_store::Db::open(DbLayout::new(tmp.path())).unwrap();
    let ctx = std::sync::Arc::new(berth_daemon::HostCtx::new(
        config,
        db,
        berth_daemon::providers::ProviderRegistry::new(),
    ));
    ctx.set_registry(std::sync::Arc::new(berth_daemon::host_tools::host_registry()));

    ctx.db
        .lock()
        .sessions
        .create(Session::builder().id(1).status(SessionStatus::Running).build())
        .unwrap();
    ctx.db
        .lock()
        .sessions
        .create(Session::builder().id(2).status(SessionStatus::Error).build())
        .unwrap();

    berth_daemon::supervisor::recover(&ctx).await.unwrap();
    std::env::remove_var("BERTH_AGENT_BIN");

    // The running session got its workspace, socket, and child back.
    assert!(tmp.path().join("db/workspaces/1/db/sessions/1.yml").exists());
    assert!(tmp.path().join("db/workspaces/1/db/sockets/1.sock").exists());
    assert!(tmp.path().join("db/workspaces/1/db/agent.pid").exists());

    // The failed session idles untouched.
    assert!(!tmp.path().join("db/workspaces/2").exists());
    assert_eq!(
        ctx.db.lock().sessions.get(2).unwrap().unwrap().status,
        SessionStatus::Error
    );
}

// --- Cross-process visibility through the store -----------------------

#[test]
fn host_and_child_observe_each_other_through_mtime() {
    let tmp = TempDir::new().unwrap();
    let mut host = SessionStore::open(DbLayout::new(tmp.path())).unwrap();
    host.create(Session::builder().id(1).build()).unwrap();
    host.adopt_workspace(1).unwrap();

    let mut child =
        SessionStore::open(DbLayout::new(tmp.path().join("db/workspaces/1"))).unwrap();

    // Host pauses; child sees it without any message.
    host.transition(1, SessionAction::Pause, 5).unwrap();
    assert_eq!(child.get(1).unwrap().unwrap().status, SessionStatus::Paused);

    // Child appends while paused; host sees it.
    std::thread::sleep(std::time::Duration::from_millis(20));
    let mut s = child.get(1).unwrap().unwrap();
    s.push_message(ChatMessage::user("hello", 6));
    child.put(&s).unwrap();
    assert_eq!(host.get(1).unwrap().unwrap().messages.len(), 1);
}
