use crate::testing::Harness;
use berth_core::{
    ApprovalChoice, ExternalData, Outcome, Session, SessionStatus, ToolCall, ToolSelector,
};
use serde_json::json;
use tempfile::TempDir;

fn shell_session() -> Session {
    Session::builder()
        .id(1)
        .status(SessionStatus::Running)
        .tools(vec![ToolSelector::from("shell__execute")])
        .build()
}

#[tokio::test]
async fn unknown_tool_fails_cleanly() {
    let tmp = TempDir::new().unwrap();
    let h = Harness::new(tmp.path(), shell_session()).unwrap();
    let call = ToolCall::new("c1", "no__such__tool", "{}");
    let outcome = h.executor.execute(&h.ctx, &h.registry, &call).await;
    assert!(matches!(outcome, Outcome::Failure { error } if error.contains("unknown tool")));
}

#[tokio::test]
async fn host_tools_round_trip_over_the_link() {
    let tmp = TempDir::new().unwrap();
    let session = Session::builder()
        .id(1)
        .status(SessionStatus::Running)
        .tools(vec![ToolSelector::from("fs__directory__list")])
        .build();
    let h = Harness::new(tmp.path(), session).unwrap();
    h.link.push_host_tool(Outcome::success(json!(["a.txt", "b.txt"])));

    let call = ToolCall::new("c1", "fs__directory__list", "{\"path\": \"/tmp\"}");
    let outcome = h.executor.execute(&h.ctx, &h.registry, &call).await;
    assert_eq!(outcome, Outcome::success(json!(["a.txt", "b.txt"])));
}

#[tokio::test]
async fn exec_on_host_danger_upgrades_routing() {
    let tmp = TempDir::new().unwrap();
    let selector: ToolSelector = serde_json::from_value(json!({
        "shell__execute": {"exec_on": "host_danger"}
    }))
    .unwrap();
    let session = Session::builder()
        .id(1)
        .status(SessionStatus::Running)
        .tools(vec![selector])
        .build();
    let h = Harness::new(tmp.path(), session).unwrap();
    h.link.push_host_tool(Outcome::success(json!("ran on host")));

    let call = ToolCall::new("c1", "shell__execute", "{\"command\": \"true\"}");
    let outcome = h.executor.execute(&h.ctx, &h.registry, &call).await;
    assert_eq!(outcome, Outcome::success(json!("ran on host")));
}

#[tokio::test]
async fn running_state_round_trips_with_injected_external_data() {
    let tmp = TempDir::new().unwrap();
    let h = Harness::new(tmp.path(), shell_session()).unwrap();

    // `echo` is not allowlisted: first invocation suspends.
    let call = ToolCall::new("T", "shell__execute", "{\"command\": \"echo hi\"}");
    let outcome = h.executor.execute(&h.ctx, &h.registry, &call).await;
    assert!(outcome.is_running());

    let parked = h.executor.state_of("T").unwrap();
    assert_eq!(parked.state["phase"], "awaiting_approval");
    assert_eq!(parked.state["command"], "echo hi");

    // Spurious re-invocation before any resolution: still running, same state.
    let outcome = h.executor.execute(&h.ctx, &h.registry, &call).await;
    assert!(outcome.is_running());
    assert_eq!(h.executor.state_of("T").unwrap().state["command"], "echo hi");

    // Approval arrives; the next invocation executes the original command.
    h.executor
        .inject_external("T", ExternalData::approval(ApprovalChoice::Approve, None));
    let outcome = h.executor.execute(&h.ctx, &h.registry, &call).await;
    match outcome {
        Outcome::Success { result } => assert_eq!(result["stdout"], "hi\n"),
        other => panic!("expected success, got {other:?}"),
    }
    assert!(h.executor.state_of("T").is_none(), "terminal outcome drops the entry");
}

#[tokio::test]
async fn malformed_arguments_become_a_tool_failure() {
    let tmp = TempDir::new().unwrap();
    let h = Harness::new(tmp.path(), shell_session()).unwrap();
    let call = ToolCall::new("c1", "shell__execute", "{broken");
    let outcome = h.executor.execute(&h.ctx, &h.registry, &call).await;
    assert!(matches!(outcome, Outcome::Failure { error } if error.contains("malformed")));
}

#[tokio::test]
async fn human_only_tools_are_rejected_for_the_model() {
    let tmp = TempDir::new().unwrap();
    let h = Harness::new(tmp.path(), shell_session()).unwrap();
    let call = ToolCall::new("c1", "session__new", "{\"template\": \"echo\"}");
    let outcome = h.executor.execute(&h.ctx, &h.registry, &call).await;
    assert!(matches!(outcome, Outcome::Failure { error } if error.contains("not available")));
}
