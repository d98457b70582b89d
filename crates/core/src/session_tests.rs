use super::*;
use crate::message::ToolCall;
use yare::parameterized;

#[parameterized(
    start = { SessionAction::Start, SessionStatus::Pending, SessionStatus::Running },
    complete = { SessionAction::Complete, SessionStatus::Running, SessionStatus::Success },
    fail = { SessionAction::Fail, SessionStatus::Running, SessionStatus::Error },
    pause_pending = { SessionAction::Pause, SessionStatus::Pending, SessionStatus::Paused },
    pause_running = { SessionAction::Pause, SessionStatus::Running, SessionStatus::Paused },
    resume = { SessionAction::Resume, SessionStatus::Paused, SessionStatus::Pending },
    stop_pending = { SessionAction::Stop, SessionStatus::Pending, SessionStatus::Stopped },
    stop_running = { SessionAction::Stop, SessionStatus::Running, SessionStatus::Stopped },
    stop_paused = { SessionAction::Stop, SessionStatus::Paused, SessionStatus::Stopped },
    run = { SessionAction::Run, SessionStatus::Stopped, SessionStatus::Running },
    retry_success = { SessionAction::Retry, SessionStatus::Success, SessionStatus::Pending },
    retry_error = { SessionAction::Retry, SessionStatus::Error, SessionStatus::Pending },
)]
fn status_table_accepts(action: SessionAction, from: SessionStatus, to: SessionStatus) {
    assert_eq!(status_fsm().transition(from, action), Ok(to));
}

#[parameterized(
    start_from_running = { SessionAction::Start, SessionStatus::Running },
    complete_from_paused = { SessionAction::Complete, SessionStatus::Paused },
    resume_from_running = { SessionAction::Resume, SessionStatus::Running },
    run_from_pending = { SessionAction::Run, SessionStatus::Pending },
    retry_from_running = { SessionAction::Retry, SessionStatus::Running },
    stop_from_success = { SessionAction::Stop, SessionStatus::Success },
)]
fn status_table_rejects(action: SessionAction, from: SessionStatus) {
    assert!(status_fsm().transition(from, action).is_err());
}

#[test]
fn rejected_transition_reports_the_tables_from_set() {
    let err = status_fsm()
        .transition(SessionStatus::Success, SessionAction::Pause)
        .unwrap_err();
    assert_eq!(
        err,
        crate::FsmError::InvalidTransition {
            action: SessionAction::Pause,
            current: SessionStatus::Success,
            admissible: vec![SessionStatus::Pending, SessionStatus::Running],
        }
    );
}

#[test]
fn status_serializes_screaming_case() {
    assert_eq!(serde_json::to_string(&SessionStatus::Pending).unwrap(), "\"PENDING\"");
    assert_eq!(serde_json::to_string(&SessionStatus::Success).unwrap(), "\"SUCCESS\"");
}

#[test]
fn container_id_is_id_underscore_seconds() {
    assert_eq!(make_container_id(7, 1_700_000_000), "7_1700000000");
}

#[test]
fn wants_tick_on_user_tool_and_pending_assistant() {
    let mut s = Session::builder().build();
    assert!(!s.wants_tick());

    s.push_message(ChatMessage::user("hi", 1));
    assert!(s.wants_tick());

    s.push_message(ChatMessage::assistant("calling", vec![ToolCall::new("c1", "t", "{}")], 2));
    assert!(s.wants_tick(), "assistant with unresolved tool_calls is actionable");

    s.push_message(ChatMessage::tool("c1", "t", "done", 3));
    assert!(s.wants_tick());

    s.push_message(ChatMessage::assistant("bye", vec![], 4));
    assert!(!s.wants_tick(), "plain assistant message ends the turn");
}

#[test]
fn pending_tool_calls_excludes_answered_ids() {
    let mut s = Session::builder().build();
    s.push_message(ChatMessage::assistant(
        "",
        vec![ToolCall::new("c1", "a", "{}"), ToolCall::new("c2", "b", "{}")],
        1,
    ));
    s.push_message(ChatMessage::tool("c1", "a", "ok", 2));
    let pending: Vec<&str> = s.pending_tool_calls().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(pending, ["c2"]);
}

#[test]
fn tool_selector_with_options_exposes_name_and_option() {
    let yaml_like = serde_json::json!([
        "human__ask",
        {"shell__execute": {"exec_on": "host_danger"}}
    ]);
    let tools: Vec<ToolSelector> = serde_json::from_value(yaml_like).unwrap();
    assert_eq!(tools[0].name(), "human__ask");
    assert_eq!(tools[0].option_str("exec_on"), None);
    assert_eq!(tools[1].name(), "shell__execute");
    assert_eq!(tools[1].option_str("exec_on"), Some("host_danger"));
}

#[test]
fn from_template_seeds_pending_session() {
    let template = crate::Template {
        name: "echo".to_string(),
        description: "".to_string(),
        model: ModelRef::new("xai", "mock"),
        tools: vec![ToolSelector::from("human__ask")],
        labels: IndexMap::new(),
        system_prompt: "You are an echo.".to_string(),
    };
    let s = Session::from_template(3, "echo-1", &template, 5_000);
    assert_eq!(s.status, SessionStatus::Pending);
    assert_eq!(s.container_id, "3_5");
    assert_eq!(s.system_prompt, "You are an echo.");
    assert!(!s.system_prompt_evaluated);
}
