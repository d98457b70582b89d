use super::*;
use crate::providers::FakeProvider;
use crate::test_fixtures::*;
use berth_core::{CompletionRequest, Session, SessionStatus, ToolCall};
use berth_wire::{child_message_id, CorrelationId};
use tempfile::TempDir;

fn running_session(id: u64) -> Session {
    Session::builder().id(id).status(SessionStatus::Running).build()
}

#[tokio::test]
async fn child_tool_call_is_executed_and_answered() {
    let tmp = TempDir::new().unwrap();
    let ctx = test_ctx(tmp.path());
    seed_session(&ctx, running_session(3));
    let (mut reader, mut writer) = attach_fake_child(&ctx, 3);

    let listing_dir = tmp.path().join("listing");
    std::fs::create_dir_all(listing_dir.join("sub")).unwrap();
    std::fs::write(listing_dir.join("a.txt"), "x").unwrap();

    child_send(
        &mut writer,
        &Message::ToolCall {
            message_id: child_message_id(1),
            session_id: 3,
            tool_call: ToolCall::new(
                "c1",
                "fs__directory__list",
                serde_json::json!({"path": listing_dir}).to_string(),
            ),
        },
    )
    .await;

    let reply: Message = reader.next().await.unwrap().unwrap();
    match reply {
        Message::CommandResponse { message_id, success, data, .. } => {
            assert_eq!(message_id, CorrelationId::Num(1));
            assert!(success);
            assert_eq!(data.unwrap(), serde_json::json!(["a.txt", "sub"]));
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn non_host_tools_are_refused_without_an_upgrade() {
    let tmp = TempDir::new().unwrap();
    let ctx = test_ctx(tmp.path());
    seed_session(&ctx, running_session(3));
    let (mut reader, mut writer) = attach_fake_child(&ctx, 3);

    child_send(
        &mut writer,
        &Message::ToolCall {
            message_id: child_message_id(1),
            session_id: 3,
            tool_call: ToolCall::new("c1", "shell__execute", "{\"command\": \"true\"}"),
        },
    )
    .await;

    let reply: Message = reader.next().await.unwrap().unwrap();
    match reply {
        Message::CommandResponse { success, error, .. } => {
            assert!(!success);
            assert!(error.unwrap().contains("does not run on the host"));
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn ai_prompt_request_is_served_by_the_provider_registry() {
    let tmp = TempDir::new().unwrap();
    let fake = FakeProvider::new("xai");
    fake.push(FakeProvider::text("Pong", "stop"));
    let ctx = test_ctx_with_provider(tmp.path(), fake);
    seed_session(&ctx, running_session(3));
    let (mut reader, mut writer) = attach_fake_child(&ctx, 3);

    child_send(
        &mut writer,
        &Message::AiPromptRequest {
            message_id: child_message_id(9),
            session_id: 3,
            request: CompletionRequest {
                model: "xai:mock".to_string(),
                system: String::new(),
                messages: vec![],
                tools: vec![],
            },
        },
    )
    .await;

    let reply: Message = reader.next().await.unwrap().unwrap();
    match reply {
        Message::CommandResponse { success, data, .. } => {
            assert!(success);
            let response: berth_core::CompletionResponse =
                serde_json::from_value(data.unwrap()).unwrap();
            assert_eq!(response.choices[0].message.content, "Pong");
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn provider_failure_comes_back_as_error() {
    let tmp = TempDir::new().unwrap();
    let ctx = test_ctx(tmp.path());
    seed_session(&ctx, running_session(3));
    let (mut reader, mut writer) = attach_fake_child(&ctx, 3);

    child_send(
        &mut writer,
        &Message::AiPromptRequest {
            message_id: child_message_id(2),
            session_id: 3,
            request: CompletionRequest {
                model: "nobody:home".to_string(),
                system: String::new(),
                messages: vec![],
                tools: vec![],
            },
        },
    )
    .await;

    let reply: Message = reader.next().await.unwrap().unwrap();
    match reply {
        Message::CommandResponse { success, error, .. } => {
            assert!(!success);
            assert!(error.unwrap().contains("nobody"));
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn approval_request_is_persisted_under_a_host_id() {
    let tmp = TempDir::new().unwrap();
    let ctx = test_ctx(tmp.path());
    seed_session(&ctx, running_session(3));
    let (_reader, mut writer) = attach_fake_child(&ctx, 3);

    let approval = berth_core::Approval::pending(42, 3, "T", "command", "git push", 100);
    child_send(&mut writer, &Message::ApprovalRequest { session_id: 3, approval }).await;

    // The reader task persists asynchronously; poll briefly.
    let mut stored = None;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        if let Some(a) = ctx.db.lock().approvals.get("1").unwrap() {
            stored = Some(a);
            break;
        }
    }
    let stored = stored.expect("approval persisted");
    assert_eq!(stored.id, 1, "host allocates its own id");
    assert_eq!(stored.session_id, 3);
    assert_eq!(stored.tool_call_id, "T");
    assert!(stored.is_pending());
}

#[tokio::test(start_paused = true)]
async fn silent_child_round_trip_times_out_and_clears_pending() {
    let tmp = TempDir::new().unwrap();
    let ctx = test_ctx(tmp.path());
    seed_session(&ctx, running_session(3));
    let (_reader, _writer) = attach_fake_child(&ctx, 3);

    let err = command_round_trip(&ctx, 3, "send 3 hello").await.unwrap_err();
    assert!(err.contains("timed out"), "{err}");
    assert!(ctx.pending.is_empty());
}

#[tokio::test]
async fn missing_connection_is_a_routing_error() {
    let tmp = TempDir::new().unwrap();
    let ctx = test_ctx(tmp.path());
    let err = command_fire_and_forget(&ctx, 9, "send 9 hi").await.unwrap_err();
    assert!(err.to_string().contains("no connection"), "{err}");
}
