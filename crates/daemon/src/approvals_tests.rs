use super::*;
use crate::test_fixtures::*;
use berth_core::{ApprovalStatus, Question, Role, Session};
use berth_wire::Message;
use tempfile::TempDir;

fn paused_session(id: u64) -> Session {
    Session::builder().id(id).status(SessionStatus::Paused).build()
}

#[tokio::test]
async fn resolve_approval_persists_and_forwards_to_the_child() {
    let tmp = TempDir::new().unwrap();
    let ctx = test_ctx(tmp.path());
    seed_session(&ctx, paused_session(4));
    let (mut reader, _writer) = attach_fake_child(&ctx, 4);

    let id = record_approval(
        &ctx,
        4,
        Approval::pending(7, 4, "T", "command", "git push", 100),
    );
    assert_eq!(id, 1);

    let data = resolve_approval(&ctx, id, ApprovalChoice::Approve, Some("go".to_string()))
        .await
        .unwrap();
    assert_eq!(data["toolCall"], "T");

    let stored = ctx.db.lock().approvals.get("1").unwrap().unwrap();
    assert_eq!(stored.status, ApprovalStatus::Approve);
    assert_eq!(stored.response.as_deref(), Some("go"));

    let forwarded: Message = reader.next().await.unwrap().unwrap();
    match forwarded {
        Message::ApprovalResponse { session_id, tool_call_id, choice, explanation } => {
            assert_eq!((session_id, tool_call_id.as_str()), (4, "T"));
            assert_eq!(choice, ApprovalChoice::Approve);
            assert_eq!(explanation.as_deref(), Some("go"));
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn approvals_resolve_exactly_once() {
    let tmp = TempDir::new().unwrap();
    let ctx = test_ctx(tmp.path());
    seed_session(&ctx, paused_session(4));
    let (_reader, _writer) = attach_fake_child(&ctx, 4);

    let id = record_approval(&ctx, 4, Approval::pending(1, 4, "T", "command", "x", 0));
    resolve_approval(&ctx, id, ApprovalChoice::Reject, None).await.unwrap();

    let err = resolve_approval(&ctx, id, ApprovalChoice::Approve, None).await.unwrap_err();
    assert!(err.contains("already resolved"), "{err}");
    let stored = ctx.db.lock().approvals.get(&id.to_string()).unwrap().unwrap();
    assert_eq!(stored.status, ApprovalStatus::Reject);
}

#[tokio::test]
async fn unknown_approval_id_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let ctx = test_ctx(tmp.path());
    let err = resolve_approval(&ctx, 99, ApprovalChoice::Approve, None).await.unwrap_err();
    assert!(err.contains("not found"));
}

#[tokio::test]
async fn answer_question_appends_the_synthetic_tool_message_while_paused() {
    let tmp = TempDir::new().unwrap();
    let ctx = test_ctx(tmp.path());
    seed_session(&ctx, paused_session(5));
    let (mut reader, _writer) = attach_fake_child(&ctx, 5);

    let id = record_question(&ctx, 5, Question::pending(3, 5, "Q", "file?", 50));
    answer_question(&ctx, id, "foo.txt".to_string()).await.unwrap();

    let session = ctx.db.lock().sessions.get(5).unwrap().unwrap();
    let last = session.messages.last().unwrap();
    assert_eq!(last.role, Role::Tool);
    assert_eq!(last.tool_call_id.as_deref(), Some("Q"));
    assert_eq!(last.name.as_deref(), Some("human__ask"));
    assert_eq!(last.content, "foo.txt");

    let forwarded: Message = reader.next().await.unwrap().unwrap();
    assert!(matches!(
        forwarded,
        Message::QuestionResponse { tool_call_id, answer, .. }
            if tool_call_id == "Q" && answer == "foo.txt"
    ));
}

#[tokio::test]
async fn synthetic_message_is_skipped_when_the_session_is_not_paused() {
    let tmp = TempDir::new().unwrap();
    let ctx = test_ctx(tmp.path());
    seed_session(&ctx, Session::builder().id(6).status(SessionStatus::Running).build());
    let (_reader, _writer) = attach_fake_child(&ctx, 6);

    let id = record_question(&ctx, 6, Question::pending(1, 6, "Q", "file?", 50));
    answer_question(&ctx, id, "foo.txt".to_string()).await.unwrap();

    let session = ctx.db.lock().sessions.get(6).unwrap().unwrap();
    assert!(session.messages.is_empty(), "no cross-process append outside PAUSED");
}
