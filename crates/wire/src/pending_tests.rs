use super::*;
use crate::message::child_message_id;

fn ok_reply() -> CommandReply {
    CommandReply { success: true, data: Some(serde_json::json!("pong")), error: None }
}

#[tokio::test]
async fn resolve_wakes_the_registered_waiter() {
    let map = PendingMap::new();
    let id = child_message_id(1);
    let rx = map.register(id.clone());

    assert!(map.resolve(&id, ok_reply()));
    let reply = map.await_reply(&id, rx, ROUND_TRIP_TIMEOUT).await.unwrap();
    assert_eq!(reply.into_result().unwrap(), serde_json::json!("pong"));
    assert!(map.is_empty());
}

#[tokio::test]
async fn unmatched_response_is_reported() {
    let map = PendingMap::new();
    assert!(!map.resolve(&child_message_id(99), ok_reply()));
}

#[tokio::test(start_paused = true)]
async fn timeout_clears_the_entry() {
    let map = PendingMap::new();
    let id = child_message_id(2);
    let rx = map.register(id.clone());
    assert_eq!(map.len(), 1);

    let err = map
        .await_reply(&id, rx, std::time::Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));
    assert!(map.is_empty());
}

#[tokio::test]
async fn failure_replies_collapse_to_the_error_text() {
    let reply = CommandReply { success: false, data: None, error: Some("no handler".into()) };
    assert_eq!(reply.into_result().unwrap_err(), "no handler");
}
