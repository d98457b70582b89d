use super::*;
use crate::message::ToolCall;

fn choice(content: &str, calls: Vec<ToolCall>, finish: Option<&str>) -> Choice {
    Choice {
        message: ChoiceMessage { content: content.to_string(), tool_calls: calls },
        finish_reason: finish.map(str::to_string),
    }
}

#[test]
fn merge_concatenates_content_and_tool_calls_in_order() {
    let choices = vec![
        choice("a", vec![ToolCall::new("c1", "t1", "{}")], Some("stop")),
        choice("b", vec![ToolCall::new("c2", "t2", "{}"), ToolCall::new("c3", "t3", "{}")], None),
    ];
    let (merged, _) = merge_choices(&choices, 7);
    assert_eq!(merged.content, "ab");
    let ids: Vec<&str> = merged.tool_calls.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["c1", "c2", "c3"]);
    assert_eq!(merged.timestamp, 7);
}

#[test]
fn finish_reason_is_tool_calls_if_any_choice_had_it() {
    let choices = vec![
        choice("", vec![], Some(FINISH_TOOL_CALLS)),
        choice("", vec![], Some("stop")),
    ];
    let (_, finish) = merge_choices(&choices, 0);
    assert_eq!(finish.as_deref(), Some(FINISH_TOOL_CALLS));
}

#[test]
fn finish_reason_falls_back_to_last_choice() {
    let choices = vec![choice("", vec![], Some("length")), choice("", vec![], Some("stop"))];
    let (_, finish) = merge_choices(&choices, 0);
    assert_eq!(finish.as_deref(), Some("stop"));
}

#[test]
fn merge_of_empty_response_is_empty_assistant_message() {
    let (merged, finish) = merge_choices(&[], 0);
    assert_eq!(merged.content, "");
    assert!(merged.tool_calls.is_empty());
    assert_eq!(finish, None);
}
