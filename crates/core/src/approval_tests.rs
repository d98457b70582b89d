use super::*;

#[test]
fn approval_resolves_exactly_once() {
    let mut a = Approval::pending(1, 3, "call_1", "command", "git push", 100);
    assert!(a.is_pending());
    a.resolve(ApprovalChoice::Approve, None, 200).unwrap();
    assert_eq!(a.status, ApprovalStatus::Approve);
    assert_eq!(a.resolved_at, Some(200));
    assert_eq!(
        a.resolve(ApprovalChoice::Reject, None, 300),
        Err(AlreadyResolved { id: 1 })
    );
    assert_eq!(a.status, ApprovalStatus::Approve);
}

#[test]
fn modify_is_a_terminal_status_with_guidance() {
    let mut a = Approval::pending(2, 3, "call_2", "command", "rm -rf build", 100);
    a.resolve(ApprovalChoice::Modify, Some("use cargo clean".to_string()), 150).unwrap();
    assert_eq!(a.status, ApprovalStatus::Modify);
    assert_eq!(a.response.as_deref(), Some("use cargo clean"));
}

#[test]
fn question_answers_exactly_once() {
    let mut q = Question::pending(1, 3, "call_q", "which file?", 100);
    q.answer_with("foo.txt", 120).unwrap();
    assert_eq!(q.status, QuestionStatus::Answered);
    assert_eq!(q.answer.as_deref(), Some("foo.txt"));
    assert!(q.answer_with("bar.txt", 130).is_err());
    assert_eq!(q.answer.as_deref(), Some("foo.txt"));
}

#[test]
fn choice_parses_case_insensitively() {
    assert_eq!("approve".parse::<ApprovalChoice>().unwrap(), ApprovalChoice::Approve);
    assert_eq!("MODIFY".parse::<ApprovalChoice>().unwrap(), ApprovalChoice::Modify);
    assert!("yes".parse::<ApprovalChoice>().is_err());
}

#[test]
fn choice_serializes_uppercase() {
    let json = serde_json::to_string(&ApprovalChoice::Approve).unwrap();
    assert_eq!(json, "\"APPROVE\"");
}
