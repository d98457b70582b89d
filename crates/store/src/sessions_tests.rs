use super::*;
use berth_core::Session;
use tempfile::TempDir;

fn store(tmp: &TempDir) -> SessionStore {
    SessionStore::open(DbLayout::new(tmp.path())).unwrap()
}

fn session(id: u64) -> Session {
    Session::builder().id(id).name(format!("s{id}")).build()
}

#[test]
fn ids_start_at_one_in_an_empty_store() {
    let tmp = TempDir::new().unwrap();
    let mut s = store(&tmp);
    assert_eq!(s.generate_id(), 1);
    assert_eq!(s.generate_id(), 2);
}

#[test]
fn next_id_after_reopen_is_max_plus_one() {
    let tmp = TempDir::new().unwrap();
    {
        let mut s = store(&tmp);
        s.create(session(1)).unwrap();
        s.create(session(7)).unwrap();
    }
    let s = store(&tmp);
    assert_eq!(s.next_id(), 8);
}

#[test]
fn next_id_resets_after_clean() {
    let tmp = TempDir::new().unwrap();
    {
        let mut s = store(&tmp);
        s.create(session(3)).unwrap();
    }
    std::fs::remove_dir_all(tmp.path().join("db")).unwrap();
    let s = store(&tmp);
    assert_eq!(s.next_id(), 1);
}

#[test]
fn transition_persists_status_and_stamp() {
    let tmp = TempDir::new().unwrap();
    let mut s = store(&tmp);
    s.create(session(1)).unwrap();

    let (updated, record) = s
        .transition(1, berth_core::SessionAction::Start, 500)
        .unwrap();
    assert_eq!(updated.status, berth_core::SessionStatus::Running);
    assert_eq!(record.from, berth_core::SessionStatus::Pending);
    assert_eq!(record.at, 500);

    // A second store sees the change on disk.
    let mut other = store(&tmp);
    let reloaded = other.get(1).unwrap().unwrap();
    assert_eq!(reloaded.status, berth_core::SessionStatus::Running);
    assert_eq!(reloaded.last_transition, Some(record));
}

#[test]
fn invalid_transition_reports_and_does_not_mutate() {
    let tmp = TempDir::new().unwrap();
    let mut s = store(&tmp);
    s.create(session(1)).unwrap();

    let err = s.transition(1, berth_core::SessionAction::Complete, 500).unwrap_err();
    assert!(matches!(err, StoreError::InvalidTransition { id: 1, .. }));
    assert_eq!(s.get(1).unwrap().unwrap().status, berth_core::SessionStatus::Pending);
}

#[test]
fn soft_deleted_sessions_keep_their_file_and_leave_default_listings() {
    let tmp = TempDir::new().unwrap();
    let mut s = store(&tmp);
    s.create(session(1)).unwrap();
    s.create(session(2)).unwrap();
    s.soft_delete(1, 900).unwrap();

    assert!(tmp.path().join("db/sessions/1.yml").exists());
    let visible: Vec<u64> = s.list(false).unwrap().iter().map(|x| x.id).collect();
    assert_eq!(visible, [2]);
    let all: Vec<u64> = s.list(true).unwrap().iter().map(|x| x.id).collect();
    assert_eq!(all, [1, 2]);
}

#[test]
fn adopt_workspace_moves_the_record_exactly_once() {
    let tmp = TempDir::new().unwrap();
    let mut s = store(&tmp);
    s.create(session(4)).unwrap();
    s.adopt_workspace(4).unwrap();

    assert!(!tmp.path().join("db/sessions/4.yml").exists());
    let seeded = tmp.path().join("db/workspaces/4/db/sessions/4.yml");
    assert!(seeded.exists());

    // Still readable and transitionable through the store.
    let (updated, _) = s.transition(4, berth_core::SessionAction::Start, 1).unwrap();
    assert_eq!(updated.status, berth_core::SessionStatus::Running);
    assert_eq!(s.list_ids().unwrap(), vec![4]);

    // Adopting again is a no-op.
    s.adopt_workspace(4).unwrap();
    assert!(seeded.exists());
}

#[test]
fn workspace_resident_record_is_shared_with_a_child_store() {
    let tmp = TempDir::new().unwrap();
    let mut host = store(&tmp);
    host.create(session(5)).unwrap();
    host.adopt_workspace(5).unwrap();

    // The child opens the workspace as its own root.
    let mut child = SessionStore::open(DbLayout::new(tmp.path().join("db/workspaces/5"))).unwrap();
    let mut seen = child.get(5).unwrap().unwrap();
    assert_eq!(seen.name, "s5");

    // Child appends a message; host observes it on next read.
    seen.push_message(berth_core::ChatMessage::user("hi", 10));
    std::thread::sleep(std::time::Duration::from_millis(20));
    child.put(&seen).unwrap();
    let observed = host.get(5).unwrap().unwrap();
    assert_eq!(observed.messages.len(), 1);
}

#[test]
fn unknown_keys_in_session_files_survive_transitions() {
    let tmp = TempDir::new().unwrap();
    let mut s = store(&tmp);
    s.create(session(1)).unwrap();

    // Simulate an older/newer peer adding a top-level key.
    let path = tmp.path().join("db/sessions/1.yml");
    let mut text = std::fs::read_to_string(&path).unwrap();
    text.push_str("futureKey: kept\n");
    std::thread::sleep(std::time::Duration::from_millis(20));
    std::fs::write(&path, text).unwrap();

    s.transition(1, berth_core::SessionAction::Start, 2).unwrap();
    let rewritten = std::fs::read_to_string(&path).unwrap();
    assert!(rewritten.contains("futureKey: kept"));
}
