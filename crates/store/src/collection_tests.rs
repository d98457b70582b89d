use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Doc {
    text: String,
}

fn doc(text: &str) -> Doc {
    Doc { text: text.to_string() }
}

fn open(dir: &TempDir) -> Collection<Doc> {
    Collection::new(dir.path().join("docs"))
}

#[test]
fn set_is_memory_only_until_save() {
    let tmp = TempDir::new().unwrap();
    let mut c = open(&tmp);
    c.set("1", doc("a"));
    assert!(!c.dir().join("1.yml").exists());
    assert_eq!(c.get("1").unwrap(), Some(doc("a")));

    c.save().unwrap();
    assert!(c.dir().join("1.yml").exists());
}

#[test]
fn get_rereads_after_external_rewrite() {
    let tmp = TempDir::new().unwrap();
    let mut c = open(&tmp);
    c.set("1", doc("old"));
    c.save().unwrap();
    assert_eq!(c.get("1").unwrap(), Some(doc("old")));

    // Another process rewrites the file with a newer mtime.
    std::thread::sleep(Duration::from_millis(20));
    std::fs::write(c.dir().join("1.yml"), "text: new\n").unwrap();

    assert_eq!(c.get("1").unwrap(), Some(doc("new")), "newer mtime forces a re-read");
}

#[test]
fn dirty_records_shadow_disk_until_saved() {
    let tmp = TempDir::new().unwrap();
    let mut c = open(&tmp);
    c.set("1", doc("disk"));
    c.save().unwrap();

    c.set("1", doc("memory"));
    std::thread::sleep(Duration::from_millis(20));
    std::fs::write(c.dir().join("1.yml"), "text: external\n").unwrap();
    assert_eq!(c.get("1").unwrap(), Some(doc("memory")));
}

#[test]
fn delete_is_immediate_in_memory_and_removes_file_on_save() {
    let tmp = TempDir::new().unwrap();
    let mut c = open(&tmp);
    c.set("1", doc("a"));
    c.save().unwrap();

    c.delete("1");
    assert_eq!(c.get("1").unwrap(), None);
    assert!(c.dir().join("1.yml").exists(), "file lives until save");

    c.save().unwrap();
    assert!(!c.dir().join("1.yml").exists());
}

#[test]
fn list_scans_the_directory_not_the_cache() {
    let tmp = TempDir::new().unwrap();
    let mut c = open(&tmp);
    c.set("2", doc("b"));
    c.save().unwrap();

    // A record written by another process, never loaded here.
    std::fs::write(c.dir().join("1.yml"), "text: a\n").unwrap();
    std::fs::write(c.dir().join("notes.txt"), "ignored").unwrap();

    assert_eq!(c.list().unwrap(), vec!["1".to_string(), "2".to_string()]);
}

#[test]
fn list_of_missing_directory_is_empty() {
    let tmp = TempDir::new().unwrap();
    let c: Collection<Doc> = Collection::new(tmp.path().join("nowhere"));
    assert!(c.list().unwrap().is_empty());
}

#[test]
fn corrupt_record_is_treated_as_absent() {
    let tmp = TempDir::new().unwrap();
    let mut c = open(&tmp);
    std::fs::create_dir_all(c.dir()).unwrap();
    std::fs::write(c.dir().join("1.yml"), "text: [unclosed\n").unwrap();
    assert_eq!(c.get("1").unwrap(), None);
}

#[test]
fn save_is_idempotent_and_preserves_mtimes() {
    let tmp = TempDir::new().unwrap();
    let mut c = open(&tmp);
    c.set("1", doc("a"));
    c.save().unwrap();
    let mtime = std::fs::metadata(c.dir().join("1.yml")).unwrap().modified().unwrap();

    std::thread::sleep(Duration::from_millis(20));
    c.save().unwrap();
    let after = std::fs::metadata(c.dir().join("1.yml")).unwrap().modified().unwrap();
    assert_eq!(mtime, after, "no-op save must not touch files");
    assert!(!c.is_dirty());
}

#[test]
fn get_all_includes_unsaved_records() {
    let tmp = TempDir::new().unwrap();
    let mut c = open(&tmp);
    c.set("1", doc("saved"));
    c.save().unwrap();
    c.set("2", doc("pending"));

    let all = c.get_all().unwrap();
    assert_eq!(
        all,
        vec![("1".to_string(), doc("saved")), ("2".to_string(), doc("pending"))]
    );
}

#[test]
fn load_all_forces_a_full_refresh() {
    let tmp = TempDir::new().unwrap();
    let mut c = open(&tmp);
    c.set("1", doc("a"));
    c.save().unwrap();

    std::thread::sleep(Duration::from_millis(20));
    std::fs::write(c.dir().join("1.yml"), "text: rewritten\n").unwrap();
    c.load_all().unwrap();
    assert_eq!(c.get("1").unwrap(), Some(doc("rewritten")));
}
