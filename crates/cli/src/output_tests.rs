use super::*;
use serde_json::json;

#[test]
fn arrays_of_objects_become_tables() {
    let value = json!([
        {"id": 1, "name": "echo-1", "status": "RUNNING"},
        {"id": 2, "name": "long-name-here", "status": "PAUSED"},
    ]);
    let (headers, rows) = table_rows(&value).unwrap();
    assert_eq!(headers, ["id", "name", "status"]);
    assert_eq!(rows[1], ["2", "long-name-here", "PAUSED"]);
}

#[test]
fn mixed_arrays_fall_back_to_json() {
    assert!(table_rows(&json!([1, 2, 3])).is_none());
    assert!(table_rows(&json!([{"a": 1}, "not an object"])).is_none());
    assert!(table_rows(&json!([])).is_none());
    assert!(table_rows(&json!({"not": "an array"})).is_none());
}
