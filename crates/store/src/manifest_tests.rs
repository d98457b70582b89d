use super::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Spec {
    value: u32,
}

#[test]
fn agent_envelope_has_fixed_version_and_kind() {
    let m = Manifest::agent("echo", Spec { value: 1 });
    let yaml = serde_yaml::to_string(&m).unwrap();
    assert!(yaml.contains("apiVersion: daemon/v1"));
    assert!(yaml.contains("kind: Agent"));
    assert!(yaml.contains("name: echo"));
}

#[test]
fn unknown_keys_survive_read_modify_write() {
    let yaml = "\
apiVersion: daemon/v1
kind: Agent
futureTopLevel: keep-me
metadata:
  name: echo
  annotation: preserved
spec:
  value: 1
";
    let mut m: Manifest<Spec> = serde_yaml::from_str(yaml).unwrap();
    m.spec.value = 2;
    let rewritten = serde_yaml::to_string(&m).unwrap();
    assert!(rewritten.contains("futureTopLevel: keep-me"));
    assert!(rewritten.contains("annotation: preserved"));
    assert!(rewritten.contains("value: 2"));
}

#[test]
fn multi_line_strings_round_trip() {
    let m = Manifest::agent("echo", serde_yaml::Value::String("line one\nline two\n".into()));
    let yaml = serde_yaml::to_string(&m).unwrap();
    let back: Manifest<serde_yaml::Value> = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back.spec, m.spec);
}
