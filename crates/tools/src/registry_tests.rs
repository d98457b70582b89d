use super::*;
use serde_json::json;

struct NoCtx;

fn def(name: &str) -> ToolDef {
    ToolDef::new(name, "", json!({"type": "object", "properties": {}}))
}

fn registry(defs: Vec<ToolDef>) -> Registry<NoCtx> {
    let mut r = Registry::new();
    for d in defs {
        r.register(d, None);
    }
    r
}

fn ls_alias(argv: &[String]) -> Option<AliasMatch> {
    (argv[0] == "ls").then(|| AliasMatch { name: "session__list".to_string(), args: json!({}) })
}

fn greedy_alias(argv: &[String]) -> Option<AliasMatch> {
    (argv[0] == "ls").then(|| AliasMatch { name: "other__list".to_string(), args: json!({}) })
}

#[test]
fn alias_scan_prefers_registration_order() {
    let r = registry(vec![
        def("session__list").alias(ls_alias),
        def("other__list").alias(greedy_alias),
    ]);
    assert_eq!(r.resolve("ls").unwrap().def.name, "session__list");

    let r = registry(vec![
        def("other__list").alias(greedy_alias),
        def("session__list").alias(ls_alias),
    ]);
    assert_eq!(r.resolve("ls").unwrap().def.name, "other__list");
}

#[test]
fn gluing_prefers_the_longest_existing_name() {
    let r = registry(vec![def("shell__exec"), def("shell__exec__foo")]);
    // Both `shell__exec` and `shell__exec__foo` exist — the longest
    // concatenation wins.
    let resolved = r.resolve("shell exec foo").unwrap();
    assert_eq!(resolved.def.name, "shell__exec__foo");

    // Tokens past the longest match stay positional.
    let r = registry(vec![
        def("shell__exec").positional(&["command"]),
        def("shell__exec__foo").positional(&["arg"]),
    ]);
    let resolved = r.resolve("shell exec foo bar").unwrap();
    assert_eq!(resolved.def.name, "shell__exec__foo");
    assert_eq!(resolved.args, json!({"arg": "bar"}));

    // With no longer name registered, the shorter one still resolves.
    let r = registry(vec![def("shell__exec").positional(&["command"])]);
    let resolved = r.resolve("shell exec foo").unwrap();
    assert_eq!(resolved.def.name, "shell__exec");
    assert_eq!(resolved.args, json!({"command": "foo"}));
}

#[test]
fn remaining_tokens_become_positional_args() {
    let r = registry(vec![def("session__send").positional(&["session", "text"])]);
    let resolved = r.resolve("session send 3 hello world").unwrap();
    assert_eq!(resolved.args, json!({"session": "3", "text": "hello world"}));
}

#[test]
fn trailing_json_object_becomes_the_argument_object() {
    let r = registry(vec![def("shell__execute").positional(&["command"])]);
    let resolved = r.resolve("shell execute {\"command\": \"ls /tmp\"}").unwrap();
    assert_eq!(resolved.args, json!({"command": "ls /tmp"}));
}

#[test]
fn unknown_command_is_not_found() {
    let r = registry(vec![def("session__list")]);
    assert!(matches!(
        r.resolve("bogus thing"),
        Err(RegistryError::CommandNotFound { .. })
    ));
}

#[test]
fn alias_to_unknown_tool_is_reported() {
    let r = registry(vec![def("only__this").alias(ls_alias)]);
    assert!(matches!(r.resolve("ls"), Err(RegistryError::UnknownAlias { .. })));
}

#[test]
fn human_only_tools_are_hidden_from_the_model() {
    let r = registry(vec![def("session__new").human_only()]);
    assert!(r.get_for("session__new", Origin::Human).is_ok());
    assert!(matches!(
        r.get_for("session__new", Origin::Model),
        Err(RegistryError::HumanOnly { .. })
    ));
}

#[test]
fn routing_decision_table() {
    let plain = ToolMeta::default();
    let host = ToolMeta { requires_host_execution: true, ..ToolMeta::default() };
    let local = ToolMeta { local_command: true, ..ToolMeta::default() };

    assert_eq!(route_for(&plain, 3), Route::Child(3));
    assert_eq!(route_for(&plain, 0), Route::Host);
    assert_eq!(route_for(&host, 3), Route::Host);
    assert_eq!(route_for(&local, 3), Route::Host);
}

#[test]
fn reregistering_a_name_replaces_in_place() {
    let mut r: Registry<NoCtx> = Registry::new();
    r.register(def("a__b"), None);
    r.register(def("a__b").human_only(), None);
    assert!(r.get("a__b").unwrap().meta.human_only);
    assert_eq!(r.defs().count(), 1);
}
