use super::*;

#[test]
fn env_markers_render_from_the_child_environment() {
    std::env::set_var("BERTH_PROMPT_TEST_VAR", "sandbox-7");
    let out = render_system_prompt("workspace: {env.BERTH_PROMPT_TEST_VAR}.");
    assert_eq!(out, "workspace: sandbox-7.");
}

#[test]
fn unset_env_markers_render_empty() {
    std::env::remove_var("BERTH_PROMPT_TEST_MISSING");
    let out = render_system_prompt("[{env.BERTH_PROMPT_TEST_MISSING}]");
    assert_eq!(out, "[]");
}

#[test]
fn host_name_marker_renders_something() {
    let out = render_system_prompt("on {host.name}!");
    assert!(out.starts_with("on "));
    assert!(out.ends_with('!'));
    assert!(!out.contains("{host.name}"));
}

#[test]
fn unknown_markers_are_left_verbatim() {
    let out = render_system_prompt("keep {jinja.style} and {braces");
    assert_eq!(out, "keep {jinja.style} and {braces");
}
