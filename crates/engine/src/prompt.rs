//! One-time system-prompt rendering.
//!
//! Templates may carry `{env.VAR}` and `{host.name}` markers. They are
//! rendered exactly once, in the child's environment, so values reflect
//! the sandbox rather than the host. Unknown markers are left untouched.

/// Render all recognized markers in `template`.
pub fn render_system_prompt(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find('}') {
            Some(end) => {
                let marker = &tail[1..end];
                match resolve_marker(marker) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&tail[..=end]),
                }
                rest = &tail[end + 1..];
            }
            None => {
                out.push_str(tail);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_marker(marker: &str) -> Option<String> {
    if let Some(var) = marker.strip_prefix("env.") {
        return Some(std::env::var(var).unwrap_or_default());
    }
    if marker == "host.name" {
        return Some(hostname());
    }
    None
}

/// The sandbox hostname: `$HOSTNAME`, then the kernel's record, then a
/// fixed fallback.
fn hostname() -> String {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.is_empty() {
            return name;
        }
    }
    if let Ok(name) = std::fs::read_to_string("/proc/sys/kernel/hostname") {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    "localhost".to_string()
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
