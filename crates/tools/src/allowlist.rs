//! Command allowlist: pattern → rule mapping deciding whether a shell-like
//! command may run without human approval.
//!
//! A pattern is a literal (token-prefix or base-name match) or a
//! `/regex/flags` form. A rule is `true`, `false`, or
//! `{approve, matchCommandLine}`. A command line is approved iff no
//! matching rule denies any sub-command or the full line, AND either every
//! sub-command is approved by some rule or the full line is approved by a
//! `matchCommandLine` rule. Any deny short-circuits.

use crate::subcommands::split_subcommands;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One rule value as written in the allowlist file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Flag(bool),
    Detailed {
        approve: bool,
        #[serde(rename = "matchCommandLine", default)]
        match_command_line: bool,
    },
}

impl RuleValue {
    fn approve(self) -> bool {
        match self {
            Self::Flag(v) => v,
            Self::Detailed { approve, .. } => approve,
        }
    }

    fn match_command_line(self) -> bool {
        match self {
            Self::Flag(_) => false,
            Self::Detailed { match_command_line, .. } => match_command_line,
        }
    }
}

/// Outcome of an allowlist check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approved,
    /// A deny rule matched; carries the matched pattern as the reason.
    Denied { rule: String },
    /// No rule approved the command; caller escalates to a human.
    Unmatched,
}

#[derive(Debug, thiserror::Error)]
pub enum AllowlistError {
    #[error("invalid regex pattern {pattern}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unreadable allowlist {path}: {reason}")]
    Unreadable { path: std::path::PathBuf, reason: String },
}

enum Matcher {
    Literal(String),
    Regex(regex::Regex),
}

struct Rule {
    pattern: String,
    matcher: Matcher,
    value: RuleValue,
}

impl Rule {
    fn matches(&self, target: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(re) => re.is_match(target),
            Matcher::Literal(lit) => literal_matches(lit, target),
        }
    }
}

/// Literal patterns match as a token prefix (`git push` matches
/// `git push origin`) or as the base-name of the first token (`rm`
/// matches `/bin/rm -rf`). `rm` does not match `rmdir`.
fn literal_matches(pattern: &str, target: &str) -> bool {
    let pat: Vec<&str> = pattern.split_whitespace().collect();
    let tgt: Vec<&str> = target.split_whitespace().collect();
    if pat.is_empty() || tgt.len() < pat.len() {
        return false;
    }
    if pat.iter().zip(&tgt).all(|(p, t)| p == t) {
        return true;
    }
    pat.len() == 1
        && Path::new(tgt[0])
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|base| base == pat[0])
}

/// Parse a `/body/flags` pattern into a regex, applying `i`/`s`/`x` flags.
fn parse_regex(pattern: &str) -> Option<Result<regex::Regex, regex::Error>> {
    let rest = pattern.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let (body, flags) = rest.split_at(close);
    let flags = &flags[1..];
    let mut inline = String::new();
    for f in flags.chars() {
        match f {
            'i' | 's' | 'x' | 'm' => inline.push(f),
            _ => return Some(Err(regex::Error::Syntax(format!("unsupported flag {f:?}")))),
        }
    }
    let source = if inline.is_empty() {
        body.to_string()
    } else {
        format!("(?{inline}){body}")
    };
    Some(regex::Regex::new(&source))
}

#[derive(Default)]
pub struct Allowlist {
    rules: Vec<Rule>,
}

impl Allowlist {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Build from an ordered pattern → rule mapping.
    pub fn from_rules(map: IndexMap<String, RuleValue>) -> Result<Self, AllowlistError> {
        let mut rules = Vec::with_capacity(map.len());
        for (pattern, value) in map {
            let matcher = match parse_regex(&pattern) {
                Some(Ok(re)) => Matcher::Regex(re),
                Some(Err(source)) => {
                    return Err(AllowlistError::InvalidRegex { pattern, source })
                }
                None => Matcher::Literal(pattern.clone()),
            };
            rules.push(Rule { pattern, matcher, value });
        }
        Ok(Self { rules })
    }

    /// Load the YAML mapping at `path`; a missing file is an empty list.
    pub fn load(path: &Path) -> Result<Self, AllowlistError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::empty()),
            Err(e) => {
                return Err(AllowlistError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        };
        let map: IndexMap<String, RuleValue> = serde_yaml::from_str(&text).map_err(|e| {
            AllowlistError::Unreadable { path: path.to_path_buf(), reason: e.to_string() }
        })?;
        Self::from_rules(map)
    }

    /// Build from a per-session option map (JSON values from the session's
    /// tool selector).
    pub fn from_json(value: &serde_json::Value) -> Result<Self, AllowlistError> {
        let Some(obj) = value.as_object() else { return Ok(Self::empty()) };
        let mut map = IndexMap::new();
        for (pattern, v) in obj {
            let rule: RuleValue = serde_json::from_value(v.clone()).map_err(|e| {
                AllowlistError::Unreadable {
                    path: std::path::PathBuf::from("<session allowlist>"),
                    reason: e.to_string(),
                }
            })?;
            map.insert(pattern.clone(), rule);
        }
        Self::from_rules(map)
    }

    /// Patterns whose rule approves — listed in unattended failures.
    pub fn approved_patterns(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|r| r.value.approve())
            .map(|r| r.pattern.as_str())
            .collect()
    }

    /// Evaluate one command line.
    pub fn check(&self, line: &str) -> Decision {
        let subs = split_subcommands(line);

        // Any matching deny rule rejects immediately.
        for rule in &self.rules {
            if rule.value.approve() {
                continue;
            }
            let denied = if rule.value.match_command_line() {
                rule.matches(line)
            } else {
                subs.iter().any(|s| rule.matches(s))
            };
            if denied {
                return Decision::Denied { rule: rule.pattern.clone() };
            }
        }

        let full_line_approved = self
            .rules
            .iter()
            .any(|r| r.value.approve() && r.value.match_command_line() && r.matches(line));

        let every_sub_approved = !subs.is_empty()
            && subs.iter().all(|s| {
                self.rules
                    .iter()
                    .any(|r| r.value.approve() && !r.value.match_command_line() && r.matches(s))
            });

        if full_line_approved || every_sub_approved {
            Decision::Approved
        } else {
            Decision::Unmatched
        }
    }
}

#[cfg(test)]
#[path = "allowlist_tests.rs"]
mod tests;
