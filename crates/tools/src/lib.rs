// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! berth-tools: tool catalog, command resolution, and allowlist gating.
//!
//! A tool is a named definition (JSON-schema parameters, metadata flags,
//! optional CLI alias) plus, per process, an attached handler. The registry
//! resolves CLI command strings and LLM tool names to definitions; the
//! allowlist decides whether shell-like commands run, pause for approval,
//! or fail.

pub mod allowlist;
pub mod argv;
pub mod catalog;
pub mod registry;
pub mod subcommands;

pub use allowlist::{Allowlist, Decision, RuleValue};
pub use argv::split_argv;
pub use registry::{
    route_for, AliasMatch, Invocation, Origin, Registry, RegistryError, Resolved, Route,
    ToolDef, ToolHandler, ToolMeta,
};
pub use subcommands::split_subcommands;
