//! Child-executed tools and the child registry.

mod ask;
mod send;
mod shell;

pub use ask::HumanAsk;
pub use send::SessionSend;
pub use shell::ShellExecute;

use crate::context::ChildCtx;
use berth_tools::{catalog, Registry};
use std::sync::Arc;

/// The child's registry: the full builtin catalog, with handlers attached
/// for the tools that run in this process.
pub fn child_registry() -> Registry<ChildCtx> {
    let mut registry = Registry::new();
    for def in catalog::builtin_defs() {
        let handler: Option<Arc<dyn berth_tools::ToolHandler<ChildCtx>>> =
            match def.name.as_str() {
                "shell__execute" => Some(Arc::new(ShellExecute)),
                "human__ask" => Some(Arc::new(HumanAsk)),
                "session__send" => Some(Arc::new(SessionSend)),
                _ => None,
            };
        registry.register(def, handler);
    }
    registry
}
