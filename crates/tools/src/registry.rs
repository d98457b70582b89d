//! Tool definitions, the registry, and command resolution.
//!
//! Definitions are shared by host and child; handlers are attached per
//! process over that process's context type `C`. Resolution is
//! deterministic: alias scan in registration order first, then the
//! longest `__`-glued canonical name that exists.

use crate::argv::split_argv;
use async_trait::async_trait;
use berth_core::{ExternalData, Outcome, ToolContext};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Metadata flags steering routing and visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolMeta {
    /// Must run in the host context (credentials, signals, container control).
    pub requires_host_execution: bool,
    /// Never offered to the LLM; usable only from the CLI/human channel.
    pub human_only: bool,
    /// Even with a current session, execute on the host (forces session 0).
    pub local_command: bool,
}

/// A successful alias resolution: canonical name plus structured args.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasMatch {
    pub name: String,
    pub args: Value,
}

/// Alias resolver over raw argv tokens. First registered truthy match wins.
pub type AliasFn = fn(&[String]) -> Option<AliasMatch>;

/// A tool definition. Canonical names are `plugin__area__action`.
#[derive(Clone)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    /// JSON schema of the parameters object.
    pub parameters: Value,
    /// Parameter names filled from positional CLI tokens, in order. The
    /// last name absorbs any remaining tokens.
    pub positional: Vec<String>,
    pub meta: ToolMeta,
    pub alias: Option<AliasFn>,
}

impl ToolDef {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            positional: Vec::new(),
            meta: ToolMeta::default(),
            alias: None,
        }
    }

    pub fn positional(mut self, names: &[&str]) -> Self {
        self.positional = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn host_execution(mut self) -> Self {
        self.meta.requires_host_execution = true;
        self
    }

    pub fn human_only(mut self) -> Self {
        self.meta.human_only = true;
        self
    }

    pub fn local_command(mut self) -> Self {
        self.meta.local_command = true;
        self
    }

    pub fn alias(mut self, alias: AliasFn) -> Self {
        self.alias = Some(alias);
        self
    }

    /// Schema shape offered to the LLM.
    pub fn schema(&self) -> berth_core::ToolSchema {
        berth_core::ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

/// One suspended-or-immediate tool invocation, as handed to a handler.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub args: Value,
    /// Tool-private state from a previous `Running` outcome, `Null` on the
    /// first invocation.
    pub state: Value,
    /// Injected approval/answer data, if any arrived while suspended.
    pub external: Option<ExternalData>,
    pub context: ToolContext,
}

impl Invocation {
    pub fn first(args: Value, context: ToolContext) -> Self {
        Self { args, state: Value::Null, external: None, context }
    }

    /// String argument accessor with a typed failure message.
    pub fn str_arg(&self, key: &str) -> Result<String, String> {
        self.args
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| format!("missing required argument {key:?}"))
    }
}

/// Per-process tool execution hook.
#[async_trait]
pub trait ToolHandler<C>: Send + Sync {
    async fn execute(&self, ctx: &C, invocation: Invocation) -> Outcome;
}

/// Where an invocation must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Host,
    Child(u64),
}

/// The routing decision for one invocation.
pub fn route_for(meta: &ToolMeta, session_id: u64) -> Route {
    if meta.local_command || session_id == 0 || meta.requires_host_execution {
        Route::Host
    } else {
        Route::Child(session_id)
    }
}

/// Who is asking for the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Human,
    Model,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("command not found: {input}")]
    CommandNotFound { input: String },

    #[error("alias resolved to unknown tool {name}")]
    UnknownAlias { name: String },

    #[error("tool {name} is not available to the model")]
    HumanOnly { name: String },
}

struct Registration<C> {
    def: ToolDef,
    handler: Option<Arc<dyn ToolHandler<C>>>,
}

/// Name → tool mapping with registration-order alias scans.
pub struct Registry<C> {
    tools: Vec<Registration<C>>,
    index: HashMap<String, usize>,
}

/// A resolved command: definition, per-process handler (if attached), and
/// structured args. A missing handler where one is needed is
/// "command not found".
pub struct Resolved<'r, C> {
    pub def: &'r ToolDef,
    pub handler: Option<Arc<dyn ToolHandler<C>>>,
    pub args: Value,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Registry<C> {
    pub fn new() -> Self {
        Self { tools: Vec::new(), index: HashMap::new() }
    }

    /// Register a definition, optionally with this process's handler.
    /// Re-registering a name replaces the previous entry in place.
    pub fn register(&mut self, def: ToolDef, handler: Option<Arc<dyn ToolHandler<C>>>) {
        match self.index.get(&def.name) {
            Some(&i) => self.tools[i] = Registration { def, handler },
            None => {
                self.index.insert(def.name.clone(), self.tools.len());
                self.tools.push(Registration { def, handler });
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.index.get(name).map(|&i| &self.tools[i].def)
    }

    pub fn handler(&self, name: &str) -> Option<Arc<dyn ToolHandler<C>>> {
        self.index.get(name).and_then(|&i| self.tools[i].handler.clone())
    }

    pub fn defs(&self) -> impl Iterator<Item = &ToolDef> {
        self.tools.iter().map(|r| &r.def)
    }

    /// Definition lookup that enforces the human-only guard for the model.
    pub fn get_for(&self, name: &str, origin: Origin) -> Result<&ToolDef, RegistryError> {
        let def = self
            .get(name)
            .ok_or_else(|| RegistryError::CommandNotFound { input: name.to_string() })?;
        if def.meta.human_only && origin == Origin::Model {
            return Err(RegistryError::HumanOnly { name: name.to_string() });
        }
        Ok(def)
    }

    /// Resolve a command string.
    ///
    /// 1. Tokenize (quotes respected, trailing flow-style arg kept whole).
    /// 2. Alias resolvers in registration order; first match wins.
    /// 3. Glue argv tokens with `__` and retry the lookup:
    ///    `shell exec foo` → `shell`, `shell__exec`, `shell__exec__foo`;
    ///    the longest concatenation that exists wins, remaining tokens
    ///    become positional args.
    pub fn resolve(&self, command: &str) -> Result<Resolved<'_, C>, RegistryError> {
        let argv = split_argv(command);
        if argv.is_empty() {
            return Err(RegistryError::CommandNotFound { input: command.to_string() });
        }

        for reg in &self.tools {
            let Some(alias) = reg.def.alias else { continue };
            if let Some(m) = alias(&argv) {
                let target = self
                    .index
                    .get(&m.name)
                    .map(|&i| &self.tools[i])
                    .ok_or(RegistryError::UnknownAlias { name: m.name })?;
                return Ok(Resolved {
                    def: &target.def,
                    handler: target.handler.clone(),
                    args: m.args,
                });
            }
        }

        let mut glued = String::new();
        let mut best: Option<(usize, usize)> = None;
        for (consumed, token) in argv.iter().enumerate() {
            if consumed > 0 {
                glued.push_str("__");
            }
            glued.push_str(token);
            if let Some(&i) = self.index.get(&glued) {
                best = Some((i, consumed));
            }
        }

        if let Some((i, consumed)) = best {
            let reg = &self.tools[i];
            let args = positional_args(&reg.def, &argv[consumed + 1..]);
            return Ok(Resolved { def: &reg.def, handler: reg.handler.clone(), args });
        }

        Err(RegistryError::CommandNotFound { input: command.to_string() })
    }
}

/// Map leftover argv tokens onto the definition's positional parameter
/// names. The last name absorbs the remainder; a single trailing JSON
/// object token is parsed as the whole argument object instead.
fn positional_args(def: &ToolDef, rest: &[String]) -> Value {
    if rest.len() == 1 && (rest[0].starts_with('{')) {
        if let Ok(parsed) = serde_json::from_str::<Value>(&rest[0]) {
            return parsed;
        }
    }

    let mut args = serde_json::Map::new();
    for (i, name) in def.positional.iter().enumerate() {
        if i >= rest.len() {
            break;
        }
        let value = if i + 1 == def.positional.len() {
            rest[i..].join(" ")
        } else {
            rest[i].clone()
        };
        args.insert(name.clone(), json!(value));
    }
    Value::Object(args)
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
