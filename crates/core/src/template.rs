//! Declarative blueprint from which sessions are instantiated.
//! Read-only at runtime.

use crate::model::ModelRef;
use crate::session::ToolSelector;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub model: ModelRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSelector>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
    /// May contain template markers rendered once in the child's environment.
    #[serde(default)]
    pub system_prompt: String,
}
