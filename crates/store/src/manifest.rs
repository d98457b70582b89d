//! The `{apiVersion, kind, metadata, spec}` record envelope.
//!
//! Session and template files wear this envelope on disk. Unknown keys at
//! the document and metadata levels are preserved across read-modify-write
//! cycles through flattened catch-all maps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const API_VERSION: &str = "daemon/v1";
pub const KIND_AGENT: &str = "Agent";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest<T> {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub spec: T,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl<T> Manifest<T> {
    /// Wrap a record as an `Agent` document.
    pub fn agent(name: impl Into<String>, spec: T) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND_AGENT.to_string(),
            metadata: Metadata { name: name.into(), ..Metadata::default() },
            spec,
            extra: IndexMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
