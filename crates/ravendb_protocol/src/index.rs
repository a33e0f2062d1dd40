//! Index definitions and index endpoint payloads.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Scheduling priority of an index on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IndexPriority {
    /// Indexed after everything else.
    Low,
    /// Default priority.
    #[default]
    Normal,
    /// Indexed first.
    High,
}

/// Whether an index definition may be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IndexLockMode {
    /// Definition can be replaced.
    #[default]
    Unlock,
    /// Replacements are silently ignored.
    LockedIgnore,
    /// Replacements fail.
    LockedError,
}

/// Server-side definition of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct IndexDefinition {
    /// Index name, e.g. `Users/ByName`.
    pub name: String,
    /// Map functions.
    pub maps: BTreeSet<String>,
    /// Optional reduce function.
    #[serde(default)]
    pub reduce: Option<String>,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: IndexPriority,
    /// Replacement policy.
    #[serde(default)]
    pub lock_mode: IndexLockMode,
    /// Index-level configuration overrides.
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
}

impl IndexDefinition {
    /// Creates a definition with a single map.
    pub fn new(name: impl Into<String>, map: impl Into<String>) -> Self {
        let mut maps = BTreeSet::new();
        maps.insert(map.into());
        Self {
            name: name.into(),
            maps,
            ..Self::default()
        }
    }

    /// Returns true if the index has a reduce function.
    pub fn is_map_reduce(&self) -> bool {
        self.reduce.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}

/// Body of a `PUT /databases/{db}/admin/indexes` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct PutIndexesRequest {
    /// Definitions to create or replace.
    pub indexes: Vec<IndexDefinition>,
}

/// Result of storing one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutIndexResult {
    /// Index name.
    pub index: String,
    /// Raft index of the cluster command.
    #[serde(default)]
    pub raft_command_index: u64,
}

/// Body of a put-indexes response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct PutIndexesResponse {
    /// One result per stored index.
    pub results: Vec<PutIndexResult>,
}

/// Body of a `GET /databases/{db}/indexes?namesOnly=true` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct IndexNamesResult {
    /// Index names.
    pub results: Vec<String>,
}
