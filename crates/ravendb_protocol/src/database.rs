//! Database administration and statistics payloads.

use crate::index::{IndexLockMode, IndexPriority};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of a `PUT /admin/databases` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseRecord {
    /// Database name.
    pub database_name: String,
    /// Whether the database starts disabled.
    #[serde(default)]
    pub disabled: bool,
    /// Database-level settings.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl DatabaseRecord {
    /// Creates a record for the given database name.
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            ..Self::default()
        }
    }
}

/// Body of a create-database response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateDatabaseResult {
    /// Database name.
    pub name: String,
    /// Raft index of the cluster command.
    #[serde(default)]
    pub raft_command_index: u64,
    /// Nodes hosting the new database.
    #[serde(default)]
    pub nodes_added_to: Vec<String>,
}

/// Body of a `DELETE /admin/databases` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteDatabasesRequest {
    /// Databases to delete.
    pub database_names: Vec<String>,
    /// Remove data files as well.
    pub hard_delete: bool,
    /// Restrict the deletion to these nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_nodes: Option<Vec<String>>,
}

/// Body of a delete-databases response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteDatabaseResult {
    /// Raft index of the cluster command.
    #[serde(default)]
    pub raft_command_index: u64,
    /// Databases still being removed.
    #[serde(default)]
    pub pending_deletes: Vec<String>,
}

/// Summary of one index in [`DatabaseStatistics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexInformation {
    /// Index name.
    pub name: String,
    /// Whether the index lags behind the documents.
    #[serde(default)]
    pub is_stale: bool,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: IndexPriority,
    /// Replacement policy.
    #[serde(default)]
    pub lock_mode: IndexLockMode,
}

/// Body of a `GET /databases/{db}/stats` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseStatistics {
    /// Number of documents.
    pub count_of_documents: u64,
    /// Number of indexes.
    pub count_of_indexes: u64,
    /// Database id.
    #[serde(default)]
    pub database_id: String,
    /// Per-index summaries.
    #[serde(default)]
    pub indexes: Vec<IndexInformation>,
}

impl DatabaseStatistics {
    /// Returns the names of stale indexes.
    pub fn stale_indexes(&self) -> Vec<&str> {
        self.indexes
            .iter()
            .filter(|i| i.is_stale)
            .map(|i| i.name.as_str())
            .collect()
    }
}

/// Response of endpoints that start a server-side operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct OperationIdResult {
    /// Server operation id.
    pub operation_id: u64,
    /// Node running the operation.
    #[serde(default)]
    pub operation_node_tag: Option<String>,
}
