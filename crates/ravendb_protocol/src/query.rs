//! Query request and response payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a `POST /databases/{db}/queries` request.
///
/// `query` is RQL text; values are never inlined and are passed through
/// `query_parameters` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct IndexQuery {
    /// RQL text.
    pub query: String,
    /// Named parameters referenced as `$name` in the query.
    #[serde(default)]
    pub query_parameters: Map<String, Value>,
    /// Number of results to skip.
    #[serde(default)]
    pub start: usize,
    /// Maximum number of results, `None` for the server default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Block until the index has caught up.
    #[serde(default)]
    pub wait_for_non_stale_results: bool,
    /// Timeout for non-stale waits, formatted as `hh:mm:ss`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_non_stale_results_timeout: Option<String>,
}

impl IndexQuery {
    /// Creates a query without parameters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// Body of a query response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct QueryResult {
    /// Matching documents, each carrying `@metadata`.
    pub results: Vec<Value>,
    /// Included documents keyed by id.
    #[serde(default)]
    pub includes: Map<String, Value>,
    /// Number of matches before paging.
    #[serde(default)]
    pub total_results: u64,
    /// Results skipped by the server.
    #[serde(default)]
    pub skipped_results: u64,
    /// Whether the answering index was stale.
    #[serde(default)]
    pub is_stale: bool,
    /// Index that answered the query.
    #[serde(default)]
    pub index_name: String,
}
