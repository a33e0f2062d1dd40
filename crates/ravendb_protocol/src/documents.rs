//! Single-document endpoint payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a `GET /databases/{db}/docs` response.
///
/// `results` keeps the order of the requested ids; missing documents are
/// `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct GetDocumentsResult {
    /// Requested documents.
    pub results: Vec<Value>,
    /// Included documents keyed by id.
    #[serde(default)]
    pub includes: Map<String, Value>,
}

/// Body of a `PUT /databases/{db}/docs` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutResult {
    /// Stored document id.
    pub id: String,
    /// Change vector of the stored revision.
    pub change_vector: String,
}
