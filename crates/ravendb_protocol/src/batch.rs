//! Batch commands sent to `/bulk_docs`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a batched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchCommandType {
    /// Create or replace a document.
    Put,
    /// Delete a document.
    Delete,
}

/// A single command inside a batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchCommandData {
    /// Target document id.
    pub id: String,
    /// Expected change vector, `None` to skip the concurrency check.
    #[serde(default)]
    pub change_vector: Option<String>,
    /// Document body (with `@metadata`) for `PUT` commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    /// Command kind.
    #[serde(rename = "Type")]
    pub command_type: BatchCommandType,
}

impl BatchCommandData {
    /// Creates a `PUT` command.
    pub fn put(id: impl Into<String>, change_vector: Option<String>, document: Value) -> Self {
        Self {
            id: id.into(),
            change_vector,
            document: Some(document),
            command_type: BatchCommandType::Put,
        }
    }

    /// Creates a `DELETE` command.
    pub fn delete(id: impl Into<String>, change_vector: Option<String>) -> Self {
        Self {
            id: id.into(),
            change_vector,
            document: None,
            command_type: BatchCommandType::Delete,
        }
    }
}

/// Body of a `POST /databases/{db}/bulk_docs` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct BatchRequest {
    /// Commands executed atomically by the server.
    pub commands: Vec<BatchCommandData>,
}

/// Per-command result of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Command kind.
    #[serde(rename = "Type")]
    pub command_type: BatchCommandType,
    /// Final document id (server-assigned ids are resolved here).
    #[serde(rename = "@id")]
    pub id: String,
    /// Collection of a stored document.
    #[serde(rename = "@collection", default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Change vector of a stored document.
    #[serde(rename = "@change-vector", default, skip_serializing_if = "Option::is_none")]
    pub change_vector: Option<String>,
    /// Last modification timestamp of a stored document.
    #[serde(rename = "@last-modified", default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Whether a delete removed an existing document.
    #[serde(rename = "Deleted", default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

/// Body of a batch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct BatchResponse {
    /// Results in command order.
    pub results: Vec<BatchResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WireMessage;
    use serde_json::json;

    #[test]
    fn put_command_wire_shape() {
        let cmd = BatchCommandData::put("users/1-A", None, json!({ "name": "Alice" }));
        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["Id"], "users/1-A");
        assert_eq!(value["Type"], "PUT");
        assert_eq!(value["ChangeVector"], Value::Null);
        assert_eq!(value["Document"]["name"], "Alice");
    }

    #[test]
    fn delete_command_omits_document() {
        let cmd = BatchCommandData::delete("users/1-A", Some("A:1-x".into()));
        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["Type"], "DELETE");
        assert_eq!(value["ChangeVector"], "A:1-x");
        assert!(value.get("Document").is_none());
    }

    #[test]
    fn decodes_server_results() {
        let body = br#"{"Results":[
            {"Type":"PUT","@id":"users/1-A","@collection":"Users","@change-vector":"A:3-db","@last-modified":"2024-01-01T00:00:00.0000000Z"},
            {"Type":"DELETE","@id":"users/2-A","Deleted":true}
        ]}"#;
        let response = BatchResponse::from_json_slice(body).unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].command_type, BatchCommandType::Put);
        assert_eq!(response.results[0].change_vector.as_deref(), Some("A:3-db"));
        assert_eq!(response.results[1].deleted, Some(true));
    }
}
