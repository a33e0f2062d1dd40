//! Document metadata keys.
//!
//! Every stored document carries an `@metadata` object. The client reads the
//! id, collection and change vector from it and writes the collection and the
//! Rust type name into it.

use serde_json::{Map, Value};

/// Key of the metadata object inside a document.
pub const METADATA: &str = "@metadata";
/// Document id.
pub const ID: &str = "@id";
/// Collection the document belongs to.
pub const COLLECTION: &str = "@collection";
/// Change vector of the stored revision.
pub const CHANGE_VECTOR: &str = "@change-vector";
/// Last modification timestamp.
pub const LAST_MODIFIED: &str = "@last-modified";
/// Short Rust type name of the entity that produced the document.
pub const RAVEN_RUST_TYPE: &str = "Raven-Rust-Type";
/// Collection used for documents without a type.
pub const EMPTY_COLLECTION: &str = "@empty";
/// Pseudo-collection covering every document.
pub const ALL_DOCUMENTS_COLLECTION: &str = "@all_docs";

/// Returns the metadata object of a document, if present.
pub fn metadata_of(document: &Map<String, Value>) -> Option<&Map<String, Value>> {
    document.get(METADATA).and_then(Value::as_object)
}

/// Returns a string entry of the document's metadata.
pub fn metadata_str<'a>(document: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    metadata_of(document)
        .and_then(|m| m.get(key))
        .and_then(Value::as_str)
}

/// Splits a document into its body and metadata.
///
/// The returned body no longer contains `@metadata`.
pub fn split_metadata(mut document: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let metadata = match document.remove(METADATA) {
        Some(Value::Object(m)) => m,
        _ => Map::new(),
    };
    (document, metadata)
}
