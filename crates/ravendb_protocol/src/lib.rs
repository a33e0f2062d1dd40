//! # RavenDB Protocol
//!
//! Wire types for the RavenDB REST API.
//!
//! This crate provides:
//! - Document metadata keys and helpers
//! - Batch command payloads (`PUT` / `DELETE`) and their results
//! - Index queries and query results
//! - Index definitions
//! - HiLo range allocation messages
//! - Database records, statistics and server error bodies
//!
//! This is a pure protocol crate with no I/O operations. Every message is
//! plain `serde` data encoded as JSON by [`WireMessage`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod database;
mod documents;
mod error;
mod hilo;
mod index;
pub mod metadata;
mod query;

pub use batch::{BatchCommandData, BatchCommandType, BatchRequest, BatchResponse, BatchResult};
pub use database::{
    CreateDatabaseResult, DatabaseRecord, DatabaseStatistics, DeleteDatabaseResult,
    DeleteDatabasesRequest, IndexInformation, OperationIdResult,
};
pub use documents::{GetDocumentsResult, PutResult};
pub use error::{ProtocolError, ProtocolResult, ServerErrorBody};
pub use hilo::HiLoResult;
pub use index::{
    IndexDefinition, IndexLockMode, IndexNamesResult, IndexPriority, PutIndexResult,
    PutIndexesRequest, PutIndexesResponse,
};
pub use query::{IndexQuery, QueryResult};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Client version reported in the `Raven-Client-Version` header.
pub const CLIENT_VERSION: &str = "5.4.0";

/// JSON encoding shared by every protocol message.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Encodes the message to JSON bytes.
    fn to_json_bytes(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes the message from JSON bytes.
    fn from_json_slice(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl<T: Serialize + DeserializeOwned> WireMessage for T {}
