//! Commands sent through the [`RequestExecutor`](crate::http::RequestExecutor).
//!
//! Each command builds one request and parses one response. Sessions and
//! operations compose them; they can also be executed directly.

mod batch;
mod documents;
mod hilo;
mod query;

pub use batch::BatchCommand;
pub use documents::GetDocumentsCommand;
pub use hilo::NextHiLoCommand;
pub use query::QueryCommand;
