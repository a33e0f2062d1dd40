//! Ready-made stores for tests.

use crate::in_memory::InMemoryServer;
use ravendb_client::http::LoopbackClient;
use ravendb_client::{DocumentConventions, DocumentStore, RavenResult};
use std::sync::Arc;

/// URL the loopback stores are configured with.
pub const LOOPBACK_URL: &str = "http://localhost:8080";

/// Creates an in-memory server holding `database` and an initialized store
/// connected to it.
pub fn in_memory_store(database: &str) -> RavenResult<(Arc<InMemoryServer>, DocumentStore)> {
    in_memory_store_with(database, DocumentConventions::default())
}

/// Like [`in_memory_store`] with custom conventions.
pub fn in_memory_store_with(
    database: &str,
    conventions: DocumentConventions,
) -> RavenResult<(Arc<InMemoryServer>, DocumentStore)> {
    let server = Arc::new(InMemoryServer::with_database(database));
    let store = connect(&server, database, conventions)?;
    Ok((server, store))
}

/// Creates an initialized store talking to an existing in-memory server.
pub fn connect(
    server: &Arc<InMemoryServer>,
    database: &str,
    conventions: DocumentConventions,
) -> RavenResult<DocumentStore> {
    let mut store = DocumentStore::new([LOOPBACK_URL], database)?;
    store.set_conventions(conventions)?;
    store.set_http_client(Arc::new(LoopbackClient::new(Arc::clone(server))))?;
    store.initialize()?;
    Ok(store)
}
