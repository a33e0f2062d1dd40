//! Document store lifecycle and request executor failover.

use async_trait::async_trait;
use ravendb_client::http::{
    HttpClient, HttpRequest, HttpResponse, LoopbackServer, TransportError,
};
use ravendb_client::{
    AuthOptions, DocumentConventions, DocumentStore, RavenError, RetryConfig,
};
use ravendb_testdriver::prelude::*;
use serde_json::json;
use std::sync::Arc;

#[test]
fn rejects_invalid_urls() {
    let err = DocumentStore::new(["http://localhost:8080", ""], "db").unwrap_err();
    assert!(matches!(err, RavenError::InvalidArgument(_)));
    assert!(err.to_string().contains("url index: 1"));

    assert!(DocumentStore::new(["ftp://localhost"], "db").is_err());
    assert!(DocumentStore::new(["not a url"], "db").is_err());
}

#[test]
fn strips_trailing_slash() {
    let store = DocumentStore::new(["http://localhost:8080/"], "db").unwrap();
    assert_eq!(store.urls(), ["http://localhost:8080".to_string()]);
}

#[test]
fn default_identifier_lists_urls_and_database() {
    let store = DocumentStore::new(["http://a:8080", "http://b:8080"], "Northwind").unwrap();
    assert_eq!(
        store.identifier().unwrap(),
        "http://a:8080,http://b:8080 (DB: Northwind)"
    );
}

#[test]
fn sessions_require_initialization() {
    let store = DocumentStore::new(["http://localhost:8080"], "db").unwrap();
    let err = store.open_session().unwrap_err();
    assert!(matches!(err, RavenError::NotInitialized));
    assert!(err.to_string().contains("Did you forget calling initialize()?"));
}

#[test]
fn initialize_requires_urls() {
    let mut store = DocumentStore::default();
    assert!(store.initialize().is_err());
    assert!(!store.is_initialized());
}

#[test]
fn setters_fail_after_initialization() {
    let (_server, mut store) = in_memory_store("db").unwrap();
    assert!(store.is_initialized());

    assert!(matches!(
        store.set_database("other"),
        Err(RavenError::InvalidOperation(_))
    ));
    assert!(store.set_urls(["http://localhost:9090"]).is_err());
    assert!(store.set_conventions(DocumentConventions::new()).is_err());
    assert!(store.conventions_mut().is_err());
    assert!(store.set_identifier("x").is_err());
}

#[test]
fn initialize_is_idempotent() {
    let (_server, mut store) = in_memory_store("db").unwrap();
    store.initialize().unwrap();
    assert!(store.is_initialized());
}

#[test]
fn certificate_requires_https() {
    let mut store = DocumentStore::new(["http://localhost:8080"], "db").unwrap();
    store
        .set_auth_options(AuthOptions::new(b"-----BEGIN CERTIFICATE-----".to_vec()))
        .unwrap();
    let err = store.initialize().unwrap_err();
    assert!(matches!(err, RavenError::InvalidOperation(_)));
    assert!(err.to_string().contains("is using HTTP"));
}

#[test]
fn session_without_database_fails() {
    let server = Arc::new(InMemoryServer::new());
    let mut store = DocumentStore::default();
    store.set_urls([ravendb_testdriver::fixtures::LOOPBACK_URL]).unwrap();
    store
        .set_http_client(Arc::new(ravendb_client::http::LoopbackClient::new(server)))
        .unwrap();
    store.initialize().unwrap();

    assert!(matches!(
        store.open_session(),
        Err(RavenError::InvalidOperation(_))
    ));
}

#[tokio::test]
async fn closed_store_rejects_work() {
    let (_server, store) = in_memory_store("db").unwrap();
    let mut session = store.open_session().unwrap();

    store.close();
    assert!(store.is_disposed());

    assert!(matches!(store.open_session(), Err(RavenError::Disposed)));
    let err = session.load::<serde_json::Value>("users/1").await.unwrap_err();
    assert!(matches!(err, RavenError::Disposed));

    store.close();
}

#[test]
fn request_executors_are_cached_per_database() {
    let (_server, store) = in_memory_store("db").unwrap();
    let a = store.request_executor(Some("Other")).unwrap();
    let b = store.request_executor(Some("other")).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let default = store.request_executor(None).unwrap();
    assert_eq!(default.database(), Some("db"));
}

/// Routes requests by host; hosts listed in `down` refuse connections.
struct RoutingClient {
    server: Arc<InMemoryServer>,
    down: Vec<&'static str>,
}

#[async_trait]
impl HttpClient for RoutingClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let host = request.url.host_str().unwrap_or_default();
        if self.down.contains(&host) {
            return Err(TransportError::retryable(format!("connection refused: {host}")));
        }
        Ok(self.server.handle(&request))
    }
}

fn routed_store(server: &Arc<InMemoryServer>, down: Vec<&'static str>) -> DocumentStore {
    let mut store = DocumentStore::new(["http://a:8080", "http://b:8080"], "db").unwrap();
    store
        .set_conventions(DocumentConventions::new().with_retry(RetryConfig::no_retry()))
        .unwrap();
    store
        .set_http_client(Arc::new(RoutingClient {
            server: Arc::clone(server),
            down,
        }))
        .unwrap();
    store.initialize().unwrap();
    store
}

#[tokio::test]
async fn fails_over_to_the_next_node() {
    let server = Arc::new(InMemoryServer::with_database("db"));
    let store = routed_store(&server, vec!["a"]);

    let mut session = store.open_session().unwrap();
    session
        .store_with_id(&json!({"name": "Ann"}), "people/1")
        .unwrap();
    session.save_changes().await.unwrap();

    assert_eq!(server.document_count("db"), 1);
    let executor = store.request_executor(None).unwrap();
    assert_eq!(executor.preferred_node().unwrap().url, "http://b:8080");
}

#[tokio::test]
async fn reports_every_failed_node() {
    let server = Arc::new(InMemoryServer::with_database("db"));
    let store = routed_store(&server, vec!["a", "b"]);

    let mut session = store.open_session().unwrap();
    let err = session.load::<serde_json::Value>("people/1").await.unwrap_err();
    match err {
        RavenError::AllNodesFailed { failures } => {
            let urls: Vec<&str> = failures.iter().map(|(url, _)| url.as_str()).collect();
            assert_eq!(urls, ["http://a:8080", "http://b:8080"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unavailable_node_is_retryable() {
    let server = Arc::new(InMemoryServer::with_database("db"));
    server.set_unavailable(true);
    let store = routed_store(&server, vec![]);

    let mut session = store.open_session().unwrap();
    let err = session.load::<serde_json::Value>("people/1").await.unwrap_err();
    assert!(matches!(err, RavenError::AllNodesFailed { .. }));
    assert_eq!(server.request_count(), 2);
}
