//! Request executor: node selection, failover and error mapping.

use super::client::{HttpClient, HttpRequest, HttpResponse};
use crate::config::RetryConfig;
use crate::error::{RavenError, RavenResult};
use ravendb_protocol::{ServerErrorBody, WireMessage, CLIENT_VERSION};
use reqwest::Url;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A node the executor can send requests to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerNode {
    /// Base URL of the node, without a trailing `/`.
    pub url: String,
    /// Database addressed through this node, `None` for server-level requests.
    pub database: Option<String>,
}

impl ServerNode {
    /// Creates a node.
    pub fn new(url: impl Into<String>, database: Option<String>) -> Self {
        Self {
            url: url.into(),
            database,
        }
    }

    /// Builds a server-level endpoint URL from path segments.
    pub fn endpoint(&self, segments: &[&str]) -> RavenResult<Url> {
        let mut url = Url::parse(&self.url).map_err(|e| {
            RavenError::invalid_argument(format!("The url '{}' is not valid: {e}", self.url))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                RavenError::invalid_argument(format!("The url '{}' cannot be a base", self.url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Builds a `/databases/{db}/...` endpoint URL.
    pub fn database_endpoint(&self, segments: &[&str]) -> RavenResult<Url> {
        let database = self.database.as_deref().ok_or_else(|| {
            RavenError::invalid_operation("this request requires a database but none was selected")
        })?;
        let mut all = Vec::with_capacity(segments.len() + 2);
        all.push("databases");
        all.push(database);
        all.extend_from_slice(segments);
        self.endpoint(&all)
    }
}

/// A request/response pair understood by the [`RequestExecutor`].
pub trait RavenCommand: Send + Sync {
    /// Parsed result.
    type Output: Send;

    /// Builds the HTTP request for a node.
    fn create_request(&self, node: &ServerNode) -> RavenResult<HttpRequest>;

    /// Parses a successful (2xx) response.
    fn parse_response(&self, response: HttpResponse) -> RavenResult<Self::Output>;

    /// Handles a `404` response.
    fn on_not_found(&self, response: &HttpResponse) -> RavenResult<Self::Output> {
        Err(error_from_response(404, response))
    }
}

/// Executes commands against one database (or the server) with failover.
///
/// Nodes are tried in order starting from the last node that answered.
/// Transport failures and `503` responses move on to the next node; every
/// other error is returned immediately.
pub struct RequestExecutor {
    database: Option<String>,
    nodes: Vec<ServerNode>,
    client: Arc<dyn HttpClient>,
    retry: RetryConfig,
    preferred: AtomicUsize,
    disposed: Arc<AtomicBool>,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("database", &self.database)
            .field("nodes", &self.nodes)
            .field("preferred", &self.preferred.load(Ordering::Relaxed))
            .finish()
    }
}

impl RequestExecutor {
    /// Creates an executor over the given URLs.
    pub fn new(
        urls: &[String],
        database: Option<String>,
        client: Arc<dyn HttpClient>,
        retry: RetryConfig,
    ) -> Self {
        Self::with_disposed_flag(urls, database, client, retry, Arc::new(AtomicBool::new(false)))
    }

    pub(crate) fn with_disposed_flag(
        urls: &[String],
        database: Option<String>,
        client: Arc<dyn HttpClient>,
        retry: RetryConfig,
        disposed: Arc<AtomicBool>,
    ) -> Self {
        let nodes = urls
            .iter()
            .map(|url| ServerNode::new(url.clone(), database.clone()))
            .collect();
        Self {
            database,
            nodes,
            client,
            retry,
            preferred: AtomicUsize::new(0),
            disposed,
        }
    }

    /// Returns the database this executor targets.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Returns the configured nodes.
    pub fn nodes(&self) -> &[ServerNode] {
        &self.nodes
    }

    /// Returns the node that will be tried first, if any are configured.
    pub fn preferred_node(&self) -> Option<&ServerNode> {
        self.nodes.get(self.preferred.load(Ordering::SeqCst))
    }

    /// Executes a command.
    pub async fn execute<C: RavenCommand>(&self, command: &C) -> RavenResult<C::Output> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(RavenError::Disposed);
        }
        if self.nodes.is_empty() {
            return Err(RavenError::invalid_operation("no nodes configured"));
        }

        let mut failures = Vec::new();
        for round in 0..self.retry.rounds.max(1) {
            let wait = self.retry.backoff_before(round);
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }

            let start = self.preferred.load(Ordering::SeqCst);
            for offset in 0..self.nodes.len() {
                let index = (start + offset) % self.nodes.len();
                let node = &self.nodes[index];

                match self.execute_on_node(node, command).await {
                    Ok(output) => {
                        if index != start {
                            info!(url = %node.url, "switched preferred node");
                            self.preferred.store(index, Ordering::SeqCst);
                        }
                        return Ok(output);
                    }
                    Err(err) if err.is_retryable() => {
                        warn!(url = %node.url, round, error = %err, "request failed, trying next node");
                        failures.push((node.url.clone(), err.to_string()));
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Err(RavenError::AllNodesFailed { failures })
    }

    async fn execute_on_node<C: RavenCommand>(
        &self,
        node: &ServerNode,
        command: &C,
    ) -> RavenResult<C::Output> {
        let request = command
            .create_request(node)?
            .with_header("Raven-Client-Version", CLIENT_VERSION);

        debug!(method = ?request.method, url = %request.url, "sending request");

        let response = self
            .client
            .send(request)
            .await
            .map_err(|e| RavenError::Transport {
                url: node.url.clone(),
                message: e.message,
                retryable: e.retryable,
            })?;

        debug!(status = response.status, "received response");

        match response.status {
            200..=299 => command.parse_response(response),
            404 => command.on_not_found(&response),
            status => Err(error_from_response(status, &response)),
        }
    }
}

/// Maps an error response to a [`RavenError`].
pub(crate) fn error_from_response(status: u16, response: &HttpResponse) -> RavenError {
    let body = ServerErrorBody::from_json_slice(&response.body)
        .unwrap_or_else(|_| ServerErrorBody::new("", response.text()));

    match body.short_type() {
        "DatabaseDoesNotExistException" => return RavenError::DatabaseDoesNotExist(body.message),
        "IndexDoesNotExistException" => return RavenError::IndexDoesNotExist(body.message),
        "ConcurrencyException" => return RavenError::Concurrency(body.message),
        _ => {}
    }

    match status {
        404 => RavenError::not_found(body.message),
        409 => RavenError::Concurrency(body.message),
        401 | 403 => RavenError::Authorization(body.message),
        _ => RavenError::Server {
            status,
            error_type: body.error_type,
            message: body.message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, TransportError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Fails for hosts listed in `down`, answers `200 {"ok": host}` otherwise.
    struct FlakyClient {
        down: Vec<String>,
        unavailable: Vec<String>,
        seen: Mutex<Vec<String>>,
    }

    impl FlakyClient {
        fn new(down: &[&str], unavailable: &[&str]) -> Self {
            Self {
                down: down.iter().map(|s| s.to_string()).collect(),
                unavailable: unavailable.iter().map(|s| s.to_string()).collect(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for FlakyClient {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let host = request.url.host_str().unwrap_or_default().to_string();
            self.seen.lock().push(host.clone());
            if self.down.contains(&host) {
                return Err(TransportError::retryable("connection refused"));
            }
            if self.unavailable.contains(&host) {
                return Ok(HttpResponse::json(
                    503,
                    &ServerErrorBody::new("ServiceUnavailable", "busy"),
                ));
            }
            Ok(HttpResponse::json(200, &json!({ "ok": host })))
        }
    }

    struct Ping;

    impl RavenCommand for Ping {
        type Output = String;

        fn create_request(&self, node: &ServerNode) -> RavenResult<HttpRequest> {
            Ok(HttpRequest::new(Method::Get, node.endpoint(&["ping"])?))
        }

        fn parse_response(&self, response: HttpResponse) -> RavenResult<String> {
            let value: serde_json::Value = response.json_body()?;
            Ok(value["ok"].as_str().unwrap_or_default().to_string())
        }
    }

    fn urls(hosts: &[&str]) -> Vec<String> {
        hosts.iter().map(|h| format!("http://{h}:8080")).collect()
    }

    #[test]
    fn database_endpoint_encodes_segments() {
        let node = ServerNode::new("http://a:8080", Some("North wind".into()));
        let url = node.database_endpoint(&["docs"]).unwrap();
        assert_eq!(url.as_str(), "http://a:8080/databases/North%20wind/docs");

        let server = ServerNode::new("http://a:8080", None);
        assert!(server.database_endpoint(&["docs"]).is_err());
        assert_eq!(
            server.endpoint(&["admin", "databases"]).unwrap().path(),
            "/admin/databases"
        );
    }

    #[tokio::test]
    async fn fails_over_to_next_node() {
        let client = Arc::new(FlakyClient::new(&["a"], &[]));
        let executor = RequestExecutor::new(
            &urls(&["a", "b"]),
            Some("db".into()),
            client.clone(),
            RetryConfig::no_retry(),
        );

        assert_eq!(executor.execute(&Ping).await.unwrap(), "b");
        assert_eq!(executor.preferred_node().unwrap().url, "http://b:8080");

        // Preferred node is tried first afterwards.
        executor.execute(&Ping).await.unwrap();
        assert_eq!(*client.seen.lock(), vec!["a", "b", "b"]);
    }

    #[tokio::test]
    async fn service_unavailable_fails_over() {
        let client = Arc::new(FlakyClient::new(&[], &["a"]));
        let executor =
            RequestExecutor::new(&urls(&["a", "b"]), None, client, RetryConfig::no_retry());
        assert_eq!(executor.execute(&Ping).await.unwrap(), "b");
    }

    #[tokio::test]
    async fn all_nodes_failed_reports_each_node() {
        let client = Arc::new(FlakyClient::new(&["a", "b"], &[]));
        let executor =
            RequestExecutor::new(&urls(&["a", "b"]), None, client, RetryConfig::no_retry());

        match executor.execute(&Ping).await {
            Err(RavenError::AllNodesFailed { failures }) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].0, "http://a:8080");
                assert_eq!(failures[1].0, "http://b:8080");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn executor_without_nodes() {
        let executor = RequestExecutor::new(
            &[],
            None,
            Arc::new(FlakyClient::new(&[], &[])),
            RetryConfig::no_retry(),
        );
        assert!(executor.preferred_node().is_none());
        assert!(matches!(
            executor.execute(&Ping).await,
            Err(RavenError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn disposed_executor_rejects_requests() {
        let disposed = Arc::new(AtomicBool::new(true));
        let executor = RequestExecutor::with_disposed_flag(
            &urls(&["a"]),
            None,
            Arc::new(FlakyClient::new(&[], &[])),
            RetryConfig::no_retry(),
            disposed,
        );
        assert!(matches!(executor.execute(&Ping).await, Err(RavenError::Disposed)));
    }

    #[test]
    fn maps_error_bodies() {
        let response = HttpResponse::json(
            503,
            &ServerErrorBody::new(
                "Raven.Client.Exceptions.Database.DatabaseDoesNotExistException",
                "Database 'x' does not exist",
            ),
        );
        assert!(matches!(
            error_from_response(503, &response),
            RavenError::DatabaseDoesNotExist(_)
        ));

        let response = HttpResponse::json(409, &ServerErrorBody::new("Whatever", "cv mismatch"));
        assert!(matches!(
            error_from_response(409, &response),
            RavenError::Concurrency(_)
        ));

        let mut response = HttpResponse::new(500);
        response.body = b"plain failure".to_vec();
        match error_from_response(500, &response) {
            RavenError::Server { status, message, .. } => {
                assert_eq!(status, 500);
                assert_eq!(message, "plain failure");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let response = HttpResponse::json(403, &ServerErrorBody::new("", "forbidden"));
        assert!(matches!(
            error_from_response(403, &response),
            RavenError::Authorization(_)
        ));
    }
}
