//! Loopback transport that routes requests to an in-process server.

use super::client::{HttpClient, HttpRequest, HttpResponse, TransportError};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for servers that can answer loopback requests.
pub trait LoopbackServer: Send + Sync {
    /// Handles a request and returns the response.
    fn handle(&self, request: &HttpRequest) -> HttpResponse;
}

/// A loopback HTTP client.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: Arc<S>,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: Arc<S>) -> Self {
        Self { server }
    }

    /// Returns the server behind this client.
    pub fn server(&self) -> &Arc<S> {
        &self.server
    }
}

#[async_trait]
impl<S: LoopbackServer + 'static> HttpClient for LoopbackClient<S> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Ok(self.server.handle(&request))
    }
}
