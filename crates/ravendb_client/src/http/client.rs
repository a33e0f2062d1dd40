//! HTTP request/response types and client implementations.

use crate::config::AuthOptions;
use crate::error::{RavenError, RavenResult};
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `PUT`
    Put,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

/// An outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: Url,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request without headers or body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON body and the matching content type.
    pub fn with_json_body<T: Serialize + ?Sized>(mut self, body: &T) -> RavenResult<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self.with_header("Content-Type", "application/json; charset=utf-8"))
    }

    /// Returns the value of a header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first value of a query parameter.
    pub fn query_value(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Returns every value of a repeated query parameter.
    pub fn query_values(&self, key: &str) -> Vec<String> {
        self.url
            .query_pairs()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    /// Decodes the JSON body.
    pub fn json_body<T: DeserializeOwned>(&self) -> RavenResult<T> {
        let body = self.body.as_deref().unwrap_or(b"null");
        Ok(serde_json::from_slice(body)?)
    }
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with an empty body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Creates a response with a JSON body.
    pub fn json<T: Serialize + ?Sized>(status: u16, body: &T) -> Self {
        let mut response = Self::new(status);
        response.body = serde_json::to_vec(body).unwrap_or_default();
        response
            .headers
            .push(("Content-Type".into(), "application/json; charset=utf-8".into()));
        response
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the value of a header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Decodes the JSON body.
    pub fn json_body<T: DeserializeOwned>(&self) -> RavenResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failure to obtain any response from a node.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Error message.
    pub message: String,
    /// Whether another node may succeed.
    pub retryable: bool,
}

impl TransportError {
    /// Creates a retryable transport error.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to route requests through a different HTTP stack or
/// directly into an in-process server.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response, whatever its status.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`HttpClient`] backed by `reqwest` with rustls.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Creates a client with the given timeout and optional client certificate.
    pub fn new(timeout: Duration, auth: Option<&AuthOptions>) -> RavenResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(timeout).use_rustls_tls();

        if let Some(auth) = auth {
            let identity = reqwest::Identity::from_pem(&auth.certificate_pem).map_err(|e| {
                RavenError::invalid_argument(format!("invalid client certificate: {e}"))
            })?;
            builder = builder.identity(identity);

            if let Some(ca) = &auth.trusted_ca_pem {
                let certificate = reqwest::Certificate::from_pem(ca).map_err(|e| {
                    RavenError::invalid_argument(format!("invalid CA certificate: {e}"))
                })?;
                builder = builder.add_root_certificate(certificate);
            }
        }

        let client = builder
            .build()
            .map_err(|e| RavenError::invalid_argument(format!("failed to build http client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method.into(), request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| TransportError {
            message: e.to_string(),
            retryable: e.is_connect() || e.is_timeout() || e.is_request(),
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::retryable(format!("failed to read body: {e}")))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
