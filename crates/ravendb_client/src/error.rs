//! Error types for the client.

use thiserror::Error;

/// Result type for client operations.
pub type RavenResult<T> = Result<T, RavenError>;

/// Errors that can occur while talking to the server.
#[derive(Debug, Error)]
pub enum RavenError {
    /// An argument failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not permitted in the current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The document store was used before `initialize()`.
    #[error(
        "You cannot open a session or access the database commands before initializing the document store. Did you forget calling initialize()?"
    )]
    NotInitialized,

    /// The document store was closed.
    #[error("The document store has already been disposed and cannot be used")]
    Disposed,

    /// Network or transport error while reaching a node.
    #[error("transport error on {url}: {message}")]
    Transport {
        /// Node URL.
        url: String,
        /// Error message.
        message: String,
        /// Whether another node may succeed.
        retryable: bool,
    },

    /// Every node failed with a retryable error.
    #[error("all nodes failed: {}", summarize_failures(.failures))]
    AllNodesFailed {
        /// `(node url, error)` for each failed attempt.
        failures: Vec<(String, String)>,
    },

    /// The server answered with an error.
    #[error("server error {status} ({error_type}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server exception name.
        error_type: String,
        /// Server message.
        message: String,
    },

    /// The target database does not exist.
    #[error("database does not exist: {0}")]
    DatabaseDoesNotExist(String),

    /// The target index does not exist.
    #[error("index does not exist: {0}")]
    IndexDoesNotExist(String),

    /// A change vector did not match the stored revision.
    #[error("concurrency violation: {0}")]
    Concurrency(String),

    /// The server rejected the client's credentials.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// JSON conversion of an entity failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A wire message could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ravendb_protocol::ProtocolError),
}

fn summarize_failures(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(url, err)| format!("{url}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl RavenError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Returns true if the request may succeed against another node.
    pub fn is_retryable(&self) -> bool {
        match self {
            RavenError::Transport { retryable, .. } => *retryable,
            RavenError::Server { status, .. } => *status == 503,
            _ => false,
        }
    }
}
