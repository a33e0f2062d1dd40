//! Error types for the test driver.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for test driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors that can occur while locating or running a server.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The locator is not configured.
    #[error("server locator is not configured: {0}")]
    NotConfigured(String),

    /// The server binary does not exist.
    #[error("Server file was not found: {}", .0.display())]
    ServerNotFound(PathBuf),

    /// The server process could not be spawned.
    #[error("failed to start server process: {0}")]
    Spawn(#[from] std::io::Error),

    /// The server did not report its URL in time.
    #[error("server did not start within {0:?}")]
    StartupTimeout(Duration),

    /// The server exited before reporting its URL.
    #[error("server exited before startup completed: {0}")]
    ServerExited(String),

    /// A client call against the server failed.
    #[error("client error: {0}")]
    Client(#[from] ravendb_client::RavenError),
}
