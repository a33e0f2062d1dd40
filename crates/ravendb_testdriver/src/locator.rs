//! Where to find the server binary.

use crate::error::{DriverError, DriverResult};
use std::env;
use std::path::PathBuf;

/// Environment variable holding the server binary path.
pub const SERVER_PATH_ENV: &str = "RAVENDB_TEST_SERVER_PATH";
/// Environment variable holding the host to bind.
pub const SERVER_HOST_ENV: &str = "RAVENDB_TEST_SERVER_HOST";
/// Environment variable enabling HTTPS (`true`/`1`).
pub const SERVER_HTTPS_ENV: &str = "RAVENDB_TEST_SERVER_HTTPS";

/// Describes how to launch a test server.
pub trait ServerLocator: Send + Sync {
    /// Path of the server binary.
    fn server_path(&self) -> DriverResult<PathBuf>;

    /// Program to execute. Defaults to the server binary itself.
    fn command(&self) -> DriverResult<PathBuf> {
        self.server_path()
    }

    /// Extra arguments appended after the standard ones.
    fn command_arguments(&self) -> Vec<String> {
        Vec::new()
    }

    /// Host the server binds to.
    fn server_host(&self) -> String {
        "127.0.0.1".to_string()
    }

    /// Whether the server listens on HTTPS.
    fn with_https(&self) -> bool {
        false
    }
}

/// Locator configured through environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvServerLocator {
    server_path: Option<PathBuf>,
    host: Option<String>,
    https: bool,
    arguments: Vec<String>,
}

impl EnvServerLocator {
    /// Reads `RAVENDB_TEST_SERVER_PATH`, `RAVENDB_TEST_SERVER_HOST` and
    /// `RAVENDB_TEST_SERVER_HTTPS`.
    pub fn from_env() -> Self {
        Self {
            server_path: env::var_os(SERVER_PATH_ENV)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            host: env::var(SERVER_HOST_ENV).ok().filter(|h| !h.is_empty()),
            https: env::var(SERVER_HTTPS_ENV)
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            arguments: Vec::new(),
        }
    }

    /// Creates a locator for an explicit binary path.
    pub fn new(server_path: impl Into<PathBuf>) -> Self {
        Self {
            server_path: Some(server_path.into()),
            ..Self::default()
        }
    }

    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Enables HTTPS.
    pub fn with_https_enabled(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    /// Appends an extra server argument.
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Returns true if a server path is configured.
    pub fn is_configured(&self) -> bool {
        self.server_path.is_some()
    }
}

impl ServerLocator for EnvServerLocator {
    fn server_path(&self) -> DriverResult<PathBuf> {
        self.server_path.clone().ok_or_else(|| {
            DriverError::NotConfigured(format!(
                "set {SERVER_PATH_ENV} to the path of the server binary"
            ))
        })
    }

    fn command_arguments(&self) -> Vec<String> {
        self.arguments.clone()
    }

    fn server_host(&self) -> String {
        self.host.clone().unwrap_or_else(|| "127.0.0.1".to_string())
    }

    fn with_https(&self) -> bool {
        self.https
    }
}
