//! A running test server.

use crate::error::{DriverError, DriverResult};
use crate::locator::ServerLocator;
use crate::runner::RavenServerRunner;
use ravendb_client::operations::CreateDatabaseOperation;
use ravendb_client::protocol::DatabaseRecord;
use ravendb_client::DocumentStore;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout};
use tracing::{debug, info, warn};

/// Line printed by the server once it accepts requests.
pub const SERVER_AVAILABLE_PREFIX: &str = "Server available on: ";

/// A server process started for tests.
///
/// The process is killed on [`TestServer::stop`] or when dropped.
#[derive(Debug)]
pub struct TestServer {
    child: Child,
    url: String,
}

impl TestServer {
    /// Starts a server and waits until it reports its URL.
    pub async fn start(locator: &dyn ServerLocator, timeout: Duration) -> DriverResult<Self> {
        let mut child = RavenServerRunner::run(locator)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DriverError::ServerExited("stdout is not captured".into()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(line = %line, "server error output");
                }
            });
        }

        let mut lines = BufReader::new(stdout).lines();
        let wait = wait_for_url(&mut lines);

        let url = match tokio::time::timeout(timeout, wait).await {
            Ok(Ok(url)) => url,
            Ok(Err(err)) => {
                let _ = child.kill().await;
                return Err(err);
            }
            Err(_) => {
                warn!(?timeout, "server did not report its url");
                let _ = child.kill().await;
                return Err(DriverError::StartupTimeout(timeout));
            }
        };

        // The server keeps logging; closing the pipe would kill it.
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(line = %line, "server output");
            }
        });

        info!(%url, "server started");
        Ok(Self { child, url })
    }

    /// Returns the URL the server listens on.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the process id, if still running.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Creates `database` on the server and returns an initialized store
    /// pointing at it.
    pub async fn document_store(&self, database: &str) -> DriverResult<DocumentStore> {
        let mut store = DocumentStore::new([self.url.as_str()], database)?;
        store.initialize()?;
        store
            .maintenance()?
            .server()
            .send(&CreateDatabaseOperation::new(DatabaseRecord::new(database)))
            .await?;
        Ok(store)
    }

    /// Kills the server and waits for it to exit.
    pub async fn stop(mut self) -> DriverResult<()> {
        self.child.kill().await?;
        info!(url = %self.url, "server stopped");
        Ok(())
    }
}

async fn wait_for_url(lines: &mut Lines<BufReader<ChildStdout>>) -> DriverResult<String> {
    let mut output = Vec::new();
    while let Some(line) = lines.next_line().await? {
        debug!(line = %line, "server output");
        if let Some(url) = parse_server_url(&line) {
            return Ok(url);
        }
        output.push(line);
    }
    Err(DriverError::ServerExited(output.join("\n")))
}

fn parse_server_url(line: &str) -> Option<String> {
    let index = line.find(SERVER_AVAILABLE_PREFIX)?;
    let url = line[index + SERVER_AVAILABLE_PREFIX.len()..].trim();
    (!url.is_empty()).then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_startup_line() {
        assert_eq!(
            parse_server_url("Server available on: http://127.0.0.1:49152").as_deref(),
            Some("http://127.0.0.1:49152")
        );
        assert_eq!(
            parse_server_url("  Server available on: https://a.example:8085  ").as_deref(),
            Some("https://a.example:8085")
        );
        assert!(parse_server_url("Tcp listening on 127.0.0.1:38888").is_none());
        assert!(parse_server_url("Server available on: ").is_none());
    }
}
