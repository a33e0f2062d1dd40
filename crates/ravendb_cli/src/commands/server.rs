//! Run-server command implementation.

use super::CommandResult;
use ravendb_testdriver::{EnvServerLocator, TestServer};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Starts a server in memory and keeps it running until Ctrl-C.
pub async fn run(server_path: PathBuf, host: String, https: bool, timeout: u64) -> CommandResult {
    let locator = EnvServerLocator::new(server_path)
        .with_host(host)
        .with_https_enabled(https);

    let server = TestServer::start(&locator, Duration::from_secs(timeout)).await?;
    println!("Server available on: {}", server.url());
    println!("Press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!(url = %server.url(), "stopping server");
    server.stop().await?;
    Ok(())
}
