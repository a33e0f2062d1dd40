//! Spawns the server binary.

use crate::error::{DriverError, DriverResult};
use crate::locator::ServerLocator;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::info;

/// Command line used to start a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStartInfo {
    /// Program to run.
    pub command: PathBuf,
    /// Program arguments.
    pub arguments: Vec<String>,
}

/// Starts servers described by a [`ServerLocator`].
#[derive(Debug, Clone, Copy)]
pub struct RavenServerRunner;

impl RavenServerRunner {
    /// Builds the command line for a locator.
    ///
    /// The server runs in memory with the EULA accepted, setup disabled and
    /// this process registered as its parent. HTTPS servers listen on port
    /// 8085; HTTP servers pick a free port.
    pub fn process_start_info(locator: &dyn ServerLocator) -> DriverResult<ProcessStartInfo> {
        let server_path = locator.server_path()?;
        if !server_path.exists() {
            return Err(DriverError::ServerNotFound(server_path));
        }

        let host = locator.server_host();
        let server_url = if locator.with_https() {
            format!("--ServerUrl=https://{host}:8085")
        } else {
            format!("--ServerUrl=http://{host}:0")
        };

        let mut arguments = vec![
            server_url,
            "--RunInMemory=true".to_string(),
            "--License.Eula.Accepted=true".to_string(),
            "--Setup.Mode=None".to_string(),
            format!("--Testing.ParentProcessId={}", std::process::id()),
        ];
        arguments.extend(locator.command_arguments());

        Ok(ProcessStartInfo {
            command: locator.command()?,
            arguments,
        })
    }

    /// Spawns the server. Output is piped and the process is killed when
    /// the returned child is dropped.
    pub fn run(locator: &dyn ServerLocator) -> DriverResult<Child> {
        let info = Self::process_start_info(locator)?;
        info!(command = %info.command.display(), args = ?info.arguments, "starting server");

        let child = Command::new(&info.command)
            .args(&info.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        Ok(child)
    }
}
