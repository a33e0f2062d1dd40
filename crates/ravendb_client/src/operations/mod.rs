//! Operations outside the session unit of work.
//!
//! - [`MaintenanceOperation`]: database administration (indexes, statistics)
//! - [`ServerOperation`]: server administration (create/delete databases)
//! - [`Operation`]: set-based document operations (delete by query)
//!
//! Each operation produces a [`RavenCommand`] that is executed by the
//! matching executor.

mod databases;
mod indexes;
mod queries;
mod statistics;

pub use databases::{
    CreateDatabaseCommand, CreateDatabaseOperation, DeleteDatabasesCommand,
    DeleteDatabasesOperation,
};
pub use indexes::{
    DeleteIndexCommand, DeleteIndexOperation, GetIndexNamesCommand, GetIndexNamesOperation,
    PutIndexesCommand, PutIndexesOperation,
};
pub use queries::{DeleteByQueryCommand, DeleteByQueryOperation};
pub use statistics::{GetStatisticsCommand, GetStatisticsOperation};

use crate::conventions::DocumentConventions;
use crate::error::{RavenError, RavenResult};
use crate::http::RavenCommand;
use crate::store::StoreState;
use std::sync::Arc;

/// Output of the command produced by an operation.
pub type OperationOutput<C> = <C as RavenCommand>::Output;

/// A database-level administrative operation.
pub trait MaintenanceOperation {
    /// Command sent for this operation.
    type Command: RavenCommand;

    /// Builds the command.
    fn get_command(&self, conventions: &DocumentConventions) -> RavenResult<Self::Command>;
}

/// A server-level administrative operation.
pub trait ServerOperation {
    /// Command sent for this operation.
    type Command: RavenCommand;

    /// Builds the command.
    fn get_command(&self, conventions: &DocumentConventions) -> RavenResult<Self::Command>;
}

/// A set-based operation on documents.
pub trait Operation {
    /// Command sent for this operation.
    type Command: RavenCommand;

    /// Builds the command.
    fn get_command(&self, conventions: &DocumentConventions) -> RavenResult<Self::Command>;
}

fn require_database(database: Option<&str>) -> RavenResult<&str> {
    database.filter(|d| !d.is_empty()).ok_or_else(|| {
        RavenError::invalid_operation(
            "Cannot use operations without a database defined, did you forget to call for_database?",
        )
    })
}

/// Sends [`MaintenanceOperation`]s to one database.
#[derive(Debug, Clone)]
pub struct MaintenanceOperationExecutor {
    state: Arc<StoreState>,
    database: Option<String>,
}

impl MaintenanceOperationExecutor {
    pub(crate) fn new(state: Arc<StoreState>, database: Option<String>) -> Self {
        Self { state, database }
    }

    /// Returns the target database.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Returns an executor for another database.
    pub fn for_database(&self, database: impl Into<String>) -> Self {
        let database = database.into();
        if self
            .database
            .as_deref()
            .is_some_and(|d| d.eq_ignore_ascii_case(&database))
        {
            return self.clone();
        }
        Self::new(self.state.clone(), Some(database))
    }

    /// Returns the server-level executor.
    pub fn server(&self) -> ServerOperationExecutor {
        ServerOperationExecutor::new(self.state.clone())
    }

    /// Executes an operation.
    pub async fn send<O: MaintenanceOperation>(
        &self,
        operation: &O,
    ) -> RavenResult<OperationOutput<O::Command>> {
        let database = require_database(self.database.as_deref())?;
        let executor = self.state.request_executor(Some(database))?;
        let command = operation.get_command(self.state.conventions())?;
        executor.execute(&command).await
    }
}

/// Sends [`ServerOperation`]s.
#[derive(Debug, Clone)]
pub struct ServerOperationExecutor {
    state: Arc<StoreState>,
}

impl ServerOperationExecutor {
    pub(crate) fn new(state: Arc<StoreState>) -> Self {
        Self { state }
    }

    /// Executes an operation.
    pub async fn send<O: ServerOperation>(
        &self,
        operation: &O,
    ) -> RavenResult<OperationOutput<O::Command>> {
        let executor = self.state.server_executor()?;
        let command = operation.get_command(self.state.conventions())?;
        executor.execute(&command).await
    }
}

/// Sends [`Operation`]s to one database.
#[derive(Debug, Clone)]
pub struct OperationExecutor {
    state: Arc<StoreState>,
    database: Option<String>,
}

impl OperationExecutor {
    pub(crate) fn new(state: Arc<StoreState>, database: Option<String>) -> Self {
        Self { state, database }
    }

    /// Returns the target database.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Returns an executor for another database.
    pub fn for_database(&self, database: impl Into<String>) -> Self {
        Self::new(self.state.clone(), Some(database.into()))
    }

    /// Executes an operation.
    pub async fn send<O: Operation>(&self, operation: &O) -> RavenResult<OperationOutput<O::Command>> {
        let database = require_database(self.database.as_deref())?;
        let executor = self.state.request_executor(Some(database))?;
        let command = operation.get_command(self.state.conventions())?;
        executor.execute(&command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_is_required() {
        assert!(require_database(None).is_err());
        assert!(require_database(Some("")).is_err());
        assert_eq!(require_database(Some("db")).unwrap(), "db");
    }
}
