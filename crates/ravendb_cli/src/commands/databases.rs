//! Database administration commands.

use super::{CommandResult, Connection};
use ravendb_client::operations::{CreateDatabaseOperation, DeleteDatabasesOperation};
use ravendb_client::protocol::DatabaseRecord;

/// Creates a database.
pub async fn create(connection: &Connection, name: &str, replication_factor: u32) -> CommandResult {
    let store = connection.server_store()?;
    let operation = CreateDatabaseOperation::new(DatabaseRecord::new(name))
        .with_replication_factor(replication_factor);
    let result = store.maintenance()?.server().send(&operation).await?;
    println!(
        "Created database {} on node(s) {}",
        result.name,
        result.nodes_added_to.join(", ")
    );
    Ok(())
}

/// Deletes a database.
pub async fn delete(connection: &Connection, name: &str, hard: bool) -> CommandResult {
    let store = connection.server_store()?;
    store
        .maintenance()?
        .server()
        .send(&DeleteDatabasesOperation::new(name, hard))
        .await?;
    println!("Deleted database {name}");
    Ok(())
}
