//! Index commands.

use super::{CommandResult, Connection};
use ravendb_client::operations::{DeleteIndexOperation, GetIndexNamesOperation};

const PAGE_SIZE: usize = 128;

/// Prints every index name.
pub async fn list(connection: &Connection) -> CommandResult {
    let store = connection.database_store()?;
    let maintenance = store.maintenance()?;

    let mut start = 0;
    loop {
        let names = maintenance
            .send(&GetIndexNamesOperation::new(start, PAGE_SIZE))
            .await?;
        for name in &names {
            println!("{name}");
        }
        if names.len() < PAGE_SIZE {
            break;
        }
        start += names.len();
    }
    Ok(())
}

/// Deletes an index.
pub async fn delete(connection: &Connection, name: &str) -> CommandResult {
    let store = connection.database_store()?;
    store
        .maintenance()?
        .send(&DeleteIndexOperation::new(name)?)
        .await?;
    println!("Deleted index {name}");
    Ok(())
}
