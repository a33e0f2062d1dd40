//! Query commands.

use super::{print_json, CommandResult, Connection};
use ravendb_client::operations::DeleteByQueryOperation;
use serde_json::Value;

/// Runs an RQL query and prints the results.
pub async fn run(
    connection: &Connection,
    rql: &str,
    skip: usize,
    take: Option<usize>,
) -> CommandResult {
    let store = connection.database_store()?;
    let mut session = store.open_session()?;

    let mut query = session.raw_query::<Value>(rql).skip(skip);
    if let Some(take) = take {
        query = query.take(take);
    }
    let results = query.all().await?;

    print_json(&results)?;
    eprintln!("{} result(s)", results.len());
    Ok(())
}

/// Deletes every document matching an RQL query.
pub async fn delete_matching(connection: &Connection, rql: &str) -> CommandResult {
    let store = connection.database_store()?;
    let result = store
        .operations()?
        .send(&DeleteByQueryOperation::from_rql(rql))
        .await?;
    println!("Started delete operation {}", result.operation_id);
    Ok(())
}
