//! Stats command implementation.

use super::{print_json, CommandResult, Connection};
use ravendb_client::operations::GetStatisticsOperation;
use ravendb_client::protocol::DatabaseStatistics;

/// Fetches and prints database statistics.
pub async fn run(connection: &Connection, format: &str) -> CommandResult {
    let store = connection.database_store()?;
    let stats = store
        .maintenance()?
        .send(&GetStatisticsOperation::new())
        .await?;

    match format {
        "json" => print_json(&stats)?,
        _ => print!("{}", render_text(store.database().unwrap_or_default(), &stats)),
    }
    Ok(())
}

fn render_text(database: &str, stats: &DatabaseStatistics) -> String {
    let mut out = String::new();
    out.push_str(&format!("Database: {database}\n"));
    out.push_str(&format!("Id:       {}\n", stats.database_id));
    out.push('\n');
    out.push_str(&format!("Documents: {}\n", stats.count_of_documents));
    out.push_str(&format!("Indexes:   {}\n", stats.count_of_indexes));

    if !stats.indexes.is_empty() {
        out.push('\n');
        for index in &stats.indexes {
            let state = if index.is_stale { "stale" } else { "up to date" };
            out.push_str(&format!(
                "  {} ({:?}, {state})\n",
                index.name, index.priority
            ));
        }
    }
    out
}
