//! Document commands: get, put and delete.

use super::{print_json, CommandResult, Connection};
use ravendb_client::protocol::metadata;
use serde_json::{Map, Value};
use std::io::Read;
use std::path::Path;

/// Loads documents and prints them; missing ids print as `null`.
pub async fn get(connection: &Connection, ids: &[String]) -> CommandResult {
    let store = connection.database_store()?;
    let mut session = store.open_session()?;

    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    let documents: Vec<Option<Value>> = session.load_many(&ids).await?;

    if let [document] = documents.as_slice() {
        return print_json(document);
    }
    print_json(&documents)
}

/// Reads the document body from the argument, a file or stdin.
pub fn read_body(json: Option<String>, file: Option<&Path>) -> CommandResult<Value> {
    let text = match (json, file) {
        (Some(json), _) => json,
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    parse_body(&text)
}

fn parse_body(text: &str) -> CommandResult<Value> {
    match serde_json::from_str(text)? {
        value @ Value::Object(_) => Ok(value),
        _ => Err("The document must be a JSON object".into()),
    }
}

fn with_collection(mut body: Value, collection: &str) -> Value {
    if let Value::Object(document) = &mut body {
        let entry = document
            .entry(metadata::METADATA)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(meta) = entry {
            meta.insert(
                metadata::COLLECTION.to_string(),
                Value::String(collection.to_string()),
            );
        }
    }
    body
}

/// Stores a document under `id`.
pub async fn put(
    connection: &Connection,
    id: &str,
    body: Value,
    collection: Option<&str>,
) -> CommandResult {
    let store = connection.database_store()?;
    let mut session = store.open_session()?;

    let body = match collection {
        Some(collection) => with_collection(body, collection),
        None => body,
    };
    session.store_with_id(&body, id)?;
    session.save_changes().await?;

    println!(
        "Stored {id} ({})",
        session.change_vector_for(id).unwrap_or("no change vector")
    );
    Ok(())
}

/// Deletes documents.
pub async fn delete(connection: &Connection, ids: &[String]) -> CommandResult {
    let store = connection.database_store()?;
    let mut session = store.open_session()?;
    for id in ids {
        session.delete(id)?;
    }
    session.save_changes().await?;
    println!("Deleted {} document(s)", ids.len());
    Ok(())
}
