//! CLI command implementations.

pub mod databases;
pub mod documents;
pub mod indexes;
pub mod query;
pub mod server;
pub mod stats;

use ravendb_client::DocumentStore;

/// Result type shared by the commands.
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Server URLs and database given on the command line.
#[derive(Debug, Clone)]
pub struct Connection {
    urls: Vec<String>,
    database: Option<String>,
}

impl Connection {
    /// Creates a connection description.
    pub fn new(urls: Vec<String>, database: Option<String>) -> Self {
        Self { urls, database }
    }

    /// Opens a store for server-level commands.
    pub fn server_store(&self) -> CommandResult<DocumentStore> {
        let mut store = DocumentStore::default();
        store.set_urls(self.urls.iter().cloned())?;
        store.initialize()?;
        Ok(store)
    }

    /// Opens a store for commands that need a database.
    pub fn database_store(&self) -> CommandResult<DocumentStore> {
        let database = self
            .database
            .as_deref()
            .ok_or("A database is required (--database or RAVENDB_DATABASE)")?;
        let mut store = DocumentStore::new(self.urls.iter().cloned(), database)?;
        store.initialize()?;
        Ok(store)
    }
}

/// Prints a JSON value.
pub fn print_json(value: &impl serde::Serialize) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
