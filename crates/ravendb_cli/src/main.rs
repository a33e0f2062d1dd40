//! RavenDB CLI
//!
//! Command-line client for a RavenDB server.
//!
//! # Commands
//!
//! - `get` - Load documents by id
//! - `put` - Store a JSON document
//! - `delete` - Delete documents by id
//! - `query` - Run an RQL query
//! - `indexes` - List or delete indexes
//! - `stats` - Display database statistics
//! - `create-database` / `delete-database` - Manage databases
//! - `run-server` - Start a local server for testing

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// RavenDB command-line client.
#[derive(Debug, Parser)]
#[command(name = "ravendb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Server URL (repeat for a cluster)
    #[arg(
        global = true,
        short,
        long = "url",
        env = "RAVENDB_URL",
        value_delimiter = ',',
        default_value = "http://127.0.0.1:8080"
    )]
    urls: Vec<String>,

    /// Database to operate on
    #[arg(global = true, short, long, env = "RAVENDB_DATABASE")]
    database: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load documents by id
    Get {
        /// Document ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Store a JSON document
    Put {
        /// Document id
        id: String,

        /// Document body; read from stdin when omitted
        #[arg(conflicts_with = "file")]
        json: Option<String>,

        /// Read the document body from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Collection to store the document in
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Delete documents by id
    Delete {
        /// Document ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Run an RQL query
    Query {
        /// Query text, e.g. "from Users where age > 30"
        rql: String,

        /// Number of results to skip
        #[arg(short, long, default_value = "0")]
        skip: usize,

        /// Maximum number of results
        #[arg(short, long)]
        take: Option<usize>,

        /// Delete the matching documents instead of returning them
        #[arg(long)]
        delete: bool,
    },

    /// List indexes, or delete one
    Indexes {
        /// Delete this index
        #[arg(long)]
        delete: Option<String>,
    },

    /// Display database statistics
    Stats {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Create a database
    CreateDatabase {
        /// Database name
        name: String,

        /// Number of nodes holding a copy
        #[arg(short, long, default_value = "1")]
        replication_factor: u32,
    },

    /// Delete a database
    DeleteDatabase {
        /// Database name
        name: String,

        /// Remove the database files as well
        #[arg(long)]
        hard: bool,
    },

    /// Start a local server for testing and wait for Ctrl-C
    RunServer {
        /// Path to the server binary
        #[arg(long, env = "RAVENDB_TEST_SERVER_PATH")]
        server_path: PathBuf,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Serve over HTTPS on port 8085
        #[arg(long)]
        https: bool,

        /// Seconds to wait for the server to start
        #[arg(long, default_value = "60")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let connection = commands::Connection::new(cli.urls, cli.database);

    match cli.command {
        Commands::Get { ids } => commands::documents::get(&connection, &ids).await?,
        Commands::Put {
            id,
            json,
            file,
            collection,
        } => {
            let body = commands::documents::read_body(json, file.as_deref())?;
            commands::documents::put(&connection, &id, body, collection.as_deref()).await?;
        }
        Commands::Delete { ids } => commands::documents::delete(&connection, &ids).await?,
        Commands::Query {
            rql,
            skip,
            take,
            delete,
        } => {
            if delete {
                commands::query::delete_matching(&connection, &rql).await?;
            } else {
                commands::query::run(&connection, &rql, skip, take).await?;
            }
        }
        Commands::Indexes { delete } => match delete {
            Some(name) => commands::indexes::delete(&connection, &name).await?,
            None => commands::indexes::list(&connection).await?,
        },
        Commands::Stats { format } => commands::stats::run(&connection, &format).await?,
        Commands::CreateDatabase {
            name,
            replication_factor,
        } => commands::databases::create(&connection, &name, replication_factor).await?,
        Commands::DeleteDatabase { name, hard } => {
            commands::databases::delete(&connection, &name, hard).await?
        }
        Commands::RunServer {
            server_path,
            host,
            https,
            timeout,
        } => commands::server::run(server_path, host, https, timeout).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_accept_repeats_and_commas() {
        let cli = Cli::try_parse_from([
            "ravendb",
            "--url",
            "http://a:8080,http://b:8080",
            "--url",
            "http://c:8080",
            "-d",
            "Northwind",
            "get",
            "users/1",
        ])
        .unwrap();

        assert_eq!(cli.urls, ["http://a:8080", "http://b:8080", "http://c:8080"]);
        assert_eq!(cli.database.as_deref(), Some("Northwind"));
        assert!(matches!(cli.command, Commands::Get { ids } if ids == ["users/1"]));
    }

    #[test]
    fn put_body_and_file_conflict() {
        let result = Cli::try_parse_from([
            "ravendb", "put", "users/1", "{}", "--file", "user.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn query_defaults() {
        let cli = Cli::try_parse_from(["ravendb", "query", "from Users"]).unwrap();
        match cli.command {
            Commands::Query {
                rql,
                skip,
                take,
                delete,
            } => {
                assert_eq!(rql, "from Users");
                assert_eq!(skip, 0);
                assert!(take.is_none());
                assert!(!delete);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
