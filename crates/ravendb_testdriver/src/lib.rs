//! # RavenDB Test Driver
//!
//! Test utilities for the RavenDB client.
//!
//! This crate provides:
//! - Server locators describing where the server binary lives
//! - A runner that spawns the server in memory for tests
//! - A running-server fixture that waits for startup and hands out stores
//! - An in-memory server emulating the REST API over the loopback client
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ravendb_testdriver::prelude::*;
//!
//! #[tokio::test]
//! async fn stores_a_document() {
//!     let (server, store) = in_memory_store("test").unwrap();
//!     let mut session = store.open_session().unwrap();
//!     // ... session operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod fixtures;
mod in_memory;
mod locator;
mod rql;
mod runner;
mod server;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::{EnvServerLocator, InMemoryServer, ServerLocator, TestServer};
}

pub use error::{DriverError, DriverResult};
pub use in_memory::InMemoryServer;
pub use locator::{EnvServerLocator, ServerLocator};
pub use runner::{ProcessStartInfo, RavenServerRunner};
pub use server::TestServer;
