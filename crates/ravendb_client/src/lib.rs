//! # RavenDB Client
//!
//! Document store, sessions and operations for RavenDB.
//!
//! This crate provides:
//! - `DocumentStore` configuration and lifecycle (initialize → use → close)
//! - Sessions with an identity map, change tracking and batched saves
//! - Entity ↔ document conversion driven by `DocumentConventions`
//! - A fluent RQL query builder
//! - Index creation tasks and maintenance/server operations
//! - A request executor with node failover over a pluggable HTTP client
//!
//! ## Unit of work
//!
//! Sessions never write until `save_changes()` is called, and then send every
//! pending put and delete in a single batch. Documents loaded twice in one
//! session are served from the session.
//!
//! ## Key Invariants
//!
//! - A store must be initialized before sessions or operations are used
//! - Configuration is frozen by `initialize()`
//! - Document ids are case-insensitive
//! - A closed store rejects every further request

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod commands;
mod config;
mod conventions;
mod error;
mod events;
mod hilo;
pub mod http;
mod indexes;
pub mod operations;
mod session;
mod store;
mod uri;

pub use commands::{BatchCommand, GetDocumentsCommand, NextHiLoCommand, QueryCommand};
pub use config::{AuthOptions, RetryConfig, SessionOptions};
pub use conventions::{
    pluralize, short_type_name, AttributeSerializer, DocumentConventions, DocumentInfoResolver,
    EntityType, IdGenerationStrategy, SerializedAttribute,
};
pub use error::{RavenError, RavenResult};
pub use events::{
    AfterSaveChangesEventArgs, BeforeDeleteEventArgs, BeforeQueryEventArgs, BeforeStoreEventArgs,
    ListenerId, SessionListener,
};
pub use hilo::{HiLoIdGenerator, MultiDatabaseHiLoGenerator};
pub use indexes::{IndexCreation, IndexCreationTask};
pub use session::{DocumentQuery, DocumentSession};
pub use store::DocumentStore;
pub use uri::{normalize_urls, validate_uri};

pub use ravendb_protocol as protocol;
pub use reqwest::Url;
