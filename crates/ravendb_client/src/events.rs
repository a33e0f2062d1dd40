//! Session lifecycle events.
//!
//! Listeners are registered on the document store and copied into every
//! session opened afterwards.

use ravendb_protocol::IndexQuery;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Handle returned by `DocumentStore::add_session_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Raised for every new or changed document during `save_changes`.
///
/// Listeners may edit the document and its metadata before they are sent.
#[derive(Debug)]
pub struct BeforeStoreEventArgs<'a> {
    /// Session raising the event.
    pub session_id: Uuid,
    /// Id of the document being stored.
    pub document_id: &'a str,
    /// Document body.
    pub document: &'a mut Map<String, Value>,
    /// Document metadata.
    pub metadata: &'a mut Map<String, Value>,
}

/// Raised for every stored document after a successful `save_changes`.
#[derive(Debug)]
pub struct AfterSaveChangesEventArgs<'a> {
    /// Session raising the event.
    pub session_id: Uuid,
    /// Id of the stored document.
    pub document_id: &'a str,
    /// Document body as sent.
    pub document: &'a Map<String, Value>,
    /// Metadata including the new change vector.
    pub metadata: &'a Map<String, Value>,
}

/// Raised for every deleted document during `save_changes`.
#[derive(Debug)]
pub struct BeforeDeleteEventArgs<'a> {
    /// Session raising the event.
    pub session_id: Uuid,
    /// Id of the document being deleted.
    pub document_id: &'a str,
}

/// Raised before a query is sent. Listeners may rewrite it.
#[derive(Debug)]
pub struct BeforeQueryEventArgs<'a> {
    /// Session raising the event.
    pub session_id: Uuid,
    /// Outgoing query.
    pub query: &'a mut IndexQuery,
}

type BeforeStoreHandler = Arc<dyn for<'a> Fn(&mut BeforeStoreEventArgs<'a>) + Send + Sync>;
type AfterSaveChangesHandler = Arc<dyn for<'a> Fn(&AfterSaveChangesEventArgs<'a>) + Send + Sync>;
type BeforeDeleteHandler = Arc<dyn for<'a> Fn(&BeforeDeleteEventArgs<'a>) + Send + Sync>;
type BeforeQueryHandler = Arc<dyn for<'a> Fn(&mut BeforeQueryEventArgs<'a>) + Send + Sync>;

/// A session event listener.
#[derive(Clone)]
pub enum SessionListener {
    /// See [`BeforeStoreEventArgs`].
    BeforeStore(BeforeStoreHandler),
    /// See [`AfterSaveChangesEventArgs`].
    AfterSaveChanges(AfterSaveChangesHandler),
    /// See [`BeforeDeleteEventArgs`].
    BeforeDelete(BeforeDeleteHandler),
    /// See [`BeforeQueryEventArgs`].
    BeforeQuery(BeforeQueryHandler),
}

impl SessionListener {
    /// Creates a `BeforeStore` listener.
    pub fn before_store<F>(handler: F) -> Self
    where
        F: for<'a> Fn(&mut BeforeStoreEventArgs<'a>) + Send + Sync + 'static,
    {
        Self::BeforeStore(Arc::new(handler))
    }

    /// Creates an `AfterSaveChanges` listener.
    pub fn after_save_changes<F>(handler: F) -> Self
    where
        F: for<'a> Fn(&AfterSaveChangesEventArgs<'a>) + Send + Sync + 'static,
    {
        Self::AfterSaveChanges(Arc::new(handler))
    }

    /// Creates a `BeforeDelete` listener.
    pub fn before_delete<F>(handler: F) -> Self
    where
        F: for<'a> Fn(&BeforeDeleteEventArgs<'a>) + Send + Sync + 'static,
    {
        Self::BeforeDelete(Arc::new(handler))
    }

    /// Creates a `BeforeQuery` listener.
    pub fn before_query<F>(handler: F) -> Self
    where
        F: for<'a> Fn(&mut BeforeQueryEventArgs<'a>) + Send + Sync + 'static,
    {
        Self::BeforeQuery(Arc::new(handler))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::BeforeStore(_) => "BeforeStore",
            Self::AfterSaveChanges(_) => "AfterSaveChanges",
            Self::BeforeDelete(_) => "BeforeDelete",
            Self::BeforeQuery(_) => "BeforeQuery",
        }
    }
}

impl fmt::Debug for SessionListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionListener").field(&self.kind()).finish()
    }
}

/// Listeners attached to one session.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionListeners {
    listeners: Vec<SessionListener>,
}

impl SessionListeners {
    pub(crate) fn new(listeners: Vec<SessionListener>) -> Self {
        Self { listeners }
    }

    pub(crate) fn before_store(&self, args: &mut BeforeStoreEventArgs<'_>) {
        for listener in &self.listeners {
            if let SessionListener::BeforeStore(handler) = listener {
                handler(args);
            }
        }
    }

    pub(crate) fn after_save_changes(&self, args: &AfterSaveChangesEventArgs<'_>) {
        for listener in &self.listeners {
            if let SessionListener::AfterSaveChanges(handler) = listener {
                handler(args);
            }
        }
    }

    pub(crate) fn before_delete(&self, args: &BeforeDeleteEventArgs<'_>) {
        for listener in &self.listeners {
            if let SessionListener::BeforeDelete(handler) = listener {
                handler(args);
            }
        }
    }

    pub(crate) fn before_query(&self, args: &mut BeforeQueryEventArgs<'_>) {
        for listener in &self.listeners {
            if let SessionListener::BeforeQuery(handler) = listener {
                handler(args);
            }
        }
    }
}
