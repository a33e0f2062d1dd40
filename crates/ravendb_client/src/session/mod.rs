//! Sessions: the unit of work over one database.
//!
//! A session tracks every document it loads or stores. Rust entities are
//! plain values, so modifications are registered by storing the entity
//! again; [`DocumentSession::save_changes`] then sends every new or changed
//! document and every deletion in a single batch.

mod query;
mod tracking;

pub use query::DocumentQuery;

use crate::commands::{BatchCommand, GetDocumentsCommand};
use crate::conventions::{DocumentConventions, EntityType};
use crate::error::{RavenError, RavenResult};
use crate::events::{
    AfterSaveChangesEventArgs, BeforeDeleteEventArgs, BeforeStoreEventArgs, SessionListeners,
};
use crate::http::RequestExecutor;
use crate::store::StoreState;
use ravendb_protocol::{metadata, BatchCommandData, BatchCommandType};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use tracking::{DeletedDocuments, DocumentInfo, DocumentsById};
use uuid::Uuid;

/// A unit of work over one database.
pub struct DocumentSession {
    id: Uuid,
    database: String,
    state: Arc<StoreState>,
    executor: Arc<RequestExecutor>,
    listeners: SessionListeners,
    use_optimistic_concurrency: bool,
    number_of_requests: u32,
    documents: DocumentsById,
    deleted: DeletedDocuments,
}

impl fmt::Debug for DocumentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentSession")
            .field("id", &self.id)
            .field("database", &self.database)
            .field("number_of_requests", &self.number_of_requests)
            .field("tracked", &self.documents.len())
            .finish()
    }
}

impl DocumentSession {
    pub(crate) fn new(
        state: Arc<StoreState>,
        database: String,
        executor: Arc<RequestExecutor>,
        listeners: SessionListeners,
        use_optimistic_concurrency: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            database,
            state,
            executor,
            listeners,
            use_optimistic_concurrency,
            number_of_requests: 0,
            documents: DocumentsById::default(),
            deleted: DeletedDocuments::default(),
        }
    }

    /// Returns the session id passed to event listeners.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the database this session works on.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the store conventions.
    pub fn conventions(&self) -> &DocumentConventions {
        self.state.conventions()
    }

    /// Returns true if writes carry change vectors.
    pub fn use_optimistic_concurrency(&self) -> bool {
        self.use_optimistic_concurrency
    }

    /// Enables or disables optimistic concurrency for this session.
    pub fn set_use_optimistic_concurrency(&mut self, enabled: bool) {
        self.use_optimistic_concurrency = enabled;
    }

    /// Returns the number of server round-trips made so far.
    pub fn number_of_requests(&self) -> u32 {
        self.number_of_requests
    }

    pub(crate) fn increment_requests(&mut self) -> RavenResult<()> {
        let max = self.conventions().max_number_of_requests_per_session;
        self.number_of_requests += 1;
        if self.number_of_requests > max {
            return Err(RavenError::invalid_operation(format!(
                "The maximum number of requests ({max}) allowed for this session has been reached. \
                 Load multiple documents at once and call save_changes() only once."
            )));
        }
        Ok(())
    }

    pub(crate) fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    pub(crate) fn listeners(&self) -> &SessionListeners {
        &self.listeners
    }

    // ---- loading ----

    /// Loads a document by id.
    ///
    /// Tracked documents are returned without contacting the server; ids
    /// deleted in this session load as `None`.
    pub async fn load<T: DeserializeOwned>(&mut self, id: &str) -> RavenResult<Option<T>> {
        if id.is_empty() {
            return Err(RavenError::invalid_argument("id cannot be null or empty"));
        }
        let mut results = self.load_many::<T>(&[id]).await?;
        Ok(results.pop().flatten())
    }

    /// Loads several documents in one request.
    ///
    /// Results are returned in the order of `ids`.
    pub async fn load_many<T: DeserializeOwned>(
        &mut self,
        ids: &[&str],
    ) -> RavenResult<Vec<Option<T>>> {
        let entity_type = EntityType::of::<T>();

        let mut missing: Vec<&str> = Vec::new();
        for id in ids.iter().copied().filter(|id| !id.is_empty()) {
            if self.deleted.contains(id)
                || self.documents.contains(id)
                || missing.iter().any(|m| tracking::key(m) == tracking::key(id))
            {
                continue;
            }
            missing.push(id);
        }

        if !missing.is_empty() {
            self.increment_requests()?;
            let command = GetDocumentsCommand::new(missing.iter().copied())?;
            let result = self.executor.execute(&command).await?;

            for (requested, value) in missing.iter().zip(result.results) {
                if let Value::Object(raw) = value {
                    self.track_loaded(requested, raw, &entity_type);
                }
            }
        }

        ids.iter()
            .map(|id| self.tracked_entity::<T>(id, &entity_type))
            .collect()
    }

    /// Tracks a document returned by the server and returns its id.
    ///
    /// If the id is already tracked the session's copy is kept.
    pub(crate) fn track_loaded(
        &mut self,
        requested_id: &str,
        raw: Map<String, Value>,
        entity_type: &EntityType,
    ) -> String {
        let (body, meta) = metadata::split_metadata(raw);
        let id = meta
            .get(metadata::ID)
            .and_then(Value::as_str)
            .unwrap_or(requested_id)
            .to_string();

        if !self.documents.contains(&id) && !self.deleted.contains(&id) {
            self.documents.insert(DocumentInfo::loaded(
                id.clone(),
                entity_type.clone(),
                body,
                meta,
            ));
        }
        id
    }

    pub(crate) fn tracked_entity<T: DeserializeOwned>(
        &self,
        id: &str,
        entity_type: &EntityType,
    ) -> RavenResult<Option<T>> {
        if self.deleted.contains(id) {
            return Ok(None);
        }
        match self.documents.get(id) {
            Some(info) => self
                .conventions()
                .from_document(&info.document, &info.metadata, &info.id, entity_type)
                .map(Some),
            None => Ok(None),
        }
    }

    // ---- storing ----

    /// Stores an entity, generating an id when its identity property is
    /// missing or empty. Returns the id.
    ///
    /// Storing an already tracked id replaces the tracked document.
    pub async fn store<T: Serialize + ?Sized>(&mut self, entity: &T) -> RavenResult<String> {
        let entity_type = EntityType::of::<T>();
        let value = serde_json::to_value(entity)?;

        let id = match self.identity_of(&value, &entity_type) {
            Some(id) => id,
            None => {
                self.state
                    .hilo()
                    .generate_document_id(self.conventions(), &self.executor, &entity_type)
                    .await?
            }
        };

        self.store_internal(value, entity_type, id.clone(), None)?;
        Ok(id)
    }

    /// Stores an entity under an explicit id.
    pub fn store_with_id<T: Serialize + ?Sized>(&mut self, entity: &T, id: &str) -> RavenResult<()> {
        if id.is_empty() {
            return Err(RavenError::invalid_argument("id cannot be null or empty"));
        }
        let value = serde_json::to_value(entity)?;
        self.store_internal(value, EntityType::of::<T>(), id.to_string(), None)
    }

    /// Stores an entity that must match `change_vector` on the server.
    ///
    /// An empty change vector requires that the document does not exist yet.
    pub fn store_with_change_vector<T: Serialize + ?Sized>(
        &mut self,
        entity: &T,
        id: &str,
        change_vector: &str,
    ) -> RavenResult<()> {
        if id.is_empty() {
            return Err(RavenError::invalid_argument("id cannot be null or empty"));
        }
        let value = serde_json::to_value(entity)?;
        self.store_internal(
            value,
            EntityType::of::<T>(),
            id.to_string(),
            Some(change_vector.to_string()),
        )
    }

    fn identity_of(&self, value: &Value, entity_type: &EntityType) -> Option<String> {
        self.conventions().identity_of(value, entity_type).or_else(|| {
            if !entity_type.dynamic {
                return None;
            }
            value
                .as_object()
                .and_then(|o| metadata::metadata_str(o, metadata::ID))
                .filter(|id| !id.is_empty())
                .map(str::to_owned)
        })
    }

    fn store_internal(
        &mut self,
        value: Value,
        entity_type: EntityType,
        id: String,
        change_vector: Option<String>,
    ) -> RavenResult<()> {
        if self.deleted.contains(&id) {
            return Err(RavenError::invalid_operation(format!(
                "Can't store document, it was already deleted in this session. Document id: {id}"
            )));
        }

        let (body, meta) = self.conventions().to_document(value, &entity_type)?;

        match self.documents.get_mut(&id) {
            Some(info) => {
                info.document = body;
                info.metadata.extend(meta);
                info.entity_type = entity_type;
                if change_vector.is_some() {
                    info.forced_change_vector = change_vector;
                }
            }
            None => {
                let mut info = DocumentInfo::new_entity(id, entity_type, body, meta);
                info.forced_change_vector = change_vector;
                self.documents.insert(info);
            }
        }
        Ok(())
    }

    // ---- deleting ----

    /// Marks a document for deletion.
    ///
    /// A document stored in this session and never saved is simply
    /// forgotten.
    pub fn delete(&mut self, id: &str) -> RavenResult<()> {
        self.delete_internal(id, None)
    }

    /// Marks a document for deletion if it still matches `change_vector`.
    pub fn delete_with_change_vector(&mut self, id: &str, change_vector: &str) -> RavenResult<()> {
        self.delete_internal(id, Some(change_vector.to_string()))
    }

    fn delete_internal(&mut self, id: &str, change_vector: Option<String>) -> RavenResult<()> {
        if id.is_empty() {
            return Err(RavenError::invalid_argument("id cannot be null or empty"));
        }

        match self.documents.remove(id) {
            Some(info) if info.is_new() && change_vector.is_none() => {}
            Some(info) => {
                let expected = match change_vector {
                    Some(cv) => Some(cv),
                    None if self.use_optimistic_concurrency => info.change_vector,
                    None => None,
                };
                self.deleted.insert(info.id, expected);
            }
            None => self.deleted.insert(id.to_string(), change_vector),
        }
        Ok(())
    }

    // ---- saving ----

    /// Sends all pending changes in one batch.
    pub async fn save_changes(&mut self) -> RavenResult<()> {
        let mut commands = Vec::new();

        for (id, change_vector) in self.deleted.iter() {
            self.listeners.before_delete(&BeforeDeleteEventArgs {
                session_id: self.id,
                document_id: id,
            });
            commands.push(BatchCommandData::delete(id.clone(), change_vector.clone()));
        }

        for key in self.documents.keys_in_order() {
            let Some(info) = self.documents.get_mut(&key) else {
                continue;
            };
            if !info.has_changed() {
                continue;
            }

            self.listeners.before_store(&mut BeforeStoreEventArgs {
                session_id: self.id,
                document_id: &info.id,
                document: &mut info.document,
                metadata: &mut info.metadata,
            });

            let change_vector = match &info.forced_change_vector {
                Some(cv) => Some(cv.clone()),
                None if self.use_optimistic_concurrency => {
                    Some(info.change_vector.clone().unwrap_or_default())
                }
                None => None,
            };

            let mut document = info.document.clone();
            document.insert(
                metadata::METADATA.to_string(),
                Value::Object(info.metadata.clone()),
            );
            commands.push(BatchCommandData::put(
                info.id.clone(),
                change_vector,
                Value::Object(document),
            ));
        }

        if commands.is_empty() {
            return Ok(());
        }

        debug!(
            session = %self.id,
            commands = commands.len(),
            tracked = self.documents.len(),
            "saving changes"
        );

        self.increment_requests()?;
        let response = self.executor.execute(&BatchCommand::new(commands)).await?;

        for result in response.results {
            match result.command_type {
                BatchCommandType::Put => {
                    let Some(info) = self.documents.get_mut(&result.id) else {
                        continue;
                    };
                    if let Some(last_modified) = result.last_modified {
                        info.metadata.insert(
                            metadata::LAST_MODIFIED.to_string(),
                            Value::String(last_modified),
                        );
                    }
                    info.mark_saved(result.change_vector);

                    self.listeners.after_save_changes(&AfterSaveChangesEventArgs {
                        session_id: self.id,
                        document_id: &info.id,
                        document: &info.document,
                        metadata: &info.metadata,
                    });
                }
                BatchCommandType::Delete => self.deleted.remove(&result.id),
            }
        }
        self.deleted.clear();
        Ok(())
    }

    // ---- introspection ----

    /// Returns true if the id is tracked and not deleted.
    pub fn is_loaded(&self, id: &str) -> bool {
        self.documents.contains(id) && !self.deleted.contains(id)
    }

    /// Returns true if `save_changes` would send anything.
    pub fn has_changes(&self) -> bool {
        !self.deleted.is_empty() || self.documents.iter().any(DocumentInfo::has_changed)
    }

    /// Returns true if the tracked document is new or modified.
    pub fn has_changed(&self, id: &str) -> bool {
        self.documents.get(id).is_some_and(DocumentInfo::has_changed)
    }

    /// Stops tracking a document. Pending changes to it are discarded.
    pub fn evict(&mut self, id: &str) {
        self.documents.remove(id);
        self.deleted.remove(id);
    }

    /// Stops tracking everything.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.deleted.clear();
    }

    /// Returns the metadata of a tracked document.
    pub fn metadata_for(&self, id: &str) -> Option<&Map<String, Value>> {
        self.documents.get(id).map(|info| &info.metadata)
    }

    /// Returns the change vector of a tracked document.
    pub fn change_vector_for(&self, id: &str) -> Option<&str> {
        self.documents
            .get(id)
            .and_then(|info| info.change_vector.as_deref())
    }

    // ---- queries ----

    /// Queries the collection of `T`.
    pub fn query<T: DeserializeOwned>(&mut self) -> DocumentQuery<'_, T> {
        let collection = self.conventions().find_collection_name(&EntityType::of::<T>());
        DocumentQuery::collection(self, collection)
    }

    /// Queries a named collection.
    pub fn query_collection<T: DeserializeOwned>(
        &mut self,
        collection: impl Into<String>,
    ) -> DocumentQuery<'_, T> {
        DocumentQuery::collection(self, collection.into())
    }

    /// Queries an index.
    pub fn query_index<T: DeserializeOwned>(
        &mut self,
        index_name: impl Into<String>,
    ) -> DocumentQuery<'_, T> {
        DocumentQuery::index(self, index_name.into())
    }

    /// Runs raw RQL.
    pub fn raw_query<T: DeserializeOwned>(&mut self, rql: impl Into<String>) -> DocumentQuery<'_, T> {
        DocumentQuery::raw(self, rql.into())
    }
}
