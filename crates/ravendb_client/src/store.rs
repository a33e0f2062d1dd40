//! The document store: entry point of the client.
//!
//! A store is configured (URLs, database, conventions, certificate),
//! initialized once, and then used to open sessions and send operations.
//!
//! ```ignore
//! let mut store = DocumentStore::new(["http://localhost:8080"], "Northwind")?;
//! store.initialize()?;
//!
//! let mut session = store.open_session()?;
//! let id = session.store(&user).await?;
//! session.save_changes().await?;
//! ```

use crate::config::{AuthOptions, SessionOptions};
use crate::conventions::DocumentConventions;
use crate::error::{RavenError, RavenResult};
use crate::events::{ListenerId, SessionListener, SessionListeners};
use crate::hilo::MultiDatabaseHiLoGenerator;
use crate::http::{HttpClient, ReqwestHttpClient, RequestExecutor};
use crate::indexes::{IndexCreation, IndexCreationTask};
use crate::operations::{
    MaintenanceOperationExecutor, OperationExecutor, PutIndexesOperation,
};
use crate::session::DocumentSession;
use crate::uri::{is_plain_http, normalize_urls};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared state of an initialized store.
pub(crate) struct StoreState {
    urls: Vec<String>,
    database: Option<String>,
    conventions: Arc<DocumentConventions>,
    client: Arc<dyn HttpClient>,
    executors: RwLock<HashMap<String, Arc<RequestExecutor>>>,
    server_executor: Arc<RequestExecutor>,
    hilo: MultiDatabaseHiLoGenerator,
    disposed: Arc<AtomicBool>,
}

impl fmt::Debug for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreState")
            .field("urls", &self.urls)
            .field("database", &self.database)
            .field("executors", &self.executors.read().len())
            .field("disposed", &self.disposed.load(Ordering::SeqCst))
            .finish()
    }
}

impl StoreState {
    pub(crate) fn conventions(&self) -> &DocumentConventions {
        &self.conventions
    }

    pub(crate) fn hilo(&self) -> &MultiDatabaseHiLoGenerator {
        &self.hilo
    }

    fn ensure_not_disposed(&self) -> RavenResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(RavenError::Disposed);
        }
        Ok(())
    }

    /// Returns the cached executor for a database (case-insensitive).
    pub(crate) fn request_executor(&self, database: Option<&str>) -> RavenResult<Arc<RequestExecutor>> {
        self.ensure_not_disposed()?;

        let database = database
            .or(self.database.as_deref())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| {
                RavenError::invalid_operation("Cannot get a request executor without a database")
            })?;
        let key = database.to_lowercase();

        if let Some(executor) = self.executors.read().get(&key) {
            return Ok(executor.clone());
        }

        let mut executors = self.executors.write();
        let executor = executors
            .entry(key)
            .or_insert_with(|| {
                debug!(database, "creating request executor");
                Arc::new(RequestExecutor::with_disposed_flag(
                    &self.urls,
                    Some(database.to_string()),
                    self.client.clone(),
                    self.conventions.retry.clone(),
                    self.disposed.clone(),
                ))
            })
            .clone();
        Ok(executor)
    }

    pub(crate) fn server_executor(&self) -> RavenResult<Arc<RequestExecutor>> {
        self.ensure_not_disposed()?;
        Ok(self.server_executor.clone())
    }
}

/// Client handle for one server (or cluster) and a default database.
pub struct DocumentStore {
    urls: Vec<String>,
    database: Option<String>,
    conventions: Arc<DocumentConventions>,
    auth_options: Option<AuthOptions>,
    identifier: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    listeners: RwLock<Vec<(ListenerId, SessionListener)>>,
    next_listener_id: AtomicU64,
    disposed: Arc<AtomicBool>,
    state: Option<Arc<StoreState>>,
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("identifier", &self.identifier())
            .field("initialized", &self.state.is_some())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            database: None,
            conventions: Arc::new(DocumentConventions::default()),
            auth_options: None,
            identifier: None,
            http_client: None,
            listeners: RwLock::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            disposed: Arc::new(AtomicBool::new(false)),
            state: None,
        }
    }
}

impl DocumentStore {
    /// Creates a store for the given URLs and default database.
    pub fn new<I, S>(urls: I, database: impl Into<String>) -> RavenResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut store = Self::default();
        store.set_urls(urls)?;
        store.set_database(database)?;
        Ok(store)
    }

    fn assert_not_initialized(&self, what: &str) -> RavenResult<()> {
        if self.state.is_some() {
            return Err(RavenError::invalid_operation(format!(
                "You cannot set {what} after the document store has been initialized."
            )));
        }
        Ok(())
    }

    fn assert_initialized(&self) -> RavenResult<&Arc<StoreState>> {
        self.ensure_not_disposed()?;
        self.state.as_ref().ok_or(RavenError::NotInitialized)
    }

    fn ensure_not_disposed(&self) -> RavenResult<()> {
        if self.is_disposed() {
            return Err(RavenError::Disposed);
        }
        Ok(())
    }

    /// Returns the node URLs.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Sets the node URLs.
    ///
    /// Every URL must be an absolute `http`/`https` URL; one trailing `/`
    /// is removed.
    pub fn set_urls<I, S>(&mut self, urls: I) -> RavenResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assert_not_initialized("urls")?;
        self.urls = normalize_urls(urls)?;
        Ok(())
    }

    /// Returns the default database.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Sets the default database.
    pub fn set_database(&mut self, database: impl Into<String>) -> RavenResult<()> {
        self.assert_not_initialized("database")?;
        let database = database.into();
        self.database = (!database.is_empty()).then_some(database);
        Ok(())
    }

    /// Returns the conventions.
    pub fn conventions(&self) -> &DocumentConventions {
        &self.conventions
    }

    /// Returns the conventions for modification. Fails once initialized.
    pub fn conventions_mut(&mut self) -> RavenResult<&mut DocumentConventions> {
        self.assert_not_initialized("conventions")?;
        Ok(Arc::make_mut(&mut self.conventions))
    }

    /// Replaces the conventions.
    pub fn set_conventions(&mut self, conventions: DocumentConventions) -> RavenResult<()> {
        self.assert_not_initialized("conventions")?;
        self.conventions = Arc::new(conventions);
        Ok(())
    }

    /// Returns the client certificate settings.
    pub fn auth_options(&self) -> Option<&AuthOptions> {
        self.auth_options.as_ref()
    }

    /// Sets the client certificate. Requires `https` URLs.
    pub fn set_auth_options(&mut self, options: AuthOptions) -> RavenResult<()> {
        self.assert_not_initialized("auth options")?;
        self.auth_options = Some(options);
        Ok(())
    }

    /// Returns the identifier used in logs.
    ///
    /// Defaults to the URLs, followed by the database when one is set.
    pub fn identifier(&self) -> Option<String> {
        if let Some(identifier) = &self.identifier {
            return Some(identifier.clone());
        }
        if self.urls.is_empty() {
            return None;
        }
        let urls = self.urls.join(",");
        Some(match &self.database {
            Some(database) => format!("{urls} (DB: {database})"),
            None => urls,
        })
    }

    /// Overrides the identifier.
    pub fn set_identifier(&mut self, identifier: impl Into<String>) -> RavenResult<()> {
        self.assert_not_initialized("identifier")?;
        self.identifier = Some(identifier.into());
        Ok(())
    }

    /// Replaces the HTTP transport.
    pub fn set_http_client(&mut self, client: Arc<dyn HttpClient>) -> RavenResult<()> {
        self.assert_not_initialized("http client")?;
        self.http_client = Some(client);
        Ok(())
    }

    /// Returns true after `initialize()` succeeded.
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Validates the configuration and prepares the store for use.
    ///
    /// Calling it again is a no-op. Conventions can no longer be changed
    /// afterwards.
    pub fn initialize(&mut self) -> RavenResult<()> {
        self.ensure_not_disposed()?;
        if self.state.is_some() {
            return Ok(());
        }

        if self.urls.is_empty() {
            return Err(RavenError::invalid_argument(
                "Document store URLs cannot be empty",
            ));
        }

        if self.auth_options.is_some() {
            if let Some(url) = self.urls.iter().find(|u| is_plain_http(u)) {
                return Err(RavenError::invalid_operation(format!(
                    "The url {url} is using HTTP, but a certificate is specified, which require us to use HTTPS"
                )));
            }
        }

        let client: Arc<dyn HttpClient> = match &self.http_client {
            Some(client) => client.clone(),
            None => Arc::new(ReqwestHttpClient::new(
                self.conventions.request_timeout,
                self.auth_options.as_ref(),
            )?),
        };

        let server_executor = Arc::new(RequestExecutor::with_disposed_flag(
            &self.urls,
            None,
            client.clone(),
            self.conventions.retry.clone(),
            self.disposed.clone(),
        ));

        self.state = Some(Arc::new(StoreState {
            urls: self.urls.clone(),
            database: self.database.clone(),
            conventions: self.conventions.clone(),
            client,
            executors: RwLock::new(HashMap::new()),
            server_executor,
            hilo: MultiDatabaseHiLoGenerator::new(),
            disposed: self.disposed.clone(),
        }));

        let identifier = self.identifier().unwrap_or_default();
        info!(%identifier, "document store initialized");
        Ok(())
    }

    /// Opens a session on the default database.
    pub fn open_session(&self) -> RavenResult<DocumentSession> {
        self.open_session_with(SessionOptions::default())
    }

    /// Opens a session on the given database.
    pub fn open_session_for(&self, database: impl Into<String>) -> RavenResult<DocumentSession> {
        self.open_session_with(SessionOptions::new().with_database(database))
    }

    /// Opens a session with explicit options.
    pub fn open_session_with(&self, options: SessionOptions) -> RavenResult<DocumentSession> {
        let state = self.assert_initialized()?;

        let database = options
            .database
            .or_else(|| self.database.clone())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| {
                RavenError::invalid_operation(
                    "Cannot open a session without specifying a name of a database to operate on",
                )
            })?;
        let executor = state.request_executor(Some(&database))?;
        let use_optimistic_concurrency = options
            .use_optimistic_concurrency
            .unwrap_or(self.conventions.use_optimistic_concurrency);

        let listeners = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        Ok(DocumentSession::new(
            state.clone(),
            database,
            executor,
            SessionListeners::new(listeners),
            use_optimistic_concurrency,
        ))
    }

    /// Registers a listener for sessions opened from now on.
    pub fn add_session_listener(&self, listener: SessionListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().push((id, listener));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn remove_session_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    /// Deploys one index to `database`, or to the default database.
    pub async fn execute_index(
        &self,
        task: &dyn IndexCreationTask,
        database: Option<&str>,
    ) -> RavenResult<()> {
        self.execute_indexes(&[task], database).await
    }

    /// Deploys several indexes in one request.
    pub async fn execute_indexes(
        &self,
        tasks: &[&dyn IndexCreationTask],
        database: Option<&str>,
    ) -> RavenResult<()> {
        self.assert_initialized()?;
        let definitions = IndexCreation::create_indexes_to_add(tasks);

        let maintenance = self.maintenance()?;
        let maintenance = match database.map(str::to_owned).or_else(|| self.database.clone()) {
            Some(database) => maintenance.for_database(database),
            None => maintenance,
        };
        maintenance
            .send(&PutIndexesOperation::new(definitions)?)
            .await?;
        Ok(())
    }

    /// Returns the maintenance executor for the default database.
    pub fn maintenance(&self) -> RavenResult<MaintenanceOperationExecutor> {
        let state = self.assert_initialized()?;
        Ok(MaintenanceOperationExecutor::new(
            state.clone(),
            self.database.clone(),
        ))
    }

    /// Returns the operation executor for the default database.
    pub fn operations(&self) -> RavenResult<OperationExecutor> {
        let state = self.assert_initialized()?;
        Ok(OperationExecutor::new(state.clone(), self.database.clone()))
    }

    /// Returns the request executor for a database (default when `None`).
    pub fn request_executor(&self, database: Option<&str>) -> RavenResult<Arc<RequestExecutor>> {
        self.assert_initialized()?.request_executor(database)
    }

    /// Disposes the store. Outstanding sessions and executors start failing
    /// with [`RavenError::Disposed`].
    pub fn close(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            let identifier = self.identifier().unwrap_or_default();
            info!(%identifier, "document store closed");
        }
    }

    /// Returns true after `close()`.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
