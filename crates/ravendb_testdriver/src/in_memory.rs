//! In-memory emulation of the server's REST API.
//!
//! [`InMemoryServer`] implements [`LoopbackServer`], so a document store
//! configured with a [`LoopbackClient`](ravendb_client::http::LoopbackClient)
//! talks to it without any network. It covers the endpoints the client
//! uses: documents, batches, queries, indexes, statistics, HiLo and database
//! administration. Concurrency checks, change vectors and server error
//! bodies follow the real server's behavior.

use crate::rql::{self, compare_values, field_value, QuerySource};
use parking_lot::Mutex;
use ravendb_client::http::{HttpRequest, HttpResponse, LoopbackServer, Method};
use ravendb_protocol::metadata;
use ravendb_protocol::{
    BatchCommandType, BatchRequest, BatchResponse, BatchResult, CreateDatabaseResult,
    DatabaseRecord, DatabaseStatistics, DeleteDatabaseResult, DeleteDatabasesRequest,
    GetDocumentsResult, HiLoResult, IndexDefinition, IndexInformation, IndexNamesResult,
    IndexQuery, OperationIdResult, PutIndexResult, PutIndexesRequest, PutIndexesResponse,
    QueryResult, ServerErrorBody,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use tracing::debug;

/// Tag of the single emulated node.
pub const NODE_TAG: &str = "A";

const HILO_RANGE: i64 = 32;

const CONCURRENCY: &str = "Raven.Client.Exceptions.ConcurrencyException";
const DATABASE_DOES_NOT_EXIST: &str =
    "Raven.Client.Exceptions.Database.DatabaseDoesNotExistException";
const INDEX_DOES_NOT_EXIST: &str =
    "Raven.Client.Exceptions.Documents.Indexes.IndexDoesNotExistException";
const INVALID_QUERY: &str = "Raven.Client.Exceptions.Documents.Queries.InvalidQueryException";
const BAD_REQUEST: &str = "Raven.Client.Exceptions.BadRequestException";
const SERVICE_UNAVAILABLE: &str = "Raven.Client.Exceptions.ServiceUnavailableException";
const NOT_FOUND: &str = "Raven.Client.Exceptions.Routing.RouteNotFoundException";

type Reply = Result<HttpResponse, HttpResponse>;

fn error_response(status: u16, error_type: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::json(status, &ServerErrorBody::new(error_type, message))
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    error_response(400, BAD_REQUEST, message)
}

fn body<T: DeserializeOwned>(request: &HttpRequest) -> Result<T, HttpResponse> {
    request
        .json_body()
        .map_err(|e| bad_request(format!("invalid request body: {e}")))
}

fn method_name(method: Method) -> &'static str {
    match method {
        Method::Get => "GET",
        Method::Put => "PUT",
        Method::Post => "POST",
        Method::Delete => "DELETE",
        Method::Patch => "PATCH",
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

#[derive(Debug, Clone)]
struct StoredDocument {
    id: String,
    collection: String,
    body: Map<String, Value>,
    metadata: Map<String, Value>,
    etag: u64,
}

impl StoredDocument {
    fn change_vector(&self) -> Option<&str> {
        self.metadata
            .get(metadata::CHANGE_VECTOR)
            .and_then(Value::as_str)
    }

    /// Body with `@metadata`, as returned to clients.
    fn to_value(&self) -> Value {
        Value::Object(self.flattened())
    }

    fn flattened(&self) -> Map<String, Value> {
        let mut document = self.body.clone();
        document.insert(
            metadata::METADATA.to_string(),
            Value::Object(self.metadata.clone()),
        );
        document
    }
}

#[derive(Debug, Clone)]
struct Database {
    record: DatabaseRecord,
    database_id: String,
    documents: HashMap<String, StoredDocument>,
    indexes: BTreeMap<String, IndexDefinition>,
    hilo: HashMap<String, i64>,
    etag: u64,
}

impl Database {
    fn new(record: DatabaseRecord) -> Self {
        Self {
            record,
            database_id: uuid::Uuid::new_v4().simple().to_string(),
            documents: HashMap::new(),
            indexes: BTreeMap::new(),
            hilo: HashMap::new(),
            etag: 0,
        }
    }

    fn documents_in_order(&self) -> Vec<&StoredDocument> {
        let mut documents: Vec<_> = self.documents.values().collect();
        documents.sort_by_key(|d| d.etag);
        documents
    }

    fn find_index(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, d)| d)
    }

    fn check_change_vector(&self, id: &str, expected: &str, action: &str) -> Result<(), HttpResponse> {
        let actual = self
            .documents
            .get(&id.to_lowercase())
            .and_then(StoredDocument::change_vector);

        let message = match (actual, expected.is_empty()) {
            (None, true) => return Ok(()),
            (Some(_), true) => format!(
                "Document {id} exists, but {action} was called with an empty change vector (expected a new document). Optimistic concurrency violation, transaction will be aborted."
            ),
            (None, false) => format!(
                "Document {id} does not exist, but {action} was called with change vector: {expected}. Optimistic concurrency violation, transaction will be aborted."
            ),
            (Some(actual), false) if actual == expected => return Ok(()),
            (Some(actual), false) => format!(
                "Document {id} has change vector {actual}, but {action} was called with change vector: {expected}. Optimistic concurrency violation, transaction will be aborted."
            ),
        };
        Err(error_response(409, CONCURRENCY, message))
    }

    fn put(&mut self, id: &str, document: Map<String, Value>) -> BatchResult {
        let (body, mut meta) = metadata::split_metadata(document);
        let key = id.to_lowercase();
        let id = self
            .documents
            .get(&key)
            .map(|d| d.id.clone())
            .unwrap_or_else(|| id.to_string());

        let collection = meta
            .get(metadata::COLLECTION)
            .and_then(Value::as_str)
            .unwrap_or(metadata::EMPTY_COLLECTION)
            .to_string();

        self.etag += 1;
        let change_vector = format!("{NODE_TAG}:{}-{}", self.etag, self.database_id);
        let last_modified = now();

        meta.insert(metadata::ID.to_string(), Value::String(id.clone()));
        meta.insert(
            metadata::COLLECTION.to_string(),
            Value::String(collection.clone()),
        );
        meta.insert(
            metadata::CHANGE_VECTOR.to_string(),
            Value::String(change_vector.clone()),
        );
        meta.insert(
            metadata::LAST_MODIFIED.to_string(),
            Value::String(last_modified.clone()),
        );

        self.documents.insert(
            key,
            StoredDocument {
                id: id.clone(),
                collection: collection.clone(),
                body,
                metadata: meta,
                etag: self.etag,
            },
        );

        BatchResult {
            command_type: BatchCommandType::Put,
            id,
            collection: Some(collection),
            change_vector: Some(change_vector),
            last_modified: Some(last_modified),
            deleted: None,
        }
    }

    /// Runs a query and returns every match in result order.
    fn run_query(&self, query: &IndexQuery) -> Result<(Vec<&StoredDocument>, String), HttpResponse> {
        let parsed = rql::parse(&query.query).map_err(|e| {
            error_response(400, INVALID_QUERY, format!("{e}. Query: {}", query.query))
        })?;

        let (collection, index_name) = match &parsed.source {
            QuerySource::Collection(collection) => {
                (collection.clone(), format!("collection/{collection}"))
            }
            QuerySource::Index(name) => {
                let definition = self.find_index(name).ok_or_else(|| {
                    error_response(404, INDEX_DOES_NOT_EXIST, format!("Index '{name}' does not exist."))
                })?;
                (collection_of(definition), definition.name.clone())
            }
        };

        let mut matches: Vec<(&StoredDocument, Map<String, Value>)> = self
            .documents_in_order()
            .into_iter()
            .filter(|d| {
                collection == metadata::ALL_DOCUMENTS_COLLECTION
                    || d.collection.eq_ignore_ascii_case(&collection)
            })
            .map(|d| (d, d.flattened()))
            .filter(|(_, flat)| {
                parsed
                    .filter
                    .as_ref()
                    .map_or(true, |f| f.matches(flat, &query.query_parameters))
            })
            .collect();

        if !parsed.order_by.is_empty() {
            matches.sort_by(|(_, a), (_, b)| {
                for (field, descending) in &parsed.order_by {
                    let ordering = compare_values(field_value(a, field), field_value(b, field))
                        .unwrap_or(Ordering::Equal);
                    let ordering = if *descending {
                        ordering.reverse()
                    } else {
                        ordering
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        Ok((matches.into_iter().map(|(d, _)| d).collect(), index_name))
    }
}

/// Extracts the collection from a map such as `from u in docs.Users ...`.
fn collection_of(definition: &IndexDefinition) -> String {
    definition
        .maps
        .iter()
        .find_map(|map| {
            let start = map.find("docs.")? + "docs.".len();
            let name: String = map[start..]
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            (!name.is_empty()).then_some(name)
        })
        .unwrap_or_else(|| metadata::ALL_DOCUMENTS_COLLECTION.to_string())
}

/// An in-process server emulating the REST API.
#[derive(Debug, Default)]
pub struct InMemoryServer {
    databases: Mutex<HashMap<String, Database>>,
    requests: Mutex<Vec<String>>,
    unavailable: AtomicBool,
    raft_index: AtomicU64,
    operation_id: AtomicU64,
}

impl InMemoryServer {
    /// Creates a server without databases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a server with one database.
    pub fn with_database(name: &str) -> Self {
        let server = Self::new();
        server.create_database(name);
        server
    }

    /// Creates a database. Returns false if it already exists.
    pub fn create_database(&self, name: &str) -> bool {
        let mut databases = self.databases.lock();
        let key = name.to_lowercase();
        if databases.contains_key(&key) {
            return false;
        }
        databases.insert(key, Database::new(DatabaseRecord::new(name)));
        true
    }

    /// Returns the database names.
    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .databases
            .lock()
            .values()
            .map(|d| d.record.database_name.clone())
            .collect();
        names.sort();
        names
    }

    /// Returns a stored document with its `@metadata`.
    pub fn document(&self, database: &str, id: &str) -> Option<Value> {
        self.databases
            .lock()
            .get(&database.to_lowercase())?
            .documents
            .get(&id.to_lowercase())
            .map(StoredDocument::to_value)
    }

    /// Returns the number of documents in a database.
    pub fn document_count(&self, database: &str) -> usize {
        self.databases
            .lock()
            .get(&database.to_lowercase())
            .map_or(0, |d| d.documents.len())
    }

    /// Returns `"METHOD /path"` for every request received.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests received.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Forgets the recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    /// Makes every request fail with `503 Service Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    fn next_raft_index(&self) -> u64 {
        self.raft_index.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    fn route(&self, request: &HttpRequest) -> Reply {
        let segments: Vec<String> = request
            .url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).map(percent_decode).collect())
            .unwrap_or_default();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        match (request.method, segments.as_slice()) {
            (Method::Put, ["admin", "databases"]) => self.create_database_endpoint(request),
            (Method::Delete, ["admin", "databases"]) => self.delete_databases_endpoint(request),
            (method, ["databases", database, rest @ ..]) => {
                let mut databases = self.databases.lock();
                let db = databases.get_mut(&database.to_lowercase()).ok_or_else(|| {
                    error_response(
                        503,
                        DATABASE_DOES_NOT_EXIST,
                        format!("Database '{database}' does not exist."),
                    )
                })?;
                self.route_database(db, method, rest, request)
            }
            _ => Err(error_response(
                400,
                NOT_FOUND,
                format!("There is no handler for path: {} {}", method_name(request.method), request.url.path()),
            )),
        }
    }

    fn route_database(
        &self,
        db: &mut Database,
        method: Method,
        path: &[&str],
        request: &HttpRequest,
    ) -> Reply {
        match (method, path) {
            (Method::Get, ["docs"]) => get_documents(db, request),
            (Method::Post, ["bulk_docs"]) => bulk_docs(db, request),
            (Method::Post, ["queries"]) => query(db, request),
            (Method::Delete, ["queries"]) => self.delete_by_query(db, request),
            (Method::Put, ["admin", "indexes"]) => self.put_indexes(db, request),
            (Method::Get, ["indexes"]) => index_names(db, request),
            (Method::Delete, ["indexes"]) => delete_index(db, request),
            (Method::Get, ["stats"]) => Ok(statistics(db)),
            (Method::Get, ["hilo", "next"]) => next_hilo(db, request),
            _ => Err(error_response(
                400,
                NOT_FOUND,
                format!("There is no handler for path: {} {}", method_name(method), request.url.path()),
            )),
        }
    }

    fn create_database_endpoint(&self, request: &HttpRequest) -> Reply {
        let record: DatabaseRecord = body(request)?;
        let name = request
            .query_value("name")
            .unwrap_or_else(|| record.database_name.clone());
        if name.is_empty() {
            return Err(bad_request("Database name is required"));
        }

        let mut databases = self.databases.lock();
        let key = name.to_lowercase();
        if databases.contains_key(&key) {
            return Err(error_response(
                409,
                CONCURRENCY,
                format!("Database '{name}' already exists!"),
            ));
        }
        databases.insert(key, Database::new(record));

        Ok(HttpResponse::json(
            201,
            &CreateDatabaseResult {
                name,
                raft_command_index: self.next_raft_index(),
                nodes_added_to: vec![NODE_TAG.to_string()],
            },
        ))
    }

    fn delete_databases_endpoint(&self, request: &HttpRequest) -> Reply {
        let delete: DeleteDatabasesRequest = body(request)?;
        let mut databases = self.databases.lock();
        for name in &delete.database_names {
            databases.remove(&name.to_lowercase());
        }
        Ok(HttpResponse::json(
            200,
            &DeleteDatabaseResult {
                raft_command_index: self.next_raft_index(),
                pending_deletes: Vec::new(),
            },
        ))
    }

    fn put_indexes(&self, db: &mut Database, request: &HttpRequest) -> Reply {
        let put: PutIndexesRequest = body(request)?;
        let mut results = Vec::with_capacity(put.indexes.len());
        for definition in put.indexes {
            if definition.name.is_empty() || definition.maps.is_empty() {
                return Err(bad_request("Index must have a name and at least one map"));
            }
            db.indexes
                .retain(|name, _| !name.eq_ignore_ascii_case(&definition.name));
            results.push(PutIndexResult {
                index: definition.name.clone(),
                raft_command_index: self.next_raft_index(),
            });
            db.indexes.insert(definition.name.clone(), definition);
        }
        Ok(HttpResponse::json(201, &PutIndexesResponse { results }))
    }

    fn delete_by_query(&self, db: &mut Database, request: &HttpRequest) -> Reply {
        let query: IndexQuery = body(request)?;
        let ids: Vec<String> = db
            .run_query(&query)?
            .0
            .iter()
            .map(|d| d.id.to_lowercase())
            .collect();
        for id in &ids {
            db.documents.remove(id);
        }
        debug!(deleted = ids.len(), "delete by query");

        Ok(HttpResponse::json(
            200,
            &OperationIdResult {
                operation_id: self.operation_id.fetch_add(1, AtomicOrdering::SeqCst) + 1,
                operation_node_tag: Some(NODE_TAG.to_string()),
            },
        ))
    }
}

fn get_documents(db: &Database, request: &HttpRequest) -> Reply {
    let ids = request.query_values("id");

    let results = if ids.is_empty() {
        db.documents_in_order()
            .into_iter()
            .map(StoredDocument::to_value)
            .collect()
    } else {
        let results: Vec<Value> = ids
            .iter()
            .map(|id| {
                db.documents
                    .get(&id.to_lowercase())
                    .map_or(Value::Null, StoredDocument::to_value)
            })
            .collect();
        if ids.len() == 1 && results[0].is_null() {
            return Err(HttpResponse::new(404));
        }
        results
    };

    Ok(HttpResponse::json(
        200,
        &GetDocumentsResult {
            results,
            includes: Map::new(),
        },
    ))
}

fn bulk_docs(db: &mut Database, request: &HttpRequest) -> Reply {
    let batch: BatchRequest = body(request)?;

    // Applied to a copy so a failing command leaves the database untouched.
    let mut working = db.clone();
    let mut results = Vec::with_capacity(batch.commands.len());

    for command in batch.commands {
        if command.id.is_empty() {
            return Err(bad_request("Document id cannot be empty"));
        }
        match command.command_type {
            BatchCommandType::Put => {
                if let Some(expected) = &command.change_vector {
                    working.check_change_vector(&command.id, expected, "PUT")?;
                }
                let Some(Value::Object(document)) = command.document else {
                    return Err(bad_request(format!(
                        "PUT of '{}' requires a document",
                        command.id
                    )));
                };
                results.push(working.put(&command.id, document));
            }
            BatchCommandType::Delete => {
                if let Some(expected) = &command.change_vector {
                    working.check_change_vector(&command.id, expected, "DELETE")?;
                }
                let removed = working.documents.remove(&command.id.to_lowercase());
                results.push(BatchResult {
                    command_type: BatchCommandType::Delete,
                    id: command.id,
                    collection: None,
                    change_vector: None,
                    last_modified: None,
                    deleted: Some(removed.is_some()),
                });
            }
        }
    }

    *db = working;
    Ok(HttpResponse::json(201, &BatchResponse { results }))
}

fn query(db: &Database, request: &HttpRequest) -> Reply {
    let query: IndexQuery = body(request)?;
    let (matches, index_name) = db.run_query(&query)?;

    let total_results = matches.len() as u64;
    let results = matches
        .into_iter()
        .skip(query.start)
        .take(query.page_size.unwrap_or(usize::MAX))
        .map(StoredDocument::to_value)
        .collect();

    Ok(HttpResponse::json(
        200,
        &QueryResult {
            results,
            includes: Map::new(),
            total_results,
            skipped_results: 0,
            is_stale: false,
            index_name,
        },
    ))
}

fn index_names(db: &Database, request: &HttpRequest) -> Reply {
    let start: usize = request
        .query_value("start")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let page_size: usize = request
        .query_value("pageSize")
        .and_then(|s| s.parse().ok())
        .unwrap_or(usize::MAX);

    let results = db
        .indexes
        .keys()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect();
    Ok(HttpResponse::json(200, &IndexNamesResult { results }))
}

fn delete_index(db: &mut Database, request: &HttpRequest) -> Reply {
    let name = request
        .query_value("name")
        .ok_or_else(|| bad_request("Query string 'name' is mandatory"))?;
    let before = db.indexes.len();
    db.indexes.retain(|n, _| !n.eq_ignore_ascii_case(&name));
    if db.indexes.len() == before {
        return Err(error_response(
            404,
            INDEX_DOES_NOT_EXIST,
            format!("Index '{name}' does not exist."),
        ));
    }
    Ok(HttpResponse::new(204))
}

fn statistics(db: &Database) -> HttpResponse {
    HttpResponse::json(
        200,
        &DatabaseStatistics {
            count_of_documents: db.documents.len() as u64,
            count_of_indexes: db.indexes.len() as u64,
            database_id: db.database_id.clone(),
            indexes: db
                .indexes
                .values()
                .map(|d| IndexInformation {
                    name: d.name.clone(),
                    is_stale: false,
                    priority: d.priority,
                    lock_mode: d.lock_mode,
                })
                .collect(),
        },
    )
}

fn next_hilo(db: &mut Database, request: &HttpRequest) -> Reply {
    let tag = request
        .query_value("tag")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| bad_request("Query string 'tag' is mandatory"))?;
    let separator = request
        .query_value("identityPartsSeparator")
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/".to_string());
    let last_max: i64 = request
        .query_value("lastMax")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let current = db.hilo.entry(tag.to_lowercase()).or_insert(0);
    let low = (*current).max(last_max) + 1;
    let high = low + HILO_RANGE - 1;
    *current = high;

    Ok(HttpResponse::json(
        200,
        &HiLoResult {
            prefix: format!("{tag}{separator}"),
            low,
            high,
            last_size: HILO_RANGE,
            server_tag: NODE_TAG.to_string(),
            last_range_at: now(),
        },
    ))
}

impl LoopbackServer for InMemoryServer {
    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        self.requests
            .lock()
            .push(format!("{} {}", method_name(request.method), request.url.path()));

        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return error_response(503, SERVICE_UNAVAILABLE, "The server is not available");
        }

        let response = self.route(request).unwrap_or_else(|e| e);
        debug!(method = ?request.method, path = request.url.path(), status = response.status, "handled");
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ravendb_client::Url;
    use ravendb_protocol::BatchCommandData;
    use serde_json::json;

    fn request(method: Method, path: &str) -> HttpRequest {
        let url = Url::parse(&format!("http://localhost:8080{path}")).unwrap();
        HttpRequest::new(method, url)
    }

    fn put(server: &InMemoryServer, id: &str, document: Value, cv: Option<&str>) -> HttpResponse {
        let batch = BatchRequest {
            commands: vec![BatchCommandData::put(id, cv.map(str::to_string), document)],
        };
        let request = request(Method::Post, "/databases/db/bulk_docs")
            .with_json_body(&batch)
            .unwrap();
        server.handle(&request)
    }

    fn run_query(server: &InMemoryServer, query: IndexQuery) -> HttpResponse {
        let request = request(Method::Post, "/databases/db/queries")
            .with_json_body(&query)
            .unwrap();
        server.handle(&request)
    }

    fn user(name: &str, age: u32) -> Value {
        json!({"name": name, "age": age, "@metadata": {"@collection": "Users"}})
    }

    #[test]
    fn put_assigns_change_vector_and_metadata() {
        let server = InMemoryServer::with_database("db");
        let response = put(&server, "users/1", user("Ann", 30), None);
        assert_eq!(response.status, 201);

        let result: BatchResponse = response.json_body().unwrap();
        let change_vector = result.results[0].change_vector.clone().unwrap();
        assert!(change_vector.starts_with("A:1-"));

        let stored = server.document("db", "USERS/1").unwrap();
        assert_eq!(stored["name"], "Ann");
        assert_eq!(stored["@metadata"]["@id"], "users/1");
        assert_eq!(stored["@metadata"]["@collection"], "Users");
        assert_eq!(stored["@metadata"]["@change-vector"], change_vector.as_str());
    }

    #[test]
    fn unknown_database_is_reported() {
        let server = InMemoryServer::new();
        let response = server.handle(&request(Method::Get, "/databases/missing/docs?id=a"));
        assert_eq!(response.status, 503);
        let body: ServerErrorBody = response.json_body().unwrap();
        assert_eq!(body.short_type(), "DatabaseDoesNotExistException");
    }

    #[test]
    fn missing_single_document_is_404() {
        let server = InMemoryServer::with_database("db");
        let response = server.handle(&request(Method::Get, "/databases/db/docs?id=users/1"));
        assert_eq!(response.status, 404);
    }

    #[test]
    fn missing_documents_in_multi_get_are_null() {
        let server = InMemoryServer::with_database("db");
        put(&server, "users/1", user("Ann", 30), None);

        let response = server.handle(&request(
            Method::Get,
            "/databases/db/docs?id=users/1&id=users/2",
        ));
        let result: GetDocumentsResult = response.json_body().unwrap();
        assert_eq!(result.results.len(), 2);
        assert_eq!(result.results[0]["name"], "Ann");
        assert!(result.results[1].is_null());
    }

    #[test]
    fn change_vector_mismatch_aborts_whole_batch() {
        let server = InMemoryServer::with_database("db");
        put(&server, "users/1", user("Ann", 30), None);

        let batch = BatchRequest {
            commands: vec![
                BatchCommandData::put("users/2", None, user("Bob", 20)),
                BatchCommandData::put("users/1", Some("A:99-x".to_string()), user("Ann", 31)),
            ],
        };
        let request = request(Method::Post, "/databases/db/bulk_docs")
            .with_json_body(&batch)
            .unwrap();
        let response = server.handle(&request);

        assert_eq!(response.status, 409);
        assert_eq!(server.document_count("db"), 1);
        assert_eq!(server.document("db", "users/1").unwrap()["age"], 30);
    }

    #[test]
    fn empty_change_vector_requires_new_document() {
        let server = InMemoryServer::with_database("db");
        assert_eq!(put(&server, "users/1", user("Ann", 30), Some("")).status, 201);
        assert_eq!(put(&server, "users/1", user("Ann", 30), Some("")).status, 409);
    }

    #[test]
    fn collection_query_filters_sorts_and_pages() {
        let server = InMemoryServer::with_database("db");
        put(&server, "users/1", user("Ann", 30), None);
        put(&server, "users/2", user("Bob", 20), None);
        put(&server, "users/3", user("Cid", 40), None);
        put(&server, "orders/1", json!({"total": 5}), None);

        let mut query = IndexQuery::new("from 'Users' where age > $p0 order by age desc");
        query.query_parameters.insert("p0".into(), json!(25));
        query.page_size = Some(1);

        let result: QueryResult = run_query(&server, query).json_body().unwrap();
        assert_eq!(result.total_results, 2);
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0]["name"], "Cid");
        assert_eq!(result.index_name, "collection/Users");
    }

    #[test]
    fn index_query_uses_map_collection() {
        let server = InMemoryServer::with_database("db");
        put(&server, "users/1", user("Ann", 30), None);
        put(&server, "orders/1", json!({"name": "Ann", "@metadata": {"@collection": "Orders"}}), None);

        let indexes = PutIndexesRequest {
            indexes: vec![IndexDefinition::new(
                "Users/ByName",
                "from u in docs.Users select new { u.name }",
            )],
        };
        let request = request(Method::Put, "/databases/db/admin/indexes")
            .with_json_body(&indexes)
            .unwrap();
        assert_eq!(server.handle(&request).status, 201);

        let mut query = IndexQuery::new("from index 'Users/ByName' where name = $p0");
        query.query_parameters.insert("p0".into(), json!("Ann"));
        let result: QueryResult = run_query(&server, query).json_body().unwrap();
        assert_eq!(result.total_results, 1);
        assert_eq!(result.results[0]["@metadata"]["@id"], "users/1");
    }

    #[test]
    fn query_on_unknown_index_is_404() {
        let server = InMemoryServer::with_database("db");
        let response = run_query(&server, IndexQuery::new("from index 'Nope'"));
        assert_eq!(response.status, 404);
        let body: ServerErrorBody = response.json_body().unwrap();
        assert_eq!(body.short_type(), "IndexDoesNotExistException");
    }

    #[test]
    fn hilo_ranges_do_not_overlap() {
        let server = InMemoryServer::with_database("db");
        let next = |last_max: i64| -> HiLoResult {
            let path = format!("/databases/db/hilo/next?tag=users&identityPartsSeparator=%2F&lastMax={last_max}");
            server.handle(&request(Method::Get, &path)).json_body().unwrap()
        };

        let first = next(0);
        assert_eq!((first.low, first.high), (1, 32));
        assert_eq!(first.prefix, "users/");
        let second = next(first.high);
        assert_eq!((second.low, second.high), (33, 64));
    }

    #[test]
    fn database_administration() {
        let server = InMemoryServer::new();
        let create = request(Method::Put, "/admin/databases?name=Northwind")
            .with_json_body(&DatabaseRecord::new("Northwind"))
            .unwrap();
        assert_eq!(server.handle(&create).status, 201);
        assert_eq!(server.handle(&create).status, 409);
        assert_eq!(server.database_names(), vec!["Northwind".to_string()]);

        let delete = request(Method::Delete, "/admin/databases")
            .with_json_body(&DeleteDatabasesRequest {
                database_names: vec!["northwind".into()],
                hard_delete: true,
                from_nodes: None,
            })
            .unwrap();
        assert_eq!(server.handle(&delete).status, 200);
        assert!(server.database_names().is_empty());
    }

    #[test]
    fn unavailable_server_answers_503_and_records_requests() {
        let server = InMemoryServer::with_database("db");
        server.set_unavailable(true);
        let response = server.handle(&request(Method::Get, "/databases/db/stats"));
        assert_eq!(response.status, 503);
        assert_eq!(server.requests(), vec!["GET /databases/db/stats".to_string()]);
    }

    #[test]
    fn decodes_percent_encoded_segments() {
        assert_eq!(percent_decode("my%20db"), "my db");
        assert_eq!(percent_decode("100%"), "100%");
    }

    #[test]
    fn index_collection_is_read_from_map() {
        let definition = IndexDefinition::new("Orders/Totals", "from o in docs.Orders select new { o.total }");
        assert_eq!(collection_of(&definition), "Orders");
        let definition = IndexDefinition::new("All", "from d in everything select d");
        assert_eq!(collection_of(&definition), "@all_docs");
    }
}
