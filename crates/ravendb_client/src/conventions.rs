//! Document conventions.
//!
//! Conventions decide how a Rust entity becomes a stored document: which
//! collection it belongs to, which field carries its id, how new ids are
//! generated and how individual attributes are renamed or re-encoded on the
//! wire.
//!
//! # Example
//!
//! ```rust,ignore
//! use ravendb_client::{DocumentConventions, DocumentInfoResolver};
//!
//! struct LegacyIds;
//!
//! impl DocumentInfoResolver for LegacyIds {
//!     fn resolve_identity_property(&self, type_name: &str) -> Option<String> {
//!         (type_name == "Invoice").then(|| "Id".to_string())
//!     }
//! }
//!
//! let mut conventions = DocumentConventions::default();
//! conventions.add_document_info_resolver(LegacyIds);
//! ```

use crate::config::RetryConfig;
use crate::error::{RavenError, RavenResult};
use ravendb_protocol::metadata;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How ids are generated for entities stored without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdGenerationStrategy {
    /// `{prefix}/{n}-{node}` from ranges reserved on the server.
    #[default]
    HiLo,
    /// `{prefix}/{uuid}` generated locally.
    Guid,
}

/// The Rust type behind a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityType {
    /// Short type name, e.g. `User` for `my_app::models::User`.
    pub name: String,
    /// True for untyped JSON values.
    pub dynamic: bool,
}

impl EntityType {
    /// Describes the type `T`.
    pub fn of<T: ?Sized>() -> Self {
        let full = std::any::type_name::<T>();
        let dynamic = full == std::any::type_name::<Value>()
            || full == std::any::type_name::<Map<String, Value>>();
        Self {
            name: short_type_name(full).to_string(),
            dynamic,
        }
    }
}

/// Strips the module path and generic arguments from a type name.
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Pluralizes an English type name into a collection name.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_ascii_lowercase();
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{word}es");
    }

    if lower.ends_with('y') {
        let before = lower.chars().rev().nth(1);
        if before.is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }

    format!("{word}s")
}

/// Resolves per-type document information.
///
/// Resolvers are consulted in registration order; the first `Some` wins.
pub trait DocumentInfoResolver: Send + Sync {
    /// Returns the collection name for a type.
    fn resolve_collection(&self, _type_name: &str) -> Option<String> {
        None
    }

    /// Returns the name of the field holding the document id.
    fn resolve_identity_property(&self, _type_name: &str) -> Option<String> {
        None
    }
}

/// One top-level attribute passing through an [`AttributeSerializer`].
///
/// Serializers read the `original_*` fields and rewrite the `serialized_*`
/// fields; the latter start out as copies of the former.
#[derive(Debug, Clone)]
pub struct SerializedAttribute<'a> {
    /// Metadata of the document being converted.
    pub metadata: &'a Map<String, Value>,
    /// Attribute name before conversion.
    pub original_attribute: String,
    /// Attribute value before conversion.
    pub original_value: Value,
    /// Attribute name after conversion.
    pub serialized_attribute: String,
    /// Attribute value after conversion.
    pub serialized_value: Value,
}

/// Renames or re-encodes document attributes on the wire.
pub trait AttributeSerializer: Send + Sync {
    /// Called for each attribute of an entity being stored.
    fn on_serialize(&self, _attribute: &mut SerializedAttribute<'_>) {}

    /// Called for each attribute of a document being loaded.
    fn on_deserialize(&self, _attribute: &mut SerializedAttribute<'_>) {}
}

/// Client-side conventions shared by a document store and its sessions.
#[derive(Clone)]
pub struct DocumentConventions {
    /// Separator between id prefix and id value.
    pub identity_parts_separator: char,
    /// Maximum number of server round-trips per session.
    pub max_number_of_requests_per_session: u32,
    /// Whether sessions send change vectors with every write.
    pub use_optimistic_concurrency: bool,
    /// HTTP request timeout.
    pub request_timeout: Duration,
    /// Retry behavior of request executors.
    pub retry: RetryConfig,
    /// Id generation for entities stored without an id.
    pub id_generation: IdGenerationStrategy,
    /// Timeout sent with non-stale query waits.
    pub wait_for_non_stale_results_timeout: Duration,
    resolvers: Vec<Arc<dyn DocumentInfoResolver>>,
    serializers: Vec<Arc<dyn AttributeSerializer>>,
}

impl Default for DocumentConventions {
    fn default() -> Self {
        Self {
            identity_parts_separator: '/',
            max_number_of_requests_per_session: 30,
            use_optimistic_concurrency: false,
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            id_generation: IdGenerationStrategy::HiLo,
            wait_for_non_stale_results_timeout: Duration::from_secs(15),
            resolvers: Vec::new(),
            serializers: Vec::new(),
        }
    }
}

impl fmt::Debug for DocumentConventions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentConventions")
            .field("identity_parts_separator", &self.identity_parts_separator)
            .field(
                "max_number_of_requests_per_session",
                &self.max_number_of_requests_per_session,
            )
            .field("use_optimistic_concurrency", &self.use_optimistic_concurrency)
            .field("request_timeout", &self.request_timeout)
            .field("id_generation", &self.id_generation)
            .field("resolvers", &self.resolvers.len())
            .field("serializers", &self.serializers.len())
            .finish()
    }
}

impl DocumentConventions {
    /// Creates conventions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of requests per session.
    pub fn with_max_requests_per_session(mut self, max: u32) -> Self {
        self.max_number_of_requests_per_session = max;
        self
    }

    /// Enables or disables optimistic concurrency.
    pub fn with_optimistic_concurrency(mut self, enabled: bool) -> Self {
        self.use_optimistic_concurrency = enabled;
        self
    }

    /// Sets the id generation strategy.
    pub fn with_id_generation(mut self, strategy: IdGenerationStrategy) -> Self {
        self.id_generation = strategy;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the HTTP request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Registers a document info resolver.
    pub fn add_document_info_resolver(&mut self, resolver: impl DocumentInfoResolver + 'static) {
        self.resolvers.push(Arc::new(resolver));
    }

    /// Registers an attribute serializer.
    pub fn add_attribute_serializer(&mut self, serializer: impl AttributeSerializer + 'static) {
        self.serializers.push(Arc::new(serializer));
    }

    /// Returns the collection name for an entity type.
    pub fn find_collection_name(&self, entity_type: &EntityType) -> String {
        if entity_type.dynamic {
            return metadata::EMPTY_COLLECTION.to_string();
        }

        self.resolvers
            .iter()
            .find_map(|r| r.resolve_collection(&entity_type.name))
            .unwrap_or_else(|| pluralize(&entity_type.name))
    }

    /// Returns the name of the id field for an entity type.
    pub fn find_identity_property(&self, entity_type: &EntityType) -> String {
        self.resolvers
            .iter()
            .find_map(|r| r.resolve_identity_property(&entity_type.name))
            .unwrap_or_else(|| "id".to_string())
    }

    /// Returns the id prefix for a collection, e.g. `users` for `Users`.
    pub fn collection_to_id_prefix(&self, collection: &str) -> String {
        collection.to_lowercase()
    }

    /// Reads a non-empty id from the entity's identity property.
    pub fn identity_of(&self, entity: &Value, entity_type: &EntityType) -> Option<String> {
        entity
            .get(self.find_identity_property(entity_type))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
    }

    /// Converts a serialized entity into a document body and its metadata.
    ///
    /// The identity property is removed from the body; the id lives in the
    /// metadata on the server.
    pub fn to_document(
        &self,
        entity: Value,
        entity_type: &EntityType,
    ) -> RavenResult<(Map<String, Value>, Map<String, Value>)> {
        let Value::Object(mut body) = entity else {
            return Err(RavenError::invalid_argument(format!(
                "entity of type '{}' must serialize to a JSON object",
                entity_type.name
            )));
        };

        // Dynamic documents carry their own metadata.
        let mut meta = match body.remove(metadata::METADATA) {
            Some(Value::Object(meta)) if entity_type.dynamic => meta,
            _ => Map::new(),
        };
        if !entity_type.dynamic {
            body.remove(&self.find_identity_property(entity_type));
        }

        meta.entry(metadata::COLLECTION)
            .or_insert_with(|| Value::String(self.find_collection_name(entity_type)));
        if !entity_type.dynamic {
            meta.insert(
                metadata::RAVEN_RUST_TYPE.to_string(),
                Value::String(entity_type.name.clone()),
            );
        }

        let body = self.apply_serializers(body, &meta, |s, a| s.on_serialize(a));
        Ok((body, meta))
    }

    /// Converts a stored document body back into an entity.
    pub fn from_document<T: DeserializeOwned>(
        &self,
        body: &Map<String, Value>,
        meta: &Map<String, Value>,
        id: &str,
        entity_type: &EntityType,
    ) -> RavenResult<T> {
        let mut body = self.apply_serializers(body.clone(), meta, |s, a| s.on_deserialize(a));
        if entity_type.dynamic {
            body.insert(metadata::METADATA.to_string(), Value::Object(meta.clone()));
        } else {
            body.insert(
                self.find_identity_property(entity_type),
                Value::String(id.to_string()),
            );
        }
        Ok(serde_json::from_value(Value::Object(body))?)
    }

    fn apply_serializers<F>(
        &self,
        body: Map<String, Value>,
        meta: &Map<String, Value>,
        apply: F,
    ) -> Map<String, Value>
    where
        F: Fn(&dyn AttributeSerializer, &mut SerializedAttribute<'_>),
    {
        if self.serializers.is_empty() {
            return body;
        }

        body.into_iter()
            .map(|(name, value)| {
                let mut attribute = SerializedAttribute {
                    metadata: meta,
                    original_attribute: name.clone(),
                    original_value: value.clone(),
                    serialized_attribute: name,
                    serialized_value: value,
                };
                for serializer in &self.serializers {
                    apply(serializer.as_ref(), &mut attribute);
                }
                (attribute.serialized_attribute, attribute.serialized_value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Company {
        id: Option<String>,
        name: String,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[allow(non_snake_case)]
    struct Invoice {
        Id: Option<String>,
        Items: Vec<u32>,
    }

    struct InvoiceResolver;

    impl DocumentInfoResolver for InvoiceResolver {
        fn resolve_collection(&self, type_name: &str) -> Option<String> {
            (type_name == "Invoice").then(|| "Billing".to_string())
        }

        fn resolve_identity_property(&self, type_name: &str) -> Option<String> {
            (type_name == "Invoice").then(|| "Id".to_string())
        }
    }

    struct CommaItems;

    impl AttributeSerializer for CommaItems {
        fn on_serialize(&self, attribute: &mut SerializedAttribute<'_>) {
            if attribute.metadata.get(metadata::RAVEN_RUST_TYPE) != Some(&json!("Invoice")) {
                return;
            }
            attribute.serialized_attribute = attribute.original_attribute.to_lowercase();
            if attribute.original_attribute == "Items" {
                let joined = attribute
                    .original_value
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .map(|v| v.to_string())
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .unwrap_or_default();
                attribute.serialized_value = Value::String(joined);
            }
        }

        fn on_deserialize(&self, attribute: &mut SerializedAttribute<'_>) {
            if attribute.metadata.get(metadata::RAVEN_RUST_TYPE) != Some(&json!("Invoice")) {
                return;
            }
            if attribute.original_attribute == "items" {
                attribute.serialized_attribute = "Items".into();
                let items: Vec<Value> = attribute
                    .original_value
                    .as_str()
                    .unwrap_or_default()
                    .split(',')
                    .filter_map(|s| s.parse::<u32>().ok())
                    .map(Value::from)
                    .collect();
                attribute.serialized_value = Value::Array(items);
            }
        }
    }

    #[test]
    fn short_type_names() {
        assert_eq!(short_type_name("my_app::models::User"), "User");
        assert_eq!(short_type_name("Wrapper<my_app::User>"), "Wrapper");
        assert_eq!(short_type_name("User"), "User");
    }

    #[test]
    fn pluralization_rules() {
        assert_eq!(pluralize("User"), "Users");
        assert_eq!(pluralize("Company"), "Companies");
        assert_eq!(pluralize("Key"), "Keys");
        assert_eq!(pluralize("Box"), "Boxes");
        assert_eq!(pluralize("Address"), "Addresses");
        assert_eq!(pluralize("Batch"), "Batches");
        assert_eq!(pluralize(""), "");
    }

    #[test]
    fn dynamic_values_use_empty_collection() {
        let conventions = DocumentConventions::default();
        let entity_type = EntityType::of::<Value>();
        assert!(entity_type.dynamic);
        assert_eq!(conventions.find_collection_name(&entity_type), "@empty");
    }

    #[test]
    fn resolvers_override_defaults() {
        let mut conventions = DocumentConventions::default();
        conventions.add_document_info_resolver(InvoiceResolver);

        let invoice = EntityType::of::<Invoice>();
        assert_eq!(conventions.find_collection_name(&invoice), "Billing");
        assert_eq!(conventions.find_identity_property(&invoice), "Id");

        let company = EntityType::of::<Company>();
        assert_eq!(conventions.find_collection_name(&company), "Companies");
        assert_eq!(conventions.find_identity_property(&company), "id");
    }

    #[test]
    fn to_document_strips_identity_and_adds_metadata() {
        let conventions = DocumentConventions::default();
        let entity = serde_json::to_value(Company {
            id: Some("companies/1-A".into()),
            name: "Acme".into(),
        })
        .unwrap();

        let entity_type = EntityType::of::<Company>();
        assert_eq!(
            conventions.identity_of(&entity, &entity_type).as_deref(),
            Some("companies/1-A")
        );

        let (body, meta) = conventions.to_document(entity, &entity_type).unwrap();
        assert!(!body.contains_key("id"));
        assert_eq!(body["name"], "Acme");
        assert_eq!(meta[metadata::COLLECTION], "Companies");
        assert_eq!(meta[metadata::RAVEN_RUST_TYPE], "Company");
    }

    #[test]
    fn dynamic_documents_keep_their_metadata() {
        let conventions = DocumentConventions::default();
        let entity = json!({"name": "Ann", "@metadata": {"@collection": "People", "Owner": "x"}});

        let (body, meta) = conventions
            .to_document(entity, &EntityType::of::<Value>())
            .unwrap();
        assert!(!body.contains_key(metadata::METADATA));
        assert_eq!(meta[metadata::COLLECTION], "People");
        assert_eq!(meta["Owner"], "x");
        assert!(!meta.contains_key(metadata::RAVEN_RUST_TYPE));
    }

    #[test]
    fn to_document_rejects_non_objects() {
        let conventions = DocumentConventions::default();
        let err = conventions
            .to_document(json!([1, 2, 3]), &EntityType::of::<Vec<u32>>())
            .unwrap_err();
        assert!(matches!(err, RavenError::InvalidArgument(_)));
    }

    #[test]
    fn from_document_restores_identity() {
        let conventions = DocumentConventions::default();
        let body = json!({ "name": "Acme" }).as_object().unwrap().clone();
        let company: Company = conventions
            .from_document(&body, &Map::new(), "companies/7-A", &EntityType::of::<Company>())
            .unwrap();
        assert_eq!(company.id.as_deref(), Some("companies/7-A"));
        assert_eq!(company.name, "Acme");
    }

    #[test]
    fn attribute_serializer_converts_both_ways() {
        let mut conventions = DocumentConventions::default();
        conventions.add_document_info_resolver(InvoiceResolver);
        conventions.add_attribute_serializer(CommaItems);

        let entity_type = EntityType::of::<Invoice>();
        let invoice = Invoice {
            Id: Some("billing/1-A".into()),
            Items: vec![1, 2, 3],
        };
        let (body, meta) = conventions
            .to_document(serde_json::to_value(&invoice).unwrap(), &entity_type)
            .unwrap();
        assert_eq!(body["items"], "1,2,3");
        assert!(!body.contains_key("Items"));

        let restored: Invoice = conventions
            .from_document(&body, &meta, "billing/1-A", &entity_type)
            .unwrap();
        assert_eq!(restored, invoice);
    }

    proptest! {
        #[test]
        fn plural_always_extends_word(word in "[A-Z][a-z]{0,10}") {
            let plural = pluralize(&word);
            prop_assert!(plural.len() > word.len());
            prop_assert!(plural.ends_with('s'));
        }
    }
}
