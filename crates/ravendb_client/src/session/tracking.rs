//! Identity map of a session.

use crate::conventions::EntityType;
use ravendb_protocol::metadata;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A document tracked by a session.
#[derive(Debug, Clone)]
pub(crate) struct DocumentInfo {
    pub id: String,
    pub entity_type: EntityType,
    pub document: Map<String, Value>,
    pub metadata: Map<String, Value>,
    /// Snapshot taken when loaded or last saved, `None` for new documents.
    pub original: Option<Map<String, Value>>,
    pub original_metadata: Map<String, Value>,
    pub change_vector: Option<String>,
    /// Change vector passed to `store_with_change_vector`.
    pub forced_change_vector: Option<String>,
}

impl DocumentInfo {
    pub fn new_entity(
        id: String,
        entity_type: EntityType,
        document: Map<String, Value>,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            id,
            entity_type,
            document,
            metadata,
            original: None,
            original_metadata: Map::new(),
            change_vector: None,
            forced_change_vector: None,
        }
    }

    /// Builds an entry from a document returned by the server.
    pub fn loaded(
        id: String,
        entity_type: EntityType,
        document: Map<String, Value>,
        metadata: Map<String, Value>,
    ) -> Self {
        let change_vector = metadata
            .get(metadata::CHANGE_VECTOR)
            .and_then(Value::as_str)
            .map(str::to_owned);
        Self {
            id,
            entity_type,
            original: Some(document.clone()),
            original_metadata: metadata.clone(),
            document,
            metadata,
            change_vector,
            forced_change_vector: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.original.is_none()
    }

    pub fn has_changed(&self) -> bool {
        match &self.original {
            None => true,
            Some(original) => {
                original != &self.document
                    || self.original_metadata != self.metadata
                    || self.forced_change_vector.is_some()
            }
        }
    }

    /// Marks the current state as persisted with the given change vector.
    pub fn mark_saved(&mut self, change_vector: Option<String>) {
        if let Some(cv) = &change_vector {
            self.metadata
                .insert(metadata::CHANGE_VECTOR.to_string(), Value::String(cv.clone()));
        }
        self.metadata
            .insert(metadata::ID.to_string(), Value::String(self.id.clone()));
        self.change_vector = change_vector.or(self.change_vector.take());
        self.forced_change_vector = None;
        self.original = Some(self.document.clone());
        self.original_metadata = self.metadata.clone();
    }
}

/// Tracked documents keyed by case-insensitive id, in insertion order.
#[derive(Debug, Default)]
pub(crate) struct DocumentsById {
    entries: HashMap<String, DocumentInfo>,
    order: Vec<String>,
}

/// Identity-map key for a document id.
pub(crate) fn key(id: &str) -> String {
    id.to_lowercase()
}

impl DocumentsById {
    pub fn get(&self, id: &str) -> Option<&DocumentInfo> {
        self.entries.get(&key(id))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut DocumentInfo> {
        self.entries.get_mut(&key(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(&key(id))
    }

    pub fn insert(&mut self, info: DocumentInfo) {
        let k = key(&info.id);
        if self.entries.insert(k.clone(), info).is_none() {
            self.order.push(k);
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<DocumentInfo> {
        let k = key(id);
        let removed = self.entries.remove(&k);
        if removed.is_some() {
            self.order.retain(|o| o != &k);
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentInfo> {
        self.order.iter().filter_map(|k| self.entries.get(k))
    }

    pub fn keys_in_order(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Ids deleted in a session, with their expected change vectors.
#[derive(Debug, Default)]
pub(crate) struct DeletedDocuments {
    entries: Vec<(String, Option<String>)>,
}

impl DeletedDocuments {
    pub fn contains(&self, id: &str) -> bool {
        let id = key(id);
        self.entries.iter().any(|(d, _)| key(d) == id)
    }

    pub fn insert(&mut self, id: String, change_vector: Option<String>) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(d, _)| key(d) == key(&id))
        {
            if change_vector.is_some() {
                entry.1 = change_vector;
            }
            return;
        }
        self.entries.push((id, change_vector));
    }

    pub fn remove(&mut self, id: &str) {
        let id = key(id);
        self.entries.retain(|(d, _)| key(d) != id);
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Option<String>)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn user_type() -> EntityType {
        EntityType {
            name: "User".into(),
            dynamic: false,
        }
    }

    #[test]
    fn ids_are_case_insensitive() {
        let mut docs = DocumentsById::default();
        docs.insert(DocumentInfo::new_entity(
            "Users/1".into(),
            user_type(),
            doc(json!({ "name": "A" })),
            Map::new(),
        ));
        assert!(docs.contains("users/1"));
        assert!(docs.get("USERS/1").is_some());
        assert_eq!(docs.len(), 1);

        docs.insert(DocumentInfo::new_entity(
            "users/1".into(),
            user_type(),
            doc(json!({ "name": "B" })),
            Map::new(),
        ));
        assert_eq!(docs.len(), 1);
        assert_eq!(docs.keys_in_order(), vec!["users/1"]);

        assert!(docs.remove("USERS/1").is_some());
        assert_eq!(docs.iter().count(), 0);
    }

    #[test]
    fn detects_changes_against_snapshot() {
        let mut info = DocumentInfo::loaded(
            "users/1".into(),
            user_type(),
            doc(json!({ "name": "A" })),
            doc(json!({ "@change-vector": "A:1" })),
        );
        assert!(!info.is_new());
        assert!(!info.has_changed());
        assert_eq!(info.change_vector.as_deref(), Some("A:1"));

        info.document.insert("name".into(), json!("B"));
        assert!(info.has_changed());

        info.mark_saved(Some("A:2".into()));
        assert!(!info.has_changed());
        assert_eq!(info.change_vector.as_deref(), Some("A:2"));
        assert_eq!(info.metadata.get("@change-vector"), Some(&json!("A:2")));
    }

    #[test]
    fn deleted_keeps_latest_change_vector() {
        let mut deleted = DeletedDocuments::default();
        deleted.insert("users/1".into(), None);
        deleted.insert("Users/1".into(), Some("A:3".into()));
        assert!(deleted.contains("USERS/1"));
        assert_eq!(deleted.iter().count(), 1);
        assert_eq!(deleted.iter().next().unwrap().1.as_deref(), Some("A:3"));

        deleted.remove("users/1");
        assert!(deleted.is_empty());
    }

    #[test]
    fn deleted_ids_fold_case_like_the_identity_map() {
        let mut deleted = DeletedDocuments::default();
        deleted.insert("Äpfel/1".into(), None);
        assert!(deleted.contains("äpfel/1"));

        deleted.insert("ÄPFEL/1".into(), None);
        assert_eq!(deleted.iter().count(), 1);

        deleted.remove("äpfel/1");
        assert!(deleted.is_empty());
    }
}
