//! Index creation tasks.
//!
//! An index is declared as a type implementing [`IndexCreationTask`] and
//! deployed with `DocumentStore::execute_index`:
//!
//! ```ignore
//! struct Users_ByName;
//!
//! impl IndexCreationTask for Users_ByName {
//!     fn map(&self) -> String {
//!         "from u in docs.Users select new { u.name }".into()
//!     }
//! }
//!
//! store.execute_index(&Users_ByName, None).await?;
//! ```

use crate::conventions::short_type_name;
use crate::error::RavenResult;
use crate::store::DocumentStore;
use async_trait::async_trait;
use ravendb_protocol::{IndexDefinition, IndexLockMode, IndexPriority};
use std::collections::BTreeMap;

/// A statically declared index.
#[async_trait]
pub trait IndexCreationTask: Send + Sync {
    /// Map function.
    fn map(&self) -> String;

    /// Reduce function for map-reduce indexes.
    fn reduce(&self) -> Option<String> {
        None
    }

    /// Indexing priority.
    fn priority(&self) -> IndexPriority {
        IndexPriority::Normal
    }

    /// Lock mode.
    fn lock_mode(&self) -> IndexLockMode {
        IndexLockMode::Unlock
    }

    /// Per-index configuration overrides.
    fn configuration(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Index name. Defaults to the type name with `_` replaced by `/`,
    /// so `Users_ByName` becomes `Users/ByName`.
    fn index_name(&self) -> String {
        short_type_name(std::any::type_name::<Self>()).replace('_', "/")
    }

    /// Builds the definition sent to the server.
    fn create_index_definition(&self) -> IndexDefinition {
        let mut definition = IndexDefinition::new(self.index_name(), self.map());
        definition.reduce = self.reduce();
        definition.priority = self.priority();
        definition.lock_mode = self.lock_mode();
        definition.configuration = self.configuration();
        definition
    }

    /// Deploys the index to `database`, or to the store's database.
    async fn execute(&self, store: &DocumentStore, database: Option<&str>) -> RavenResult<()>
    where
        Self: Sized,
    {
        store.execute_index(self, database).await
    }
}

/// Helpers for deploying several indexes at once.
#[derive(Debug)]
pub struct IndexCreation;

impl IndexCreation {
    /// Builds the definitions for a set of tasks.
    pub fn create_indexes_to_add(tasks: &[&dyn IndexCreationTask]) -> Vec<IndexDefinition> {
        tasks
            .iter()
            .map(|task| task.create_index_definition())
            .collect()
    }
}
