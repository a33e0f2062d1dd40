//! HiLo identifier generation.
//!
//! A generator reserves a range of numbers per tag from the server and hands
//! them out locally until the range is exhausted. Ids have the form
//! `{prefix}{n}-{serverTag}`, e.g. `users/17-A`.

use crate::commands::NextHiLoCommand;
use crate::conventions::{DocumentConventions, EntityType, IdGenerationStrategy};
use crate::error::{RavenError, RavenResult};
use crate::http::RequestExecutor;
use parking_lot::Mutex;
use ravendb_protocol::HiLoResult;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct Range {
    next: i64,
    result: HiLoResult,
}

/// Generates ids for a single tag.
#[derive(Debug)]
pub struct HiLoIdGenerator {
    tag: String,
    separator: char,
    range: tokio::sync::Mutex<Option<Range>>,
}

impl HiLoIdGenerator {
    /// Creates a generator for a tag.
    pub fn new(tag: impl Into<String>, separator: char) -> Self {
        Self {
            tag: tag.into(),
            separator,
            range: tokio::sync::Mutex::new(None),
        }
    }

    /// Returns the tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the next id, reserving a new range when needed.
    pub async fn next_id(&self, executor: &RequestExecutor) -> RavenResult<String> {
        let mut guard = self.range.lock().await;

        let exhausted = guard.as_ref().map_or(true, |r| r.next > r.result.high);
        if exhausted {
            let mut command = NextHiLoCommand::new(self.tag.clone(), self.separator);
            if let Some(previous) = guard.as_ref() {
                command.last_batch_size = previous.result.last_size;
                command.last_range_at = Some(previous.result.last_range_at.clone());
                command.last_range_max = previous.result.high;
            }

            let result = executor.execute(&command).await?;
            debug!(
                tag = %self.tag,
                low = result.low,
                high = result.high,
                "reserved hilo range"
            );
            *guard = Some(Range {
                next: result.low,
                result,
            });
        }

        let Some(range) = guard.as_mut() else {
            return Err(RavenError::invalid_operation("no hilo range reserved"));
        };
        let value = range.next;
        range.next += 1;
        Ok(format!(
            "{}{}-{}",
            range.result.prefix, value, range.result.server_tag
        ))
    }
}

/// Generators keyed by database and tag.
#[derive(Debug, Default)]
pub struct MultiDatabaseHiLoGenerator {
    generators: Mutex<HashMap<(String, String), Arc<HiLoIdGenerator>>>,
}

impl MultiDatabaseHiLoGenerator {
    /// Creates an empty generator set.
    pub fn new() -> Self {
        Self::default()
    }

    fn generator(&self, database: &str, tag: &str, separator: char) -> Arc<HiLoIdGenerator> {
        let key = (database.to_lowercase(), tag.to_string());
        self.generators
            .lock()
            .entry(key)
            .or_insert_with(|| Arc::new(HiLoIdGenerator::new(tag, separator)))
            .clone()
    }

    /// Generates an id for a new entity of the given type.
    ///
    /// Dynamic JSON values get a bare UUID.
    pub async fn generate_document_id(
        &self,
        conventions: &DocumentConventions,
        executor: &RequestExecutor,
        entity_type: &EntityType,
    ) -> RavenResult<String> {
        if entity_type.dynamic {
            return Ok(uuid::Uuid::new_v4().to_string());
        }

        let collection = conventions.find_collection_name(entity_type);
        let tag = conventions.collection_to_id_prefix(&collection);

        match conventions.id_generation {
            IdGenerationStrategy::Guid => Ok(format!(
                "{tag}{}{}",
                conventions.identity_parts_separator,
                uuid::Uuid::new_v4()
            )),
            IdGenerationStrategy::HiLo => {
                let database = executor.database().unwrap_or_default();
                let generator =
                    self.generator(database, &tag, conventions.identity_parts_separator);
                generator.next_id(executor).await
            }
        }
    }
}
