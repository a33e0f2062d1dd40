//! Fluent RQL query builder.

use super::DocumentSession;
use crate::commands::QueryCommand;
use crate::conventions::EntityType;
use crate::error::{RavenError, RavenResult};
use crate::events::BeforeQueryEventArgs;
use ravendb_protocol::{metadata, IndexQuery, QueryResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Source {
    Collection(String),
    Index(String),
    Raw(String),
}

/// A query over a collection or index, built clause by clause.
///
/// Values are always sent as named parameters (`$p0`, `$p1`, ...):
///
/// ```ignore
/// let users: Vec<User> = session
///     .query::<User>()
///     .where_equals("name", "Alice")
///     .or_else()
///     .where_greater_than("age", 30)
///     .order_by_descending("age")
///     .take(10)
///     .all()
///     .await?;
/// // from 'Users' where name = $p0 or age > $p1 order by age desc
/// ```
pub struct DocumentQuery<'s, T> {
    session: &'s mut DocumentSession,
    source: Source,
    where_tokens: Vec<String>,
    next_connector: Option<&'static str>,
    order_by: Vec<String>,
    parameters: Map<String, Value>,
    start: usize,
    page_size: Option<usize>,
    wait_for_non_stale_results: bool,
    error: Option<RavenError>,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T: DeserializeOwned> DocumentQuery<'s, T> {
    fn new(session: &'s mut DocumentSession, source: Source) -> Self {
        Self {
            session,
            source,
            where_tokens: Vec::new(),
            next_connector: None,
            order_by: Vec::new(),
            parameters: Map::new(),
            start: 0,
            page_size: None,
            wait_for_non_stale_results: false,
            error: None,
            _entity: PhantomData,
        }
    }

    pub(crate) fn collection(session: &'s mut DocumentSession, collection: String) -> Self {
        Self::new(session, Source::Collection(collection))
    }

    pub(crate) fn index(session: &'s mut DocumentSession, index_name: String) -> Self {
        Self::new(session, Source::Index(index_name))
    }

    pub(crate) fn raw(session: &'s mut DocumentSession, rql: String) -> Self {
        Self::new(session, Source::Raw(rql))
    }

    fn add_parameter<V: Serialize>(&mut self, value: V) -> String {
        let name = format!("p{}", self.parameters.len());
        match serde_json::to_value(value) {
            Ok(value) => {
                self.parameters.insert(name.clone(), value);
            }
            Err(e) => {
                self.error.get_or_insert(RavenError::Serialization(e));
            }
        }
        format!("${name}")
    }

    fn add_where(mut self, clause: String) -> Self {
        if let Source::Raw(_) = self.source {
            self.error.get_or_insert(RavenError::invalid_operation(
                "where clauses cannot be added to a raw query",
            ));
            return self;
        }
        if !self.where_tokens.is_empty() {
            let connector = self.next_connector.take().unwrap_or("and");
            self.where_tokens.push(connector.to_string());
        }
        self.next_connector = None;
        self.where_tokens.push(clause);
        self
    }

    fn comparison<V: Serialize>(mut self, field: &str, op: &str, value: V) -> Self {
        let parameter = self.add_parameter(value);
        let clause = format!("{} {op} {parameter}", escape_field(field));
        self.add_where(clause)
    }

    /// `field = value`.
    pub fn where_equals<V: Serialize>(self, field: &str, value: V) -> Self {
        self.comparison(field, "=", value)
    }

    /// `field != value`.
    pub fn where_not_equals<V: Serialize>(self, field: &str, value: V) -> Self {
        self.comparison(field, "!=", value)
    }

    /// `field > value`.
    pub fn where_greater_than<V: Serialize>(self, field: &str, value: V) -> Self {
        self.comparison(field, ">", value)
    }

    /// `field >= value`.
    pub fn where_greater_than_or_equal<V: Serialize>(self, field: &str, value: V) -> Self {
        self.comparison(field, ">=", value)
    }

    /// `field < value`.
    pub fn where_less_than<V: Serialize>(self, field: &str, value: V) -> Self {
        self.comparison(field, "<", value)
    }

    /// `field <= value`.
    pub fn where_less_than_or_equal<V: Serialize>(self, field: &str, value: V) -> Self {
        self.comparison(field, "<=", value)
    }

    /// `field in (values)`.
    pub fn where_in<V, I>(mut self, field: &str, values: I) -> Self
    where
        V: Serialize,
        I: IntoIterator<Item = V>,
    {
        let values: Vec<V> = values.into_iter().collect();
        let parameter = self.add_parameter(values);
        let clause = format!("{} in ({parameter})", escape_field(field));
        self.add_where(clause)
    }

    /// `startsWith(field, prefix)`.
    pub fn where_starts_with(mut self, field: &str, prefix: &str) -> Self {
        let parameter = self.add_parameter(prefix);
        let clause = format!("startsWith({}, {parameter})", escape_field(field));
        self.add_where(clause)
    }

    /// Joins the next clause with `and` (the default).
    pub fn and_also(mut self) -> Self {
        self.next_connector = Some("and");
        self
    }

    /// Joins the next clause with `or`.
    pub fn or_else(mut self) -> Self {
        self.next_connector = Some("or");
        self
    }

    /// Sorts ascending by a field.
    pub fn order_by(mut self, field: &str) -> Self {
        self.order_by.push(escape_field(field));
        self
    }

    /// Sorts descending by a field.
    pub fn order_by_descending(mut self, field: &str) -> Self {
        self.order_by.push(format!("{} desc", escape_field(field)));
        self
    }

    /// Skips the first `count` results.
    pub fn skip(mut self, count: usize) -> Self {
        self.start = count;
        self
    }

    /// Returns at most `count` results.
    pub fn take(mut self, count: usize) -> Self {
        self.page_size = Some(count);
        self
    }

    /// Waits until the index has processed all pending writes.
    pub fn wait_for_non_stale_results(mut self) -> Self {
        self.wait_for_non_stale_results = true;
        self
    }

    /// Returns the RQL text of the query.
    pub fn to_rql(&self) -> String {
        let from = match &self.source {
            Source::Raw(rql) => return rql.clone(),
            Source::Collection(collection) => format!("from '{}'", escape_literal(collection)),
            Source::Index(index) => format!("from index '{}'", escape_literal(index)),
        };

        let mut rql = from;
        if !self.where_tokens.is_empty() {
            rql.push_str(" where ");
            rql.push_str(&self.where_tokens.join(" "));
        }
        if !self.order_by.is_empty() {
            rql.push_str(" order by ");
            rql.push_str(&self.order_by.join(", "));
        }
        rql
    }

    /// Builds the request body without sending it.
    ///
    /// Fails with the first error recorded while building the query.
    pub fn to_index_query(&mut self) -> RavenResult<IndexQuery> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }

        let mut query = IndexQuery::new(self.to_rql());
        query.query_parameters = self.parameters.clone();
        query.start = self.start;
        query.page_size = self.page_size;
        if self.wait_for_non_stale_results {
            query.wait_for_non_stale_results = true;
            query.wait_for_non_stale_results_timeout = Some(format_timespan(
                self.session.conventions().wait_for_non_stale_results_timeout,
            ));
        }
        Ok(query)
    }

    async fn execute(&mut self, mut query: IndexQuery) -> RavenResult<QueryResult> {
        self.session
            .listeners()
            .before_query(&mut BeforeQueryEventArgs {
                session_id: self.session.id(),
                query: &mut query,
            });

        self.session.increment_requests()?;
        let executor = self.session.executor().clone();
        executor.execute(&QueryCommand::new(query)).await
    }

    /// Runs the query and returns every result.
    pub async fn all(mut self) -> RavenResult<Vec<T>> {
        let query = self.to_index_query()?;
        let result = self.execute(query).await?;

        let entity_type = EntityType::of::<T>();
        let mut entities = Vec::with_capacity(result.results.len());
        for value in result.results {
            let Value::Object(raw) = value else {
                entities.push(serde_json::from_value(value)?);
                continue;
            };

            match metadata::metadata_str(&raw, metadata::ID).map(str::to_owned) {
                Some(id) => {
                    let id = self.session.track_loaded(&id, raw, &entity_type);
                    if let Some(entity) = self.session.tracked_entity::<T>(&id, &entity_type)? {
                        entities.push(entity);
                    }
                }
                None => {
                    let (body, _) = metadata::split_metadata(raw);
                    entities.push(serde_json::from_value(Value::Object(body))?);
                }
            }
        }
        Ok(entities)
    }

    /// Runs the query and returns the first result.
    pub async fn first(self) -> RavenResult<Option<T>> {
        Ok(self.take(1).all().await?.into_iter().next())
    }

    /// Returns the number of matching documents without fetching them.
    pub async fn count(mut self) -> RavenResult<u64> {
        let mut query = self.to_index_query()?;
        query.page_size = Some(0);
        Ok(self.execute(query).await?.total_results)
    }
}

fn escape_field(field: &str) -> String {
    let simple = field
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '@');
    if simple && !field.is_empty() {
        field.to_string()
    } else {
        format!("'{}'", escape_literal(field))
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Formats a duration as `hh:mm:ss`, or `d.hh:mm:ss` past a day.
fn format_timespan(duration: Duration) -> String {
    let total = duration.as_secs();
    let (days, rest) = (total / 86_400, total % 86_400);
    let (hours, minutes, seconds) = (rest / 3600, (rest % 3600) / 60, rest % 60);
    if days > 0 {
        format!("{days}.{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}
