use crate::error::RavenResult;
use crate::http::{HttpRequest, HttpResponse, Method, RavenCommand, ServerNode};
use ravendb_protocol::{IndexQuery, QueryResult};

/// Runs an RQL query: `POST /databases/{db}/queries`.
#[derive(Debug, Clone)]
pub struct QueryCommand {
    query: IndexQuery,
}

impl QueryCommand {
    /// Creates a query command.
    pub fn new(query: IndexQuery) -> Self {
        Self { query }
    }

    /// Returns the query.
    pub fn query(&self) -> &IndexQuery {
        &self.query
    }
}

impl RavenCommand for QueryCommand {
    type Output = QueryResult;

    fn create_request(&self, node: &ServerNode) -> RavenResult<HttpRequest> {
        let mut url = node.database_endpoint(&["queries"])?;
        if self.query.wait_for_non_stale_results {
            url.query_pairs_mut().append_pair("waitForNonStaleResults", "true");
        }
        HttpRequest::new(Method::Post, url).with_json_body(&self.query)
    }

    fn parse_response(&self, response: HttpResponse) -> RavenResult<Self::Output> {
        response.json_body()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posts_index_query() {
        let mut query = IndexQuery::new("from 'Users' where name = $p0");
        query
            .query_parameters
            .insert("p0".into(), serde_json::Value::from("Alice"));
        query.wait_for_non_stale_results = true;

        let node = ServerNode::new("http://a:8080", Some("db".into()));
        let request = QueryCommand::new(query.clone()).create_request(&node).unwrap();

        assert_eq!(request.url.path(), "/databases/db/queries");
        assert_eq!(request.query_value("waitForNonStaleResults").as_deref(), Some("true"));
        assert_eq!(request.json_body::<IndexQuery>().unwrap(), query);
    }
}
