use super::Operation;
use crate::conventions::DocumentConventions;
use crate::error::{RavenError, RavenResult};
use crate::http::{HttpRequest, HttpResponse, Method, RavenCommand, ServerNode};
use ravendb_protocol::{IndexQuery, OperationIdResult};

/// Deletes every document matched by a query.
///
/// The server runs the deletion in the background and returns its
/// operation id.
#[derive(Debug, Clone)]
pub struct DeleteByQueryOperation {
    query: IndexQuery,
}

impl DeleteByQueryOperation {
    /// Creates the operation.
    pub fn new(query: IndexQuery) -> Self {
        Self { query }
    }

    /// Creates the operation from RQL text.
    pub fn from_rql(rql: impl Into<String>) -> Self {
        Self::new(IndexQuery::new(rql))
    }
}

impl Operation for DeleteByQueryOperation {
    type Command = DeleteByQueryCommand;

    fn get_command(&self, _conventions: &DocumentConventions) -> RavenResult<Self::Command> {
        if self.query.query.trim().is_empty() {
            return Err(RavenError::invalid_argument("Query cannot be null or empty"));
        }
        Ok(DeleteByQueryCommand {
            query: self.query.clone(),
        })
    }
}

/// `DELETE /databases/{db}/queries`.
#[derive(Debug, Clone)]
pub struct DeleteByQueryCommand {
    query: IndexQuery,
}

impl RavenCommand for DeleteByQueryCommand {
    type Output = OperationIdResult;

    fn create_request(&self, node: &ServerNode) -> RavenResult<HttpRequest> {
        HttpRequest::new(Method::Delete, node.database_endpoint(&["queries"])?)
            .with_json_body(&self.query)
    }

    fn parse_response(&self, response: HttpResponse) -> RavenResult<Self::Output> {
        response.json_body()
    }
}
