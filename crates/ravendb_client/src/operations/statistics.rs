use super::MaintenanceOperation;
use crate::conventions::DocumentConventions;
use crate::error::RavenResult;
use crate::http::{HttpRequest, HttpResponse, Method, RavenCommand, ServerNode};
use ravendb_protocol::DatabaseStatistics;

/// Reads database statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetStatisticsOperation;

impl GetStatisticsOperation {
    /// Creates the operation.
    pub fn new() -> Self {
        Self
    }
}

impl MaintenanceOperation for GetStatisticsOperation {
    type Command = GetStatisticsCommand;

    fn get_command(&self, _conventions: &DocumentConventions) -> RavenResult<Self::Command> {
        Ok(GetStatisticsCommand)
    }
}

/// `GET /databases/{db}/stats`.
#[derive(Debug, Clone, Copy)]
pub struct GetStatisticsCommand;

impl RavenCommand for GetStatisticsCommand {
    type Output = DatabaseStatistics;

    fn create_request(&self, node: &ServerNode) -> RavenResult<HttpRequest> {
        Ok(HttpRequest::new(Method::Get, node.database_endpoint(&["stats"])?))
    }

    fn parse_response(&self, response: HttpResponse) -> RavenResult<Self::Output> {
        response.json_body()
    }
}
