use super::MaintenanceOperation;
use crate::conventions::DocumentConventions;
use crate::error::{RavenError, RavenResult};
use crate::http::{HttpRequest, HttpResponse, Method, RavenCommand, ServerNode};
use ravendb_protocol::{
    IndexDefinition, IndexNamesResult, PutIndexResult, PutIndexesRequest, PutIndexesResponse,
};

/// Creates or updates indexes.
#[derive(Debug, Clone)]
pub struct PutIndexesOperation {
    indexes: Vec<IndexDefinition>,
}

impl PutIndexesOperation {
    /// Creates the operation.
    pub fn new(indexes: Vec<IndexDefinition>) -> RavenResult<Self> {
        if indexes.is_empty() {
            return Err(RavenError::invalid_argument("indexes cannot be empty"));
        }
        if let Some(index) = indexes.iter().find(|i| i.name.is_empty()) {
            return Err(RavenError::invalid_argument(format!(
                "index name cannot be empty (maps: {:?})",
                index.maps
            )));
        }
        Ok(Self { indexes })
    }
}

impl MaintenanceOperation for PutIndexesOperation {
    type Command = PutIndexesCommand;

    fn get_command(&self, _conventions: &DocumentConventions) -> RavenResult<Self::Command> {
        Ok(PutIndexesCommand {
            request: PutIndexesRequest {
                indexes: self.indexes.clone(),
            },
        })
    }
}

/// `PUT /databases/{db}/admin/indexes`.
#[derive(Debug, Clone)]
pub struct PutIndexesCommand {
    request: PutIndexesRequest,
}

impl RavenCommand for PutIndexesCommand {
    type Output = Vec<PutIndexResult>;

    fn create_request(&self, node: &ServerNode) -> RavenResult<HttpRequest> {
        HttpRequest::new(Method::Put, node.database_endpoint(&["admin", "indexes"])?)
            .with_json_body(&self.request)
    }

    fn parse_response(&self, response: HttpResponse) -> RavenResult<Self::Output> {
        Ok(response.json_body::<PutIndexesResponse>()?.results)
    }
}

/// Lists index names.
#[derive(Debug, Clone, Copy)]
pub struct GetIndexNamesOperation {
    start: usize,
    page_size: usize,
}

impl GetIndexNamesOperation {
    /// Creates the operation for one page of names.
    pub fn new(start: usize, page_size: usize) -> Self {
        Self { start, page_size }
    }
}

impl MaintenanceOperation for GetIndexNamesOperation {
    type Command = GetIndexNamesCommand;

    fn get_command(&self, _conventions: &DocumentConventions) -> RavenResult<Self::Command> {
        Ok(GetIndexNamesCommand {
            start: self.start,
            page_size: self.page_size,
        })
    }
}

/// `GET /databases/{db}/indexes?namesOnly=true`.
#[derive(Debug, Clone)]
pub struct GetIndexNamesCommand {
    start: usize,
    page_size: usize,
}

impl RavenCommand for GetIndexNamesCommand {
    type Output = Vec<String>;

    fn create_request(&self, node: &ServerNode) -> RavenResult<HttpRequest> {
        let mut url = node.database_endpoint(&["indexes"])?;
        url.query_pairs_mut()
            .append_pair("start", &self.start.to_string())
            .append_pair("pageSize", &self.page_size.to_string())
            .append_pair("namesOnly", "true");
        Ok(HttpRequest::new(Method::Get, url))
    }

    fn parse_response(&self, response: HttpResponse) -> RavenResult<Self::Output> {
        Ok(response.json_body::<IndexNamesResult>()?.results)
    }
}

/// Deletes an index.
#[derive(Debug, Clone)]
pub struct DeleteIndexOperation {
    name: String,
}

impl DeleteIndexOperation {
    /// Creates the operation.
    pub fn new(name: impl Into<String>) -> RavenResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(RavenError::invalid_argument("index name cannot be null or empty"));
        }
        Ok(Self { name })
    }
}

impl MaintenanceOperation for DeleteIndexOperation {
    type Command = DeleteIndexCommand;

    fn get_command(&self, _conventions: &DocumentConventions) -> RavenResult<Self::Command> {
        Ok(DeleteIndexCommand {
            name: self.name.clone(),
        })
    }
}

/// `DELETE /databases/{db}/indexes?name=...`.
#[derive(Debug, Clone)]
pub struct DeleteIndexCommand {
    name: String,
}

impl RavenCommand for DeleteIndexCommand {
    type Output = ();

    fn create_request(&self, node: &ServerNode) -> RavenResult<HttpRequest> {
        let mut url = node.database_endpoint(&["indexes"])?;
        url.query_pairs_mut().append_pair("name", &self.name);
        Ok(HttpRequest::new(Method::Delete, url))
    }

    fn parse_response(&self, _response: HttpResponse) -> RavenResult<Self::Output> {
        Ok(())
    }

    fn on_not_found(&self, _response: &HttpResponse) -> RavenResult<Self::Output> {
        Err(RavenError::IndexDoesNotExist(format!(
            "Index '{}' was not found",
            self.name
        )))
    }
}
