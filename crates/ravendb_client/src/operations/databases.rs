use super::ServerOperation;
use crate::conventions::DocumentConventions;
use crate::error::{RavenError, RavenResult};
use crate::http::{HttpRequest, HttpResponse, Method, RavenCommand, ServerNode};
use ravendb_protocol::{
    CreateDatabaseResult, DatabaseRecord, DeleteDatabaseResult, DeleteDatabasesRequest,
};

/// Creates a database.
#[derive(Debug, Clone)]
pub struct CreateDatabaseOperation {
    record: DatabaseRecord,
    replication_factor: u32,
}

impl CreateDatabaseOperation {
    /// Creates the operation with a replication factor of 1.
    pub fn new(record: DatabaseRecord) -> Self {
        Self {
            record,
            replication_factor: 1,
        }
    }

    /// Sets the replication factor.
    pub fn with_replication_factor(mut self, factor: u32) -> Self {
        self.replication_factor = factor;
        self
    }
}

impl ServerOperation for CreateDatabaseOperation {
    type Command = CreateDatabaseCommand;

    fn get_command(&self, _conventions: &DocumentConventions) -> RavenResult<Self::Command> {
        if self.record.database_name.is_empty() {
            return Err(RavenError::invalid_argument("Database name is required"));
        }
        Ok(CreateDatabaseCommand {
            record: self.record.clone(),
            replication_factor: self.replication_factor,
        })
    }
}

/// `PUT /admin/databases?name=...&replicationFactor=...`.
#[derive(Debug, Clone)]
pub struct CreateDatabaseCommand {
    record: DatabaseRecord,
    replication_factor: u32,
}

impl RavenCommand for CreateDatabaseCommand {
    type Output = CreateDatabaseResult;

    fn create_request(&self, node: &ServerNode) -> RavenResult<HttpRequest> {
        let mut url = node.endpoint(&["admin", "databases"])?;
        url.query_pairs_mut()
            .append_pair("name", &self.record.database_name)
            .append_pair("replicationFactor", &self.replication_factor.to_string());
        HttpRequest::new(Method::Put, url).with_json_body(&self.record)
    }

    fn parse_response(&self, response: HttpResponse) -> RavenResult<Self::Output> {
        response.json_body()
    }
}

/// Deletes one or more databases.
#[derive(Debug, Clone)]
pub struct DeleteDatabasesOperation {
    request: DeleteDatabasesRequest,
}

impl DeleteDatabasesOperation {
    /// Deletes a single database.
    pub fn new(database_name: impl Into<String>, hard_delete: bool) -> Self {
        Self::many(vec![database_name.into()], hard_delete)
    }

    /// Deletes several databases.
    pub fn many(database_names: Vec<String>, hard_delete: bool) -> Self {
        Self {
            request: DeleteDatabasesRequest {
                database_names,
                hard_delete,
                from_nodes: None,
            },
        }
    }

    /// Restricts deletion to the given nodes.
    pub fn from_nodes(mut self, nodes: Vec<String>) -> Self {
        self.request.from_nodes = Some(nodes);
        self
    }
}

impl ServerOperation for DeleteDatabasesOperation {
    type Command = DeleteDatabasesCommand;

    fn get_command(&self, _conventions: &DocumentConventions) -> RavenResult<Self::Command> {
        if self.request.database_names.is_empty()
            || self.request.database_names.iter().any(String::is_empty)
        {
            return Err(RavenError::invalid_argument(
                "Database names cannot be null or empty",
            ));
        }
        Ok(DeleteDatabasesCommand {
            request: self.request.clone(),
        })
    }
}

/// `DELETE /admin/databases`.
#[derive(Debug, Clone)]
pub struct DeleteDatabasesCommand {
    request: DeleteDatabasesRequest,
}

impl RavenCommand for DeleteDatabasesCommand {
    type Output = DeleteDatabaseResult;

    fn create_request(&self, node: &ServerNode) -> RavenResult<HttpRequest> {
        HttpRequest::new(Method::Delete, node.endpoint(&["admin", "databases"])?)
            .with_json_body(&self.request)
    }

    fn parse_response(&self, response: HttpResponse) -> RavenResult<Self::Output> {
        response.json_body()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_database_is_server_level() {
        let command = CreateDatabaseOperation::new(DatabaseRecord::new("Northwind"))
            .get_command(&DocumentConventions::default())
            .unwrap();
        let node = ServerNode::new("http://a:8080", Some("ignored".into()));
        let request = command.create_request(&node).unwrap();

        assert_eq!(request.method, Method::Put);
        assert_eq!(request.url.path(), "/admin/databases");
        assert_eq!(request.query_value("name").as_deref(), Some("Northwind"));
        assert_eq!(request.query_value("replicationFactor").as_deref(), Some("1"));
    }

    #[test]
    fn validates_names() {
        let conventions = DocumentConventions::default();
        assert!(CreateDatabaseOperation::new(DatabaseRecord::new(""))
            .get_command(&conventions)
            .is_err());
        assert!(DeleteDatabasesOperation::many(Vec::new(), true)
            .get_command(&conventions)
            .is_err());

        let command = DeleteDatabasesOperation::new("Northwind", true)
            .get_command(&conventions)
            .unwrap();
        let request = command
            .create_request(&ServerNode::new("http://a:8080", None))
            .unwrap();
        let body: DeleteDatabasesRequest = request.json_body().unwrap();
        assert_eq!(body.database_names, vec!["Northwind"]);
        assert!(body.hard_delete);
    }
}
