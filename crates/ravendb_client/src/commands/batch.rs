use crate::error::RavenResult;
use crate::http::{HttpRequest, HttpResponse, Method, RavenCommand, ServerNode};
use ravendb_protocol::{BatchCommandData, BatchRequest, BatchResponse};

/// Applies puts and deletes atomically: `POST /databases/{db}/bulk_docs`.
#[derive(Debug, Clone)]
pub struct BatchCommand {
    request: BatchRequest,
}

impl BatchCommand {
    /// Creates a batch from individual commands.
    pub fn new(commands: Vec<BatchCommandData>) -> Self {
        Self {
            request: BatchRequest { commands },
        }
    }

    /// Returns the commands in the batch.
    pub fn commands(&self) -> &[BatchCommandData] {
        &self.request.commands
    }
}

impl RavenCommand for BatchCommand {
    type Output = BatchResponse;

    fn create_request(&self, node: &ServerNode) -> RavenResult<HttpRequest> {
        HttpRequest::new(Method::Post, node.database_endpoint(&["bulk_docs"])?)
            .with_json_body(&self.request)
    }

    fn parse_response(&self, response: HttpResponse) -> RavenResult<Self::Output> {
        response.json_body()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn posts_commands() {
        let command = BatchCommand::new(vec![
            BatchCommandData::put("users/1", None, json!({ "name": "A" })),
            BatchCommandData::delete("users/2", Some("A:2".into())),
        ]);
        let node = ServerNode::new("http://a:8080", Some("db".into()));
        let request = command.create_request(&node).unwrap();

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url.path(), "/databases/db/bulk_docs");
        let body: BatchRequest = request.json_body().unwrap();
        assert_eq!(body.commands.len(), 2);
        assert_eq!(body.commands[1].change_vector.as_deref(), Some("A:2"));
    }
}
