use crate::error::{RavenError, RavenResult};
use crate::http::{HttpRequest, HttpResponse, Method, RavenCommand, ServerNode};
use ravendb_protocol::GetDocumentsResult;

/// Loads documents by id: `GET /databases/{db}/docs?id=...`.
///
/// Missing documents come back as `null` entries, in request order.
#[derive(Debug, Clone)]
pub struct GetDocumentsCommand {
    ids: Vec<String>,
}

impl GetDocumentsCommand {
    /// Creates a command loading the given ids.
    pub fn new<I, S>(ids: I) -> RavenResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Err(RavenError::invalid_argument("ids cannot be empty"));
        }
        if ids.iter().any(|id| id.is_empty()) {
            return Err(RavenError::invalid_argument("id cannot be null or empty"));
        }
        Ok(Self { ids })
    }

    /// Returns the requested ids.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl RavenCommand for GetDocumentsCommand {
    type Output = GetDocumentsResult;

    fn create_request(&self, node: &ServerNode) -> RavenResult<HttpRequest> {
        let mut url = node.database_endpoint(&["docs"])?;
        {
            let mut query = url.query_pairs_mut();
            for id in &self.ids {
                query.append_pair("id", id);
            }
        }
        Ok(HttpRequest::new(Method::Get, url))
    }

    fn parse_response(&self, response: HttpResponse) -> RavenResult<Self::Output> {
        response.json_body()
    }

    fn on_not_found(&self, _response: &HttpResponse) -> RavenResult<Self::Output> {
        Ok(GetDocumentsResult::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_id_parameter() {
        let command = GetDocumentsCommand::new(["users/1", "users/2 b"]).unwrap();
        let node = ServerNode::new("http://a:8080", Some("db".into()));
        let request = command.create_request(&node).unwrap();

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url.path(), "/databases/db/docs");
        assert_eq!(request.query_values("id"), vec!["users/1", "users/2 b"]);
    }

    #[test]
    fn rejects_empty_ids() {
        assert!(GetDocumentsCommand::new(Vec::<String>::new()).is_err());
        assert!(GetDocumentsCommand::new([""]).is_err());
    }

    #[test]
    fn not_found_is_empty_result() {
        let command = GetDocumentsCommand::new(["users/1"]).unwrap();
        let result = command.on_not_found(&HttpResponse::new(404)).unwrap();
        assert!(result.results.is_empty());
    }
}
