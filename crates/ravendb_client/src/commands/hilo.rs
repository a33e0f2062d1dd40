use crate::error::RavenResult;
use crate::http::{HttpRequest, HttpResponse, Method, RavenCommand, ServerNode};
use ravendb_protocol::HiLoResult;

/// Reserves the next id range for a tag: `GET /databases/{db}/hilo/next`.
#[derive(Debug, Clone)]
pub struct NextHiLoCommand {
    /// Tag (lower-cased collection name).
    pub tag: String,
    /// Size of the previous range.
    pub last_batch_size: i64,
    /// Reservation time of the previous range.
    pub last_range_at: Option<String>,
    /// Separator between prefix and number.
    pub identity_parts_separator: char,
    /// Upper bound of the previous range.
    pub last_range_max: i64,
}

impl NextHiLoCommand {
    /// Creates a first-range request for a tag.
    pub fn new(tag: impl Into<String>, identity_parts_separator: char) -> Self {
        Self {
            tag: tag.into(),
            last_batch_size: 0,
            last_range_at: None,
            identity_parts_separator,
            last_range_max: 0,
        }
    }
}

impl RavenCommand for NextHiLoCommand {
    type Output = HiLoResult;

    fn create_request(&self, node: &ServerNode) -> RavenResult<HttpRequest> {
        let mut url = node.database_endpoint(&["hilo", "next"])?;
        url.query_pairs_mut()
            .append_pair("tag", &self.tag)
            .append_pair("lastBatchSize", &self.last_batch_size.to_string())
            .append_pair("lastRangeAt", self.last_range_at.as_deref().unwrap_or(""))
            .append_pair(
                "identityPartsSeparator",
                &self.identity_parts_separator.to_string(),
            )
            .append_pair("lastMax", &self.last_range_max.to_string());
        Ok(HttpRequest::new(Method::Get, url))
    }

    fn parse_response(&self, response: HttpResponse) -> RavenResult<Self::Output> {
        response.json_body()
    }
}
