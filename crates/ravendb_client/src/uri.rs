//! URL validation for node addresses.

use crate::error::{RavenError, RavenResult};
use reqwest::Url;

/// Validates a single node URL.
///
/// Accepts absolute `http` and `https` URLs with a host.
pub fn validate_uri(url: &str) -> RavenResult<()> {
    let parsed = Url::parse(url)
        .map_err(|e| RavenError::invalid_argument(format!("The url '{url}' is not valid: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RavenError::invalid_argument(format!(
            "The url '{url}' is not valid: unsupported scheme '{}'",
            parsed.scheme()
        )));
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(RavenError::invalid_argument(format!(
            "The url '{url}' is not valid: missing host"
        )));
    }

    Ok(())
}

/// Validates a URL list and strips one trailing `/` from each entry.
pub fn normalize_urls<I, S>(urls: I) -> RavenResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    urls.into_iter()
        .enumerate()
        .map(|(index, url)| {
            let url: String = url.into();
            if url.trim().is_empty() {
                return Err(RavenError::invalid_argument(format!(
                    "Url cannot be null or empty - url index: {index}"
                )));
            }
            validate_uri(&url)?;
            Ok(url.strip_suffix('/').map(str::to_owned).unwrap_or(url))
        })
        .collect()
}

/// Returns true if the URL uses plain HTTP.
pub(crate) fn is_plain_http(url: &str) -> bool {
    url.get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("http://"))
}
