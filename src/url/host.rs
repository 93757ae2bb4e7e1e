use crate::url::Host;
use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the host key from a parsed URL
///
/// The key is the lowercase host followed by the port when the port is not
/// the scheme's default, so `https://example.com:8443/` and
/// `https://example.com/` are throttled independently.
///
/// # Returns
///
/// * `Some(Host)` - The host key
/// * `None` - If the URL has no host (e.g. `data:` or `mailto:` URLs)
///
/// # Examples
///
/// ```
/// use url::Url;
/// use mercator_frontier::url::host_of_url;
///
/// let url = Url::parse("https://EXAMPLE.com/path").unwrap();
/// assert_eq!(host_of_url(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://example.com:8080/").unwrap();
/// assert_eq!(host_of_url(&url), Some("example.com:8080".to_string()));
/// ```
pub fn host_of_url(url: &Url) -> Option<Host> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Parses a link and extracts its host key
///
/// # Returns
///
/// * `Ok(Host)` - The host key
/// * `Err(UrlError)` - If the link cannot be parsed or has no host
pub fn host_of(link: &str) -> UrlResult<Host> {
    let url = Url::parse(link).map_err(|e| UrlError::Parse {
        url: link.to_string(),
        reason: e.to_string(),
    })?;
    host_of_url(&url).ok_or_else(|| UrlError::MissingHost(link.to_string()))
}
