use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors from endpoint checks and query construction.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// The endpoint string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP to a non-local host.
    #[error("Insecure endpoint: HTTPS required (except localhost for testing)")]
    Insecure,
}

/// Checks that an endpoint is safe to send a credential to.
///
/// HTTPS is required. Plain HTTP is accepted only for `localhost` and
/// loopback addresses, which is what local test servers bind to.
///
/// # Examples
///
/// ```
/// use newsdeck::util::check_credential_endpoint;
///
/// assert!(check_credential_endpoint("https://openrouter.ai/api/v1/chat/completions").is_ok());
/// assert!(check_credential_endpoint("http://127.0.0.1:8080/v1").is_ok());
/// assert!(check_credential_endpoint("http://api.example.com/v1").is_err());
/// ```
pub fn check_credential_endpoint(endpoint: &str) -> Result<Url, EndpointError> {
    let url = Url::parse(endpoint)?;

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_local_host(&url) => {
            tracing::warn!(endpoint = %url, "Using non-HTTPS endpoint (localhost only)");
            Ok(url)
        }
        "http" => Err(EndpointError::Insecure),
        scheme => Err(EndpointError::UnsupportedScheme(scheme.to_owned())),
    }
}

/// Builds `endpoint?key=value`, percent-encoding `value`.
///
/// Existing query pairs on the endpoint are kept.
///
/// ```
/// use newsdeck::util::with_query;
///
/// let url = with_query("https://relay.example.dev", "url", "https://a.b/c?d=1").unwrap();
/// assert_eq!(url.as_str(), "https://relay.example.dev/?url=https%3A%2F%2Fa.b%2Fc%3Fd%3D1");
/// ```
pub fn with_query(endpoint: &str, key: &str, value: &str) -> Result<Url, EndpointError> {
    let mut url = Url::parse(endpoint)?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(EndpointError::UnsupportedScheme(scheme.to_owned())),
    }
    url.query_pairs_mut().append_pair(key, value);
    Ok(url)
}

fn is_local_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host == "localhost" {
        return true;
    }
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}
