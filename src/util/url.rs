use thiserror::Error;
use url::Url;

/// Reasons a string is not usable as a fetchable feed or page URL.
#[derive(Debug, Error)]
pub enum UrlValidationError {
    /// The string could not be parsed as a URL at all.
    #[error("invalid URL: {0}")]
    Unparseable(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates that a string is a well-formed http(s) URL with a host.
///
/// Every URL that reaches a network fetch in this crate passes through
/// here first; failures surface as the sync engine's `InvalidUrl`.
///
/// # Examples
///
/// ```
/// use feedling::util::validate_http_url;
///
/// let url = validate_http_url("https://example.com/feed.xml").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(validate_http_url("file:///etc/passwd").is_err());
/// assert!(validate_http_url("not a url").is_err());
/// ```
pub fn validate_http_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().is_none() {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(validate_http_url("https://example.com/feed.xml").is_ok());
        assert!(validate_http_url("http://news.example.org").is_ok());
        assert!(validate_http_url("https://example.com:8443/rss").is_ok());
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(
            validate_http_url("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            validate_http_url("ftp://example.com"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn rejects_unparseable() {
        assert!(matches!(
            validate_http_url("not a url"),
            Err(UrlValidationError::Unparseable(_))
        ));
        assert!(validate_http_url("").is_err());
    }

    #[test]
    fn rejects_relative_paths() {
        assert!(validate_http_url("/feed.xml").is_err());
    }
}
