//! HTTP retrieval of article pages for full-content extraction.

use thiserror::Error;

use crate::config::SyncSettings;
use crate::feed::fetcher::{read_limited_bytes, BodyError};
use crate::util::validate_http_url;

/// Article pages are fetched with a browser user-agent; many sites serve
/// feed readers a paywall or an empty shell otherwise.
const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum ExtractFetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// Non-2xx HTTP status.
    #[error("fetch failed with HTTP status {0}")]
    FetchFailed(u16),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("response too large")]
    ResponseTooLarge,
    /// The body was empty or otherwise unusable as page text.
    #[error("response was not usable text content")]
    InvalidContent,
    /// The proxy redirected to its login page instead of the article.
    #[error("proxy requires login")]
    ProxyLoginRequired,
}

impl From<BodyError> for ExtractFetchError {
    fn from(e: BodyError) -> Self {
        match e {
            BodyError::Network(e) => ExtractFetchError::Network(e),
            BodyError::TooLarge => ExtractFetchError::ResponseTooLarge,
        }
    }
}

/// Fetches an article page and returns its decoded HTML.
///
/// UTF-8 first, falling back to Latin-1 (every byte maps to a character,
/// so any non-empty body decodes). An empty body is `InvalidContent`.
pub async fn fetch_article(
    client: &reqwest::Client,
    url: &str,
    settings: &SyncSettings,
) -> Result<String, ExtractFetchError> {
    let validated =
        validate_http_url(url).map_err(|e| ExtractFetchError::InvalidUrl(e.to_string()))?;
    let response = send_browser_request(client, validated.as_str(), settings).await?;

    if !response.status().is_success() {
        return Err(ExtractFetchError::FetchFailed(response.status().as_u16()));
    }

    decode_body(response, settings).await
}

/// Fetches an article through a rewriting proxy (`proxy_base` + article
/// URL). Redirects are followed; if the chain lands on a URL containing
/// `login`, the proxy wants credentials and the article is unavailable.
pub async fn fetch_article_via_proxy(
    client: &reqwest::Client,
    proxy_base: &str,
    url: &str,
    settings: &SyncSettings,
) -> Result<String, ExtractFetchError> {
    validate_http_url(url).map_err(|e| ExtractFetchError::InvalidUrl(e.to_string()))?;
    let proxied = format!("{proxy_base}{url}");
    validate_http_url(&proxied).map_err(|e| ExtractFetchError::InvalidUrl(e.to_string()))?;

    let response = send_browser_request(client, &proxied, settings).await?;

    if response.url().as_str().contains("login") {
        tracing::warn!(url = %url, landed_on = %response.url(), "Proxy redirected to login");
        return Err(ExtractFetchError::ProxyLoginRequired);
    }
    if !response.status().is_success() {
        return Err(ExtractFetchError::FetchFailed(response.status().as_u16()));
    }

    decode_body(response, settings).await
}

async fn send_browser_request(
    client: &reqwest::Client,
    url: &str,
    settings: &SyncSettings,
) -> Result<reqwest::Response, ExtractFetchError> {
    tokio::time::timeout(
        settings.request_timeout(),
        client
            .get(url)
            .header(reqwest::header::USER_AGENT, BROWSER_UA)
            .send(),
    )
    .await
    .map_err(|_| ExtractFetchError::Timeout)?
    .map_err(ExtractFetchError::Network)
}

async fn decode_body(
    response: reqwest::Response,
    settings: &SyncSettings,
) -> Result<String, ExtractFetchError> {
    let bytes = read_limited_bytes(response, settings.max_response_bytes).await?;
    if bytes.is_empty() {
        return Err(ExtractFetchError::InvalidContent);
    }

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        // Latin-1: each byte is the identically-numbered code point
        Err(e) => Ok(e.into_bytes().iter().map(|&b| b as char).collect()),
    }
}
