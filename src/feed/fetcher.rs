//! HTTP retrieval of feed documents.

use futures::StreamExt;
use thiserror::Error;
use uuid::Uuid;

use crate::config::SyncSettings;
use crate::feed::parser::{self, ParseError};
use crate::model::ParsedFeed;
use crate::store::StoreError;
use crate::util::validate_http_url;

/// Errors surfaced by the fetch and sync paths.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A string failed to parse as a well-formed http(s) URL with a host.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// Non-2xx HTTP status.
    #[error("unexpected HTTP status {0}")]
    InvalidResponse(u16),
    /// Network-level failure (DNS, connection, TLS, body read).
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Response body exceeded the configured size cap.
    #[error("response too large")]
    ResponseTooLarge,
    /// The body was not a parseable feed document.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The referenced feed does not exist in the repository.
    #[error("no such feed: {0}")]
    UnknownFeed(Uuid),
    /// The backing store refused a write.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Fetches and parses one feed document.
///
/// Validates the URL, GETs it with the configured timeout, size-caps the
/// body, and delegates to the streaming parser. Parser errors propagate
/// unchanged.
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    settings: &SyncSettings,
) -> Result<ParsedFeed, SyncError> {
    let validated = validate_http_url(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;

    let response = tokio::time::timeout(
        settings.request_timeout(),
        client
            .get(validated)
            .header(reqwest::header::USER_AGENT, &settings.user_agent)
            .send(),
    )
    .await
    .map_err(|_| SyncError::Timeout)?
    .map_err(SyncError::Network)?;

    if !response.status().is_success() {
        return Err(SyncError::InvalidResponse(response.status().as_u16()));
    }

    let bytes = read_limited_bytes(response, settings.max_response_bytes).await?;
    Ok(parser::parse(&bytes)?)
}

/// Failure modes of the shared size-capped body reader; each fetch path
/// folds these into its own error type.
#[derive(Debug, Error)]
pub(crate) enum BodyError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("response too large")]
    TooLarge,
}

impl From<BodyError> for SyncError {
    fn from(e: BodyError) -> Self {
        match e {
            BodyError::Network(e) => SyncError::Network(e),
            BodyError::TooLarge => SyncError::ResponseTooLarge,
        }
    }
}

/// Reads a response body as a byte vector, enforcing a hard size limit via
/// streamed chunks so an oversized body never lands in memory whole.
pub(crate) async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, BodyError> {
    // Fast path: trust Content-Length when present
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(BodyError::TooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(BodyError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
