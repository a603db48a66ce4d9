use futures::StreamExt;
use std::time::Duration;

use super::parser::{parse_feed, RssFeed};
use super::FetchError;

/// Sent as `User-Agent` on every feed request.
pub const USER_AGENT: &str = "gator";

/// Hard deadline for one feed request, connect through last body byte.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Builds the HTTP client used for feed fetches.
pub fn build_client() -> Result<reqwest::Client, FetchError> {
    build_client_with_timeout(FETCH_TIMEOUT)
}

/// Builds a feed client with a custom deadline.
pub fn build_client_with_timeout(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(FetchError::Transport)
}

/// Fetches and decodes the feed at `url`.
///
/// Exactly one GET is issued; there is no retry. The status code is not
/// treated as an error: a non-2xx response is logged and its body is still
/// decoded, so an HTML error page surfaces as [`FetchError::Decode`].
///
/// # Errors
///
/// - [`FetchError::InvalidRequest`] - `url` cannot be turned into a request
/// - [`FetchError::Timeout`] - the client deadline elapsed
/// - [`FetchError::Transport`] - connection, TLS or body read failure
/// - [`FetchError::ResponseTooLarge`] - body exceeded 10MB
/// - [`FetchError::Decode`] - body is not well-formed feed markup
pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<RssFeed, FetchError> {
    let request = client
        .get(url)
        .build()
        .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

    tracing::debug!(url = %url, "Fetching feed");
    let response = client.execute(request).await.map_err(classify)?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(url = %url, status = %status, "Feed server returned non-success status");
    }

    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    let feed = parse_feed(&bytes)?;

    tracing::debug!(url = %url, items = feed.items.len(), "Fetched feed");
    Ok(feed)
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(classify)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
