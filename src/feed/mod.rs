//! Feed fetching and RSS decoding.
//!
//! - [`parser`] - streaming RSS 2.0 decoder built on `quick-xml`
//! - [`fetcher`] - one-shot HTTP retrieval with a bounded timeout
//!
//! # Example
//!
//! ```ignore
//! use gator::feed::{build_client, fetch_feed};
//!
//! let client = build_client()?;
//! let feed = fetch_feed(&client, "https://news.ycombinator.com/rss").await?;
//! println!("{feed}");
//! ```

mod fetcher;
mod parser;

use thiserror::Error;

pub use fetcher::{build_client, build_client_with_timeout, fetch_feed, FETCH_TIMEOUT, USER_AGENT};
pub use parser::{parse_feed, RssFeed, RssItem};

/// Errors from fetching or decoding a feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be turned into a request
    #[error("Invalid feed request: {0}")]
    InvalidRequest(String),
    /// Request exceeded the client deadline
    #[error("Request timed out")]
    Timeout,
    /// Network-level error (DNS, connection, TLS, body read)
    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body is not well-formed feed markup
    #[error("Failed to decode feed: {0}")]
    Decode(String),
}
