//! Small helpers shared by the fetcher and the command handlers.
//!
//! - **HTML entities**: tolerant decoding of feed text
//! - **URL validation**: feed URLs must be absolute http(s)

mod text;
mod url_validator;

pub use text::unescape_html;
pub use url_validator::{validate_feed_url, UrlValidationError};
