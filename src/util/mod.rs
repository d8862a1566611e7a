//! Utility functions shared across the crate.
//!
//! - [`text`]: tag stripping, entity decoding, and sanitization of
//!   attacker-controlled feed text
//! - [`url`]: http(s) URL validation used by every fetch path

mod text;
mod url;

pub use text::{collapse_blank_lines, decode_entities, strip_control_chars, strip_tags};
pub use url::{validate_http_url, UrlValidationError};
