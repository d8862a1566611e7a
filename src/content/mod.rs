//! Full-content retrieval: article page fetch plus main-body extraction.

pub mod extract;
pub mod fetch;

pub use extract::extract_main_content;
pub use fetch::{fetch_article, fetch_article_via_proxy, ExtractFetchError};
