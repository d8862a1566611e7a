//! Feed acquisition: parsing, HTTP fetch, autodiscovery, and OPML.

pub mod discovery;
pub mod fetcher;
pub mod opml;
pub mod parser;

pub use discovery::discover_feed;
pub use fetcher::{fetch_feed, SyncError};
pub use opml::{OpmlDocument, OpmlError, OpmlFeedEntry, OpmlFolder};
pub use parser::{parse, ParseError};
