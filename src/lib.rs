//! Feed synchronization and content extraction core.
//!
//! The crate covers the non-UI half of a feed reader: parsing RSS/RDF/Atom
//! documents with a streaming state machine, fetching and refreshing
//! subscriptions against a pluggable [`store::Repository`], extracting
//! article bodies from full web pages, and moving whole libraries around
//! via JSON exports and OPML.
//!
//! Everything network-facing takes a [`config::SyncSettings`] snapshot;
//! everything store-facing takes `&mut impl Repository`, so the store's
//! single-writer rule is enforced by the borrow checker.

pub mod config;
pub mod content;
pub mod dates;
pub mod export;
pub mod feed;
pub mod merge;
pub mod model;
pub mod store;
pub mod sync;
pub mod util;

pub use config::{ConfigError, SyncSettings};
pub use content::{extract_main_content, fetch_article, fetch_article_via_proxy, ExtractFetchError};
pub use dates::parse_date;
pub use export::{
    export_library, export_opml_document, from_json, render_markdown, to_json, ExportEnvelope,
    ExportError, ExportedFeed,
};
pub use feed::{discover_feed, fetch_feed, parse, OpmlDocument, OpmlError, ParseError, SyncError};
pub use merge::{merge_export, merge_opml, MergeError, MergeReport};
pub use model::{Article, Feed, Folder, ParsedArticle, ParsedFeed, ReadingList};
pub use store::{MemoryStore, Repository, StoreError};
pub use sync::{add_feed, refresh_all_feeds, refresh_feed, RefreshOutcome};
