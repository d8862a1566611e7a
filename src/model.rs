//! Entity types for the subscribed library (feeds, articles, folders,
//! reading lists) and the ephemeral parse output consumed by the sync
//! engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A feed is unhealthy once this many refreshes in a row have failed.
pub const UNHEALTHY_THRESHOLD: u32 = 3;

/// Feed metadata plus the list of articles, exactly as parsed from one
/// RSS/Atom document. Produced by [`crate::feed::parse`], consumed
/// immediately by the sync engine; never persisted as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
    pub title: String,
    pub description: String,
    /// The feed's website URL, when the document advertises one.
    pub link: Option<String>,
    pub articles: Vec<ParsedArticle>,
}

/// One item/entry from a parsed feed document.
///
/// If the source supplied only one of `content`/`summary`, the parser
/// backfills the other with the same value, so both are non-empty whenever
/// any body text existed. If the source supplied neither, both stay empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArticle {
    pub title: String,
    pub summary: String,
    pub content: String,
    /// Canonical article URL; the per-feed dedup key.
    pub url: String,
    /// Distinct external link embedded in the item (e.g. Reddit link posts).
    pub external_url: Option<String>,
    pub author: Option<String>,
    pub published: DateTime<Utc>,
}

/// A subscribed RSS/Atom source. Identified for merge purposes by its fetch
/// `url`; the opaque `id` is stable within one library.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// The feed's own fetch URL, the dedup key for library merges.
    pub url: String,
    pub website_url: Option<String>,
    pub icon_url: Option<String>,
    pub folder_id: Option<Uuid>,
    pub last_fetched: Option<DateTime<Utc>>,
    pub last_successful_fetch: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Health counter; see [`UNHEALTHY_THRESHOLD`].
    pub consecutive_failures: u32,
}

impl Feed {
    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures < UNHEALTHY_THRESHOLD
    }
}

/// One entry belonging to a feed, identified within that feed by its URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub title: String,
    pub summary: String,
    pub content: String,
    /// Dedup key within the owning feed.
    pub url: String,
    pub external_url: Option<String>,
    pub author: Option<String>,
    pub published: DateTime<Utc>,
    pub is_read: bool,
    pub is_starred: bool,
    pub is_archived: bool,
}

impl Article {
    /// The address used for full-content extraction: the embedded external
    /// link when present, the article's own URL otherwise.
    pub fn article_url(&self) -> &str {
        self.external_url.as_deref().unwrap_or(&self.url)
    }

    /// Builds a fresh article from parser output, carrying `external_url`
    /// through and starting with all flags cleared.
    pub fn from_parsed(feed_id: Uuid, parsed: ParsedArticle) -> Self {
        Self {
            id: Uuid::new_v4(),
            feed_id,
            title: parsed.title,
            summary: parsed.summary,
            content: parsed.content,
            url: parsed.url,
            external_url: parsed.external_url,
            author: parsed.author,
            published: parsed.published,
            is_read: false,
            is_starred: false,
            is_archived: false,
        }
    }
}

/// Groups feeds in the sidebar. Deleting a folder nullifies its feeds'
/// `folder_id`; it never cascades to the feeds themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    /// Display/sort key.
    pub order: i64,
    pub icon: String,
}

/// A user-curated list of articles (many-to-many with [`Article`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingList {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}
