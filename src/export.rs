//! Library export: the versioned JSON envelope, OPML document assembly,
//! and single-article markdown rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::feed::opml::{OpmlDocument, OpmlFeedEntry, OpmlFolder};
use crate::model::{Article, Feed, Folder, ReadingList};
use crate::store::Repository;
use crate::util::{decode_entities, strip_tags};

/// Envelope format version; the merge engine accepts exactly this.
pub const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to decode export file: {0}")]
    DecodingFailed(String),
    #[error("failed to encode export: {0}")]
    EncodingFailed(String),
    #[error("failed to read export file: {0}")]
    FileReadFailed(#[from] std::io::Error),
}

/// Top-level JSON export document.
///
/// Collections are emitted in a deterministic order (folders by display
/// order then name, feeds by title then URL, lists by name then id) so two
/// exports of the same library are byte-identical apart from the stamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub folders: Vec<Folder>,
    pub feeds: Vec<ExportedFeed>,
    pub reading_lists: Vec<ReadingList>,
}

/// Feed subscription as it appears in the JSON envelope. Article history
/// and health counters stay local; only subscription identity travels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFeed {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default, rename = "folderID")]
    pub folder_id: Option<Uuid>,
}

impl ExportedFeed {
    fn from_feed(feed: &Feed) -> Self {
        Self {
            id: feed.id,
            title: feed.title.clone(),
            description: feed.description.clone(),
            url: feed.url.clone(),
            website_url: feed.website_url.clone(),
            folder_id: feed.folder_id,
        }
    }
}

/// Snapshots the library's folders, feeds, and reading lists.
pub fn export_library(repo: &impl Repository) -> ExportEnvelope {
    let mut folders: Vec<Folder> = repo.folders().into_iter().cloned().collect();
    folders.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));

    let mut feeds: Vec<ExportedFeed> = repo.feeds().into_iter().map(ExportedFeed::from_feed).collect();
    feeds.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.url.cmp(&b.url)));

    let mut reading_lists: Vec<ReadingList> = repo.reading_lists().into_iter().cloned().collect();
    reading_lists.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    ExportEnvelope {
        version: EXPORT_VERSION,
        exported_at: Utc::now(),
        folders,
        feeds,
        reading_lists,
    }
}

pub fn to_json(envelope: &ExportEnvelope) -> Result<String, ExportError> {
    serde_json::to_string_pretty(envelope).map_err(|e| ExportError::EncodingFailed(e.to_string()))
}

pub fn from_json(json: &str) -> Result<ExportEnvelope, ExportError> {
    serde_json::from_str(json).map_err(|e| ExportError::DecodingFailed(e.to_string()))
}

/// Reads and decodes an export file from disk.
pub fn load_export(path: &std::path::Path) -> Result<ExportEnvelope, ExportError> {
    let content = std::fs::read_to_string(path)?;
    from_json(&content)
}

/// Builds the OPML view of the library: folderless feeds first, then each
/// folder with its member feeds, everything sorted for stable output.
pub fn export_opml_document(repo: &impl Repository, title: &str) -> OpmlDocument {
    let entry = |feed: &Feed| OpmlFeedEntry {
        title: feed.title.clone(),
        feed_url: feed.url.clone(),
        website_url: feed.website_url.clone(),
        description: Some(feed.description.clone()).filter(|d| !d.is_empty()),
    };

    let mut sorted_folders: Vec<&Folder> = repo.folders();
    sorted_folders.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));

    let mut orphan_feeds = Vec::new();
    let mut folders = Vec::new();

    for folder in sorted_folders {
        let mut feeds: Vec<OpmlFeedEntry> = repo
            .feeds()
            .into_iter()
            .filter(|f| f.folder_id == Some(folder.id))
            .map(entry)
            .collect();
        if feeds.is_empty() {
            continue;
        }
        feeds.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.feed_url.cmp(&b.feed_url)));
        folders.push(OpmlFolder {
            name: folder.name.clone(),
            feeds,
        });
    }

    let mut loose: Vec<OpmlFeedEntry> = repo
        .feeds()
        .into_iter()
        .filter(|f| f.folder_id.is_none())
        .map(entry)
        .collect();
    loose.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.feed_url.cmp(&b.feed_url)));
    orphan_feeds.extend(loose);

    OpmlDocument {
        title: Some(title.to_owned()),
        folders,
        orphan_feeds,
    }
}

/// Renders one article as a standalone markdown document: heading,
/// metadata lines, a rule, then the body with tags stripped and entities
/// decoded.
pub fn render_markdown(article: &Article) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", article.title));

    if let Some(ref author) = article.author {
        out.push_str(&format!("**Author:** {author}\n"));
    }
    if let Some(ref external) = article.external_url {
        out.push_str(&format!("**Source:** {external}\n"));
    }
    out.push_str(&format!(
        "**Date:** {}\n",
        article.published.format("%B %d, %Y")
    ));
    out.push_str(&format!("**URL:** [{0}]({0})\n\n---\n\n", article.url));

    let body = if article.content.is_empty() {
        &article.summary
    } else {
        &article.content
    };
    out.push_str(decode_entities(&strip_tags(body)).trim());
    out.push('\n');
    out
}
