//! Additive merging of an exported library (JSON envelope) or an OPML
//! document into an existing library.
//!
//! Merges never delete or overwrite: existing entities win and incoming
//! duplicates are counted, not applied. All writes land before a single
//! `save` at the end.

use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

use crate::export::{ExportEnvelope, EXPORT_VERSION};
use crate::feed::opml::OpmlDocument;
use crate::model::{Feed, Folder};
use crate::store::{Repository, StoreError};

#[derive(Debug, Error)]
pub enum MergeError {
    /// The envelope's format version is not one this build understands.
    /// Nothing is inserted.
    #[error("unsupported export version {0}")]
    UnsupportedVersion(u32),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Counts of what a merge actually did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub folders_imported: usize,
    pub feeds_imported: usize,
    pub reading_lists_imported: usize,
    pub duplicates_skipped: usize,
}

/// Merges a JSON export envelope into the library.
///
/// Folders and reading lists deduplicate by id, feeds by URL. Feed ids
/// are preserved from the export unless they collide with an existing
/// local feed, in which case a fresh id is minted. A feed's `folder_id`
/// survives only when that folder exists locally after the folder phase.
pub fn merge_export(
    repo: &mut impl Repository,
    envelope: &ExportEnvelope,
) -> Result<MergeReport, MergeError> {
    if envelope.version != EXPORT_VERSION {
        return Err(MergeError::UnsupportedVersion(envelope.version));
    }

    let mut report = MergeReport::default();

    for folder in &envelope.folders {
        if repo.folder(folder.id).is_some() {
            report.duplicates_skipped += 1;
            continue;
        }
        repo.insert_folder(folder.clone())?;
        report.folders_imported += 1;
    }

    let mut known_urls: HashSet<String> =
        repo.feeds().into_iter().map(|f| f.url.clone()).collect();

    for exported in &envelope.feeds {
        if known_urls.contains(&exported.url) {
            report.duplicates_skipped += 1;
            continue;
        }
        // URL is the sole dedup key. If the exported id already belongs to
        // a local feed with a different URL, mint a fresh id instead of
        // misreporting the feed as a duplicate.
        let id = if repo.feed(exported.id).is_some() {
            Uuid::new_v4()
        } else {
            exported.id
        };
        // Known folders at this point include the ones just imported
        let folder_id = exported.folder_id.filter(|id| repo.folder(*id).is_some());
        known_urls.insert(exported.url.clone());
        repo.insert_feed(Feed {
            id,
            title: exported.title.clone(),
            description: exported.description.clone(),
            url: exported.url.clone(),
            website_url: exported.website_url.clone(),
            icon_url: None,
            folder_id,
            last_fetched: None,
            last_successful_fetch: None,
            last_error: None,
            consecutive_failures: 0,
        })?;
        report.feeds_imported += 1;
    }

    for list in &envelope.reading_lists {
        if repo.reading_lists().iter().any(|l| l.id == list.id) {
            report.duplicates_skipped += 1;
            continue;
        }
        repo.insert_reading_list(list.clone())?;
        report.reading_lists_imported += 1;
    }

    repo.save()?;
    tracing::info!(
        folders = report.folders_imported,
        feeds = report.feeds_imported,
        lists = report.reading_lists_imported,
        skipped = report.duplicates_skipped,
        "Merged library export"
    );
    Ok(report)
}

/// Merges an OPML document into the library.
///
/// Folders match existing ones by exact name (a silent reuse, not a
/// counted duplicate); new folders are appended to the display order.
/// Feeds deduplicate by URL. OPML carries no reading lists, so that count
/// is always zero.
pub fn merge_opml(
    repo: &mut impl Repository,
    doc: &OpmlDocument,
) -> Result<MergeReport, MergeError> {
    let mut report = MergeReport::default();
    let mut known_urls: HashSet<String> =
        repo.feeds().into_iter().map(|f| f.url.clone()).collect();
    let order_base = repo.folders().len() as i64;
    let mut created_folders: i64 = 0;

    let mut pending: Vec<(Option<Uuid>, &crate::feed::opml::OpmlFeedEntry)> = Vec::new();

    for folder in &doc.folders {
        let existing_id = repo
            .folders()
            .iter()
            .find(|f| f.name == folder.name)
            .map(|f| f.id);
        let folder_id = match existing_id {
            Some(id) => id,
            None => {
                let created = Folder {
                    id: Uuid::new_v4(),
                    name: folder.name.clone(),
                    order: order_base + created_folders,
                    icon: "folder".into(),
                };
                let id = created.id;
                repo.insert_folder(created)?;
                created_folders += 1;
                report.folders_imported += 1;
                id
            }
        };
        for entry in &folder.feeds {
            pending.push((Some(folder_id), entry));
        }
    }
    for entry in &doc.orphan_feeds {
        pending.push((None, entry));
    }

    for (folder_id, entry) in pending {
        if known_urls.contains(&entry.feed_url) {
            report.duplicates_skipped += 1;
            continue;
        }
        known_urls.insert(entry.feed_url.clone());
        repo.insert_feed(Feed {
            id: Uuid::new_v4(),
            title: entry.title.clone(),
            description: entry.description.clone().unwrap_or_default(),
            url: entry.feed_url.clone(),
            website_url: entry.website_url.clone(),
            icon_url: None,
            folder_id,
            last_fetched: None,
            last_successful_fetch: None,
            last_error: None,
            consecutive_failures: 0,
        })?;
        report.feeds_imported += 1;
    }

    repo.save()?;
    tracing::info!(
        folders = report.folders_imported,
        feeds = report.feeds_imported,
        skipped = report.duplicates_skipped,
        "Merged OPML document"
    );
    Ok(report)
}
