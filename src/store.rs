//! Repository abstraction over the backing object store.
//!
//! The persistence engine itself is an external collaborator; this crate
//! only needs insert/query/save with the cascade semantics below. The
//! engines take `&mut impl Repository`, so Rust's borrow rules enforce the
//! store's single-writer constraint at compile time.

use std::collections::{BTreeSet, HashMap, HashSet};

use thiserror::Error;
use uuid::Uuid;

use crate::model::{Article, Feed, Folder, ReadingList};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {kind} id {id}")]
    Duplicate { kind: &'static str, id: Uuid },
    #[error("unknown {kind} id {id}")]
    Unknown { kind: &'static str, id: Uuid },
    #[error("commit failed: {0}")]
    Commit(String),
}

/// The operations the sync and merge engines need from a backing store.
///
/// Semantics callers rely on:
/// - inserting an entity whose id already exists is an error, never an
///   overwrite;
/// - deleting a feed cascades to its articles;
/// - deleting a folder nullifies its feeds' `folder_id` (no cascade);
/// - mutations become durable at [`Repository::save`]; a failed save is
///   indistinguishable from a wholly-failed batch.
pub trait Repository {
    fn insert_feed(&mut self, feed: Feed) -> Result<(), StoreError>;
    fn insert_article(&mut self, article: Article) -> Result<(), StoreError>;
    fn insert_folder(&mut self, folder: Folder) -> Result<(), StoreError>;
    fn insert_reading_list(&mut self, list: ReadingList) -> Result<(), StoreError>;

    fn feed(&self, id: Uuid) -> Option<&Feed>;
    fn feed_mut(&mut self, id: Uuid) -> Option<&mut Feed>;
    fn feeds(&self) -> Vec<&Feed>;
    fn folder(&self, id: Uuid) -> Option<&Folder>;
    fn folders(&self) -> Vec<&Folder>;
    fn reading_lists(&self) -> Vec<&ReadingList>;

    fn articles_for_feed(&self, feed_id: Uuid) -> Vec<&Article>;
    /// The URL set used as the refresh dedup key.
    fn article_urls_for_feed(&self, feed_id: Uuid) -> HashSet<String>;

    fn add_article_to_list(&mut self, list_id: Uuid, article_id: Uuid) -> Result<(), StoreError>;
    fn articles_in_list(&self, list_id: Uuid) -> Vec<Uuid>;

    /// Deletes a feed and all articles it owns.
    fn delete_feed(&mut self, id: Uuid) -> Result<(), StoreError>;
    /// Deletes a folder; member feeds survive with `folder_id` cleared.
    fn delete_folder(&mut self, id: Uuid) -> Result<(), StoreError>;

    fn save(&mut self) -> Result<(), StoreError>;
}

/// In-memory store used in tests and as the default single-writer backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    feeds: HashMap<Uuid, Feed>,
    articles: HashMap<Uuid, Article>,
    /// Insertion-ordered article ids per feed.
    feed_articles: HashMap<Uuid, Vec<Uuid>>,
    folders: HashMap<Uuid, Folder>,
    reading_lists: HashMap<Uuid, ReadingList>,
    list_members: HashMap<Uuid, BTreeSet<Uuid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn article(&self, id: Uuid) -> Option<&Article> {
        self.articles.get(&id)
    }

    pub fn article_mut(&mut self, id: Uuid) -> Option<&mut Article> {
        self.articles.get_mut(&id)
    }
}

impl Repository for MemoryStore {
    fn insert_feed(&mut self, feed: Feed) -> Result<(), StoreError> {
        if self.feeds.contains_key(&feed.id) {
            return Err(StoreError::Duplicate {
                kind: "feed",
                id: feed.id,
            });
        }
        self.feed_articles.entry(feed.id).or_default();
        self.feeds.insert(feed.id, feed);
        Ok(())
    }

    fn insert_article(&mut self, article: Article) -> Result<(), StoreError> {
        if self.articles.contains_key(&article.id) {
            return Err(StoreError::Duplicate {
                kind: "article",
                id: article.id,
            });
        }
        if !self.feeds.contains_key(&article.feed_id) {
            return Err(StoreError::Unknown {
                kind: "feed",
                id: article.feed_id,
            });
        }
        self.feed_articles
            .entry(article.feed_id)
            .or_default()
            .push(article.id);
        self.articles.insert(article.id, article);
        Ok(())
    }

    fn insert_folder(&mut self, folder: Folder) -> Result<(), StoreError> {
        if self.folders.contains_key(&folder.id) {
            return Err(StoreError::Duplicate {
                kind: "folder",
                id: folder.id,
            });
        }
        self.folders.insert(folder.id, folder);
        Ok(())
    }

    fn insert_reading_list(&mut self, list: ReadingList) -> Result<(), StoreError> {
        if self.reading_lists.contains_key(&list.id) {
            return Err(StoreError::Duplicate {
                kind: "reading list",
                id: list.id,
            });
        }
        self.list_members.entry(list.id).or_default();
        self.reading_lists.insert(list.id, list);
        Ok(())
    }

    fn feed(&self, id: Uuid) -> Option<&Feed> {
        self.feeds.get(&id)
    }

    fn feed_mut(&mut self, id: Uuid) -> Option<&mut Feed> {
        self.feeds.get_mut(&id)
    }

    fn feeds(&self) -> Vec<&Feed> {
        self.feeds.values().collect()
    }

    fn folder(&self, id: Uuid) -> Option<&Folder> {
        self.folders.get(&id)
    }

    fn folders(&self) -> Vec<&Folder> {
        self.folders.values().collect()
    }

    fn reading_lists(&self) -> Vec<&ReadingList> {
        self.reading_lists.values().collect()
    }

    fn articles_for_feed(&self, feed_id: Uuid) -> Vec<&Article> {
        self.feed_articles
            .get(&feed_id)
            .map(|ids| ids.iter().filter_map(|id| self.articles.get(id)).collect())
            .unwrap_or_default()
    }

    fn article_urls_for_feed(&self, feed_id: Uuid) -> HashSet<String> {
        self.articles_for_feed(feed_id)
            .into_iter()
            .map(|a| a.url.clone())
            .collect()
    }

    fn add_article_to_list(&mut self, list_id: Uuid, article_id: Uuid) -> Result<(), StoreError> {
        if !self.reading_lists.contains_key(&list_id) {
            return Err(StoreError::Unknown {
                kind: "reading list",
                id: list_id,
            });
        }
        if !self.articles.contains_key(&article_id) {
            return Err(StoreError::Unknown {
                kind: "article",
                id: article_id,
            });
        }
        self.list_members.entry(list_id).or_default().insert(article_id);
        Ok(())
    }

    fn articles_in_list(&self, list_id: Uuid) -> Vec<Uuid> {
        self.list_members
            .get(&list_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn delete_feed(&mut self, id: Uuid) -> Result<(), StoreError> {
        if self.feeds.remove(&id).is_none() {
            return Err(StoreError::Unknown { kind: "feed", id });
        }
        for article_id in self.feed_articles.remove(&id).unwrap_or_default() {
            self.articles.remove(&article_id);
            for members in self.list_members.values_mut() {
                members.remove(&article_id);
            }
        }
        Ok(())
    }

    fn delete_folder(&mut self, id: Uuid) -> Result<(), StoreError> {
        if self.folders.remove(&id).is_none() {
            return Err(StoreError::Unknown { kind: "folder", id });
        }
        for feed in self.feeds.values_mut() {
            if feed.folder_id == Some(id) {
                feed.folder_id = None;
            }
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), StoreError> {
        // Everything is already in memory; commits cannot fail here.
        Ok(())
    }
}
