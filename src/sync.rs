//! Feed lifecycle: subscribing, refreshing one feed, refreshing the whole
//! library.
//!
//! Refresh-all runs its network phase concurrently but every store write
//! goes through the sequential phase that follows, behind the `&mut`
//! repository borrow. One feed's failure never aborts the rest.

use std::collections::HashSet;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use crate::config::SyncSettings;
use crate::feed::fetcher::{fetch_feed, SyncError};
use crate::model::{Article, Feed, ParsedArticle, ParsedFeed};
use crate::store::Repository;

/// Upper bound on in-flight fetches during a refresh-all pass.
const REFRESH_CONCURRENCY: usize = 8;

/// Per-feed result of a refresh-all pass. `Ok` carries the number of
/// newly inserted articles.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub feed_id: Uuid,
    pub result: Result<usize, SyncError>,
}

/// Subscribes to a feed: fetches and parses it, stores the feed with its
/// current articles, and returns the new feed's id.
///
/// The feed title falls back to the URL when the document has none.
pub async fn add_feed(
    repo: &mut impl Repository,
    client: &reqwest::Client,
    url: &str,
    folder_id: Option<Uuid>,
    settings: &SyncSettings,
) -> Result<Uuid, SyncError> {
    let parsed = fetch_feed(client, url, settings).await?;

    let feed_id = Uuid::new_v4();
    let now = Utc::now();
    let feed = Feed {
        id: feed_id,
        title: if parsed.title.is_empty() {
            url.to_owned()
        } else {
            parsed.title.clone()
        },
        description: parsed.description.clone(),
        url: url.to_owned(),
        website_url: parsed.link.clone(),
        icon_url: None,
        folder_id,
        last_fetched: Some(now),
        last_successful_fetch: Some(now),
        last_error: None,
        consecutive_failures: 0,
    };
    repo.insert_feed(feed)?;

    let inserted = insert_new_articles(
        repo,
        feed_id,
        parsed.articles,
        HashSet::new(),
        settings.max_articles_per_feed,
    )?;
    repo.save()?;

    tracing::info!(feed = %url, articles = inserted, "Subscribed to feed");
    Ok(feed_id)
}

/// Refreshes one feed by its stored URL.
///
/// New articles are those whose URL is absent from the feed's existing URL
/// set; upstream edits to an already-seen URL are deliberately ignored. On
/// success both fetch timestamps are stamped and the failure counter
/// resets; on failure the counter and `last_error` are updated and the
/// timestamps are left alone.
pub async fn refresh_feed(
    repo: &mut impl Repository,
    client: &reqwest::Client,
    feed_id: Uuid,
    settings: &SyncSettings,
) -> Result<usize, SyncError> {
    let url = repo
        .feed(feed_id)
        .ok_or(SyncError::UnknownFeed(feed_id))?
        .url
        .clone();

    match fetch_feed(client, &url, settings).await {
        Ok(parsed) => apply_refresh(repo, feed_id, parsed, settings),
        Err(e) => {
            record_failure(repo, feed_id, &e);
            Err(e)
        }
    }
}

/// Refreshes every feed in the library.
///
/// Fetch and parse run concurrently, capped at [`REFRESH_CONCURRENCY`];
/// the results are then applied to the store one at a time.
pub async fn refresh_all_feeds(
    repo: &mut impl Repository,
    client: &reqwest::Client,
    settings: &SyncSettings,
) -> Vec<RefreshOutcome> {
    let targets: Vec<(Uuid, String)> = repo
        .feeds()
        .into_iter()
        .map(|f| (f.id, f.url.clone()))
        .collect();

    let fetches = stream::iter(targets.into_iter().map(|(feed_id, url)| {
        let client = client.clone();
        let settings = settings.clone();
        async move { (feed_id, fetch_feed(&client, &url, &settings).await) }
    }))
    .buffer_unordered(REFRESH_CONCURRENCY)
    .collect::<Vec<_>>()
    .await;

    let mut outcomes = Vec::with_capacity(fetches.len());
    for (feed_id, fetched) in fetches {
        let result = match fetched {
            Ok(parsed) => apply_refresh(repo, feed_id, parsed, settings),
            Err(e) => {
                record_failure(repo, feed_id, &e);
                Err(e)
            }
        };
        outcomes.push(RefreshOutcome { feed_id, result });
    }
    outcomes
}

/// Write phase of a successful refresh: dedup-insert the new articles,
/// backfill `website_url` if the document now advertises one, stamp the
/// health fields, and persist.
fn apply_refresh(
    repo: &mut impl Repository,
    feed_id: Uuid,
    parsed: ParsedFeed,
    settings: &SyncSettings,
) -> Result<usize, SyncError> {
    let known = repo.article_urls_for_feed(feed_id);
    let inserted = insert_new_articles(
        repo,
        feed_id,
        parsed.articles,
        known,
        settings.max_articles_per_feed,
    )?;

    let feed = repo
        .feed_mut(feed_id)
        .ok_or(SyncError::UnknownFeed(feed_id))?;
    if feed.website_url.is_none() {
        feed.website_url = parsed.link;
    }
    let now = Utc::now();
    feed.last_fetched = Some(now);
    feed.last_successful_fetch = Some(now);
    feed.last_error = None;
    feed.consecutive_failures = 0;

    repo.save()?;
    Ok(inserted)
}

/// Inserts the articles whose URL is not already known, tracking URLs
/// inserted this batch so a document repeating an item stores it once.
/// `cap` limits insertions per call; zero means unlimited.
fn insert_new_articles(
    repo: &mut impl Repository,
    feed_id: Uuid,
    articles: Vec<ParsedArticle>,
    mut known: HashSet<String>,
    cap: usize,
) -> Result<usize, SyncError> {
    let mut inserted = 0;
    for parsed in articles {
        if cap > 0 && inserted >= cap {
            break;
        }
        if parsed.url.is_empty() || known.contains(&parsed.url) {
            continue;
        }
        known.insert(parsed.url.clone());
        repo.insert_article(Article::from_parsed(feed_id, parsed))?;
        inserted += 1;
    }
    Ok(inserted)
}

/// Bumps the failure counter and records the error; fetch timestamps stay
/// untouched so the last good sync remains visible.
fn record_failure(repo: &mut impl Repository, feed_id: Uuid, error: &SyncError) {
    let Some(feed) = repo.feed_mut(feed_id) else {
        return;
    };
    feed.consecutive_failures += 1;
    feed.last_error = Some(error.to_string());
    if !feed.is_healthy() {
        tracing::warn!(
            feed = %feed.url,
            failures = feed.consecutive_failures,
            "Feed is unhealthy"
        );
    }
    if let Err(e) = repo.save() {
        tracing::warn!(feed_id = %feed_id, error = %e, "Failed to persist refresh failure");
    }
}
