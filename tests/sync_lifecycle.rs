//! Integration tests for the feed lifecycle: subscribe, refresh, dedupe,
//! failure accounting, whole-library refresh.
//!
//! Each test runs against its own in-memory store and a wiremock server,
//! exercising the fetch → parse → store pipeline end-to-end.

use feedling::store::Repository;
use feedling::{add_feed, refresh_all_feeds, refresh_feed, MemoryStore, SyncError, SyncSettings};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Opt-in test diagnostics: `RUST_LOG=feedling=debug cargo test`.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn rss_document(items: &[(&str, &str)]) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0"?><rss version="2.0"><channel>
        <title>Lifecycle Feed</title>
        <description>Feed used by lifecycle tests</description>
        <link>https://lifecycle.example.com</link>"#,
    );
    for (title, url) in items {
        body.push_str(&format!(
            "<item><title>{title}</title><link>{url}</link>\
             <description>{title} summary</description>\
             <pubDate>Mon, 02 Jan 2006 15:04:05 +0000</pubDate></item>"
        ));
    }
    body.push_str("</channel></rss>");
    body
}

async fn mount_rss(server: &MockServer, at: &str, items: &[(&str, &str)]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_document(items)))
        .mount(server)
        .await;
}

// ============================================================================
// Subscribe and refresh
// ============================================================================

#[tokio::test]
async fn subscribe_then_refresh_is_idempotent() {
    init_tracing();
    let server = MockServer::start().await;
    mount_rss(
        &server,
        "/feed",
        &[
            ("First", "https://lifecycle.example.com/1"),
            ("Second", "https://lifecycle.example.com/2"),
        ],
    )
    .await;

    let mut store = MemoryStore::new();
    let client = reqwest::Client::new();
    let settings = SyncSettings::default();
    let url = format!("{}/feed", server.uri());

    let feed_id = add_feed(&mut store, &client, &url, None, &settings)
        .await
        .unwrap();
    assert_eq!(store.articles_for_feed(feed_id).len(), 2);

    // Same document again: nothing new to insert
    for _ in 0..3 {
        let inserted = refresh_feed(&mut store, &client, feed_id, &settings)
            .await
            .unwrap();
        assert_eq!(inserted, 0);
    }
    assert_eq!(store.articles_for_feed(feed_id).len(), 2);
}

#[tokio::test]
async fn refresh_picks_up_new_items_only() {
    init_tracing();
    let server = MockServer::start().await;
    mount_rss(&server, "/v1", &[("First", "https://lifecycle.example.com/1")]).await;
    mount_rss(
        &server,
        "/v2",
        &[
            ("First edited", "https://lifecycle.example.com/1"),
            ("Second", "https://lifecycle.example.com/2"),
        ],
    )
    .await;

    let mut store = MemoryStore::new();
    let client = reqwest::Client::new();
    let settings = SyncSettings::default();

    let feed_id = add_feed(
        &mut store,
        &client,
        &format!("{}/v1", server.uri()),
        None,
        &settings,
    )
    .await
    .unwrap();

    store.feed_mut(feed_id).unwrap().url = format!("{}/v2", server.uri());
    let inserted = refresh_feed(&mut store, &client, feed_id, &settings)
        .await
        .unwrap();

    // URL is the sole dedup key: the edited title of an existing URL is
    // not re-ingested, only the genuinely new item lands
    assert_eq!(inserted, 1);
    let articles = store.articles_for_feed(feed_id);
    assert_eq!(articles.len(), 2);
    assert!(articles.iter().any(|a| a.title == "First"));
    assert!(!articles.iter().any(|a| a.title == "First edited"));
}

// ============================================================================
// Failure accounting
// ============================================================================

#[tokio::test]
async fn three_failures_mark_feed_unhealthy() {
    init_tracing();
    let server = MockServer::start().await;
    mount_rss(&server, "/feed", &[("First", "https://lifecycle.example.com/1")]).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut store = MemoryStore::new();
    let client = reqwest::Client::new();
    let settings = SyncSettings::default();

    let feed_id = add_feed(
        &mut store,
        &client,
        &format!("{}/feed", server.uri()),
        None,
        &settings,
    )
    .await
    .unwrap();
    let good_stamp = store.feed(feed_id).unwrap().last_successful_fetch;

    store.feed_mut(feed_id).unwrap().url = format!("{}/broken", server.uri());
    for _ in 0..3 {
        let err = refresh_feed(&mut store, &client, feed_id, &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidResponse(503)));
    }

    let feed = store.feed(feed_id).unwrap();
    assert!(!feed.is_healthy());
    assert_eq!(feed.consecutive_failures, 3);
    assert!(feed.last_error.is_some());
    assert_eq!(feed.last_successful_fetch, good_stamp);

    // Recovery resets the counter
    store.feed_mut(feed_id).unwrap().url = format!("{}/feed", server.uri());
    refresh_feed(&mut store, &client, feed_id, &settings)
        .await
        .unwrap();
    assert!(store.feed(feed_id).unwrap().is_healthy());
}

// ============================================================================
// Whole-library refresh
// ============================================================================

#[tokio::test]
async fn refresh_all_continues_past_broken_feeds() {
    init_tracing();
    let server = MockServer::start().await;
    mount_rss(&server, "/a", &[("A1", "https://a.example.com/1")]).await;
    mount_rss(&server, "/b", &[("B1", "https://b.example.com/1")]).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut store = MemoryStore::new();
    let client = reqwest::Client::new();
    let settings = SyncSettings::default();

    let a = add_feed(&mut store, &client, &format!("{}/a", server.uri()), None, &settings)
        .await
        .unwrap();
    let b = add_feed(&mut store, &client, &format!("{}/b", server.uri()), None, &settings)
        .await
        .unwrap();
    let broken = add_feed(&mut store, &client, &format!("{}/a", server.uri()), None, &settings)
        .await
        .unwrap();
    store.feed_mut(broken).unwrap().url = format!("{}/broken", server.uri());

    let outcomes = refresh_all_feeds(&mut store, &client, &settings).await;
    assert_eq!(outcomes.len(), 3);

    for id in [a, b] {
        let outcome = outcomes.iter().find(|o| o.feed_id == id).unwrap();
        assert!(outcome.result.is_ok());
        assert!(store.feed(id).unwrap().is_healthy());
    }

    let failed = outcomes.iter().find(|o| o.feed_id == broken).unwrap();
    assert!(failed.result.is_err());
    assert_eq!(store.feed(broken).unwrap().consecutive_failures, 1);
}

// ============================================================================
// Deletion semantics
// ============================================================================

#[tokio::test]
async fn deleting_a_feed_cascades_to_articles() {
    init_tracing();
    let server = MockServer::start().await;
    mount_rss(&server, "/feed", &[("First", "https://lifecycle.example.com/1")]).await;

    let mut store = MemoryStore::new();
    let client = reqwest::Client::new();
    let settings = SyncSettings::default();

    let feed_id = add_feed(
        &mut store,
        &client,
        &format!("{}/feed", server.uri()),
        None,
        &settings,
    )
    .await
    .unwrap();
    assert_eq!(store.articles_for_feed(feed_id).len(), 1);

    store.delete_feed(feed_id).unwrap();
    assert!(store.feed(feed_id).is_none());
    assert!(store.articles_for_feed(feed_id).is_empty());
}
