//! Feed autodiscovery from a website URL.
//!
//! Two stages: scan the page's `<link>` tags for an advertised RSS/Atom
//! feed, then fall back to probing a fixed list of conventional paths.
//! Finding nothing is `Ok(None)`, not an error.

use url::Url;

use crate::config::SyncSettings;
use crate::feed::fetcher::{fetch_feed, read_limited_bytes, SyncError};
use crate::util::validate_http_url;

/// Paths probed when the page does not advertise a feed.
const CONVENTIONAL_PATHS: &[&str] = &[
    "/feed",
    "/rss",
    "/feed.xml",
    "/rss.xml",
    "/atom.xml",
    "/index.xml",
];

/// Attempts to find the feed URL for a website.
///
/// Fetches the page, scans for `<link>` tags advertising
/// `application/rss+xml` or `application/atom+xml` (either attribute
/// order, single or double quotes), resolving relative hrefs against the
/// page URL. If no tag matches, probes [`CONVENTIONAL_PATHS`] and returns
/// the first candidate that fetches and parses as a feed.
pub async fn discover_feed(
    client: &reqwest::Client,
    website_url: &str,
    settings: &SyncSettings,
) -> Result<Option<String>, SyncError> {
    let page_url =
        validate_http_url(website_url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;

    let response = tokio::time::timeout(
        settings.request_timeout(),
        client
            .get(page_url.clone())
            .header(reqwest::header::USER_AGENT, &settings.user_agent)
            .send(),
    )
    .await
    .map_err(|_| SyncError::Timeout)?
    .map_err(SyncError::Network)?;

    if !response.status().is_success() {
        return Err(SyncError::InvalidResponse(response.status().as_u16()));
    }

    let bytes = read_limited_bytes(response, settings.max_response_bytes).await?;
    let html = String::from_utf8_lossy(&bytes);

    if let Some(href) = find_feed_link(&html, &page_url) {
        tracing::debug!(page = %page_url, feed = %href, "Found advertised feed link");
        return Ok(Some(href));
    }

    for path in CONVENTIONAL_PATHS {
        let Ok(candidate) = page_url.join(path) else {
            continue;
        };
        let candidate = candidate.to_string();
        if fetch_feed(client, &candidate, settings).await.is_ok() {
            tracing::debug!(page = %page_url, feed = %candidate, "Probed conventional feed path");
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}

/// Scans HTML for a `<link>` tag with `rel="alternate"` and an RSS/Atom
/// type, returning its href resolved against the page URL.
///
/// Simple string scanning, no HTML parser: attributes are matched
/// independently so both orderings work.
fn find_feed_link(html: &str, base: &Url) -> Option<String> {
    // ASCII lowercasing is byte-length-preserving, so offsets into the
    // lowered copy stay valid in the original. Unicode lowercasing is not
    // (U+0130 grows from two bytes to three) and would shift every slice
    // after it. Tag and attribute names are ASCII anyway.
    let html_lower = html.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(link_start) = html_lower[search_from..].find("<link") {
        let abs_start = search_from + link_start;
        let remaining = &html_lower[abs_start..];

        let tag_end = remaining.find('>')?;
        let tag = &remaining[..=tag_end];

        if contains_attr(tag, "rel", "alternate") && is_feed_type(tag) {
            // Pull href from the original-case HTML to preserve URL case
            let original_tag = &html[abs_start..abs_start + tag_end + 1];
            if let Some(href) = extract_attr_value(original_tag, "href") {
                return Some(resolve_href(href, base));
            }
        }

        search_from = abs_start + tag_end + 1;
    }

    None
}

/// Checks a lowercased tag for `attr="value"` or `attr='value'`.
fn contains_attr(tag: &str, attr_name: &str, attr_value: &str) -> bool {
    let double = format!("{attr_name}=\"{attr_value}\"");
    let single = format!("{attr_name}='{attr_value}'");
    tag.contains(&double) || tag.contains(&single)
}

fn is_feed_type(tag: &str) -> bool {
    tag.contains("application/rss+xml") || tag.contains("application/atom+xml")
}

/// Extracts a quoted attribute value from a tag string, case-preserving.
///
/// The attribute name must sit on a whitespace boundary so `href=` never
/// matches inside `data-href=`.
fn extract_attr_value<'a>(tag: &'a str, attr_name: &str) -> Option<&'a str> {
    let tag_lower = tag.to_ascii_lowercase();
    let prefix = format!("{attr_name}=");
    let mut from = 0;

    while let Some(pos) = tag_lower[from..].find(&prefix) {
        let attr_start = from + pos;
        from = attr_start + prefix.len();

        let preceded_by_space = attr_start > 0
            && tag_lower.as_bytes()[attr_start - 1].is_ascii_whitespace();
        if !preceded_by_space {
            continue;
        }

        let rest = tag.get(attr_start + prefix.len()..)?;
        let quote = *rest.as_bytes().first()?;
        if quote != b'"' && quote != b'\'' {
            continue;
        }

        let inner = &rest[1..];
        let end = inner.find(quote as char)?;
        return Some(&inner[..end]);
    }

    None
}

fn resolve_href(href: &str, base: &Url) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_owned();
    }
    match base.join(href) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => href.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn base() -> Url {
        Url::parse("https://example.com/blog/").unwrap()
    }

    #[test]
    fn finds_rss_link_tag() {
        let html = r#"<html><head>
            <link rel="alternate" type="application/rss+xml" href="/feed.xml" title="RSS">
        </head></html>"#;
        assert_eq!(
            find_feed_link(html, &base()),
            Some("https://example.com/feed.xml".to_owned())
        );
    }

    #[test]
    fn finds_atom_link_with_reversed_attributes() {
        let html = r#"<link href="https://example.com/atom.xml" type="application/atom+xml" rel="alternate">"#;
        assert_eq!(
            find_feed_link(html, &base()),
            Some("https://example.com/atom.xml".to_owned())
        );
    }

    #[test]
    fn finds_link_with_single_quotes() {
        let html = r#"<link rel='alternate' type='application/rss+xml' href='/rss'>"#;
        assert_eq!(
            find_feed_link(html, &base()),
            Some("https://example.com/rss".to_owned())
        );
    }

    #[test]
    fn uppercase_tag_matched_href_case_preserved() {
        let html = r#"<LINK REL="alternate" TYPE="application/rss+xml" HREF="/Feed.XML">"#;
        assert_eq!(
            find_feed_link(html, &base()),
            Some("https://example.com/Feed.XML".to_owned())
        );
    }

    #[test]
    fn multibyte_text_before_link_tag_keeps_offsets_aligned() {
        // U+0130 lowercases to two code points under full Unicode rules,
        // which used to desynchronize slice offsets into the original HTML
        let html = "<title>İstanbul Haberleri</title>\
            <link rel=\"alternate\" type=\"application/rss+xml\" href=\"/feed\">";
        assert_eq!(
            find_feed_link(html, &base()),
            Some("https://example.com/feed".to_owned())
        );
    }

    #[test]
    fn data_href_attribute_not_mistaken_for_href() {
        let html = r#"<link rel="alternate" type="application/rss+xml" data-href="/wrong" href="/right">"#;
        assert_eq!(
            find_feed_link(html, &base()),
            Some("https://example.com/right".to_owned())
        );

        let only_data = r#"<link rel="alternate" type="application/rss+xml" data-href="/wrong">"#;
        assert_eq!(find_feed_link(only_data, &base()), None);
    }

    #[test]
    fn stylesheet_links_ignored() {
        let html = r#"<link rel="stylesheet" href="/style.css">"#;
        assert_eq!(find_feed_link(html, &base()), None);
    }

    #[test]
    fn relative_href_resolved_against_page() {
        let html = r#"<link rel="alternate" type="application/rss+xml" href="feed.xml">"#;
        assert_eq!(
            find_feed_link(html, &base()),
            Some("https://example.com/blog/feed.xml".to_owned())
        );
    }

    #[tokio::test]
    async fn advertised_link_returned_without_probing() {
        let server = MockServer::start().await;
        let html = r#"<html><head>
            <link rel="alternate" type="application/rss+xml" href="https://feeds.example.com/main">
        </head></html>"#;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let found = discover_feed(&client, &server.uri(), &SyncSettings::default())
            .await
            .unwrap();
        assert_eq!(found.as_deref(), Some("https://feeds.example.com/main"));
    }

    #[tokio::test]
    async fn conventional_path_probed_when_page_has_no_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>hi</body></html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<rss version="2.0"><channel><title>Probe</title></channel></rss>"#,
            ))
            .mount(&server)
            .await;
        // Everything else 404s
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let found = discover_feed(&client, &server.uri(), &SyncSettings::default())
            .await
            .unwrap();
        assert_eq!(found, Some(format!("{}/feed.xml", server.uri())));
    }

    #[tokio::test]
    async fn nothing_found_is_none_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let found = discover_feed(&client, &server.uri(), &SyncSettings::default())
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn invalid_website_url_is_an_error() {
        let client = reqwest::Client::new();
        let result = discover_feed(&client, "not a url", &SyncSettings::default()).await;
        assert!(matches!(result, Err(SyncError::InvalidUrl(_))));
    }
}
