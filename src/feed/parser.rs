//! Streaming RSS/RDF/Atom parser.
//!
//! A single forward pass over XML events feeds an explicit state machine
//! (`ParserState`) instead of callback-mutated fields, so container
//! enter/exit transitions are testable without a real tokenizer run. The
//! root element classifies the dialect, which gates how the ambiguous
//! `link` and `description`/`summary` tags are interpreted.

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::dates::parse_date;
use crate::model::{ParsedArticle, ParsedFeed};
use crate::util::strip_control_chars;

/// Anchor whose text is literally `[link]`, the marker Reddit puts on
/// link posts, pointing at the submitted external page.
static EXTERNAL_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a[^>]+href\s*=\s*["']([^"']+)["'][^>]*>\s*\[link\]\s*</a>"#).unwrap()
});

#[derive(Debug, Error)]
pub enum ParseError {
    /// The underlying XML was not well-formed.
    #[error("malformed feed XML: {0}")]
    Xml(String),
    /// The document produced no usable parse and no error detail.
    #[error("feed document could not be parsed")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FeedKind {
    #[default]
    Unknown,
    Rss,
    Atom,
}

/// Accumulator for the item/entry currently being parsed.
#[derive(Debug, Default)]
struct ArticleDraft {
    title: String,
    summary: String,
    content: String,
    url: String,
    external_url: Option<String>,
    author: Option<String>,
    published: Option<chrono::DateTime<chrono::Utc>>,
}

impl ArticleDraft {
    /// Backfills content/summary from each other so both are non-empty
    /// whenever the source supplied any body text, then sanitizes the
    /// fields that end up in logs and UI chrome.
    fn finalize(self) -> ParsedArticle {
        let mut content = self.content;
        let mut summary = self.summary;
        if content.is_empty() {
            content = summary.clone();
        }
        if summary.is_empty() {
            summary = content.clone();
        }

        ParsedArticle {
            title: strip_control_chars(&self.title).into_owned(),
            summary,
            content,
            url: self.url,
            external_url: self.external_url,
            author: self
                .author
                .map(|a| strip_control_chars(&a).into_owned()),
            published: self.published.unwrap_or_else(chrono::Utc::now),
        }
    }
}

/// Explicit parser state threaded through the event loop.
#[derive(Debug, Default)]
struct ParserState {
    kind: FeedKind,
    saw_root: bool,
    in_item: bool,
    in_author: bool,
    current: Option<ArticleDraft>,
    text: String,
    feed: ParsedFeed,
}

/// Elements the state machine consumes on exit. Anything else, like the
/// inline markup inside an xhtml `<content>` block or a mixed-content
/// title, is pass-through: its character data keeps accumulating into the
/// enclosing handled element's buffer.
fn is_handled_element(name: &str) -> bool {
    matches!(
        name,
        "item"
            | "entry"
            | "author"
            | "name"
            | "title"
            | "description"
            | "summary"
            | "subtitle"
            | "content"
            | "content:encoded"
            | "link"
            | "dc:creator"
            | "pubdate"
            | "published"
            | "updated"
            | "dc:date"
    )
}

impl ParserState {
    fn enter_element(&mut self, name: &str, href: Option<(String, Option<String>)>) {
        if !self.saw_root {
            self.saw_root = true;
            self.kind = match name {
                "rss" | "rdf:rdf" => FeedKind::Rss,
                "feed" => FeedKind::Atom,
                _ => FeedKind::Unknown,
            };
            return;
        }

        if !is_handled_element(name) {
            return;
        }
        self.text.clear();

        match name {
            "item" | "entry" => {
                self.in_item = true;
                self.current = Some(ArticleDraft::default());
            }
            "author" => self.in_author = true,
            "link" => {
                // Atom carries the URL in the href attribute, filtered by
                // rel (alternate or absent); first matching link wins.
                if let Some((href, rel)) = href {
                    let accepted = match rel.as_deref() {
                        None => true,
                        Some(rel) => rel.eq_ignore_ascii_case("alternate"),
                    };
                    if accepted {
                        match self.current.as_mut() {
                            Some(article) if self.in_item => {
                                if article.url.is_empty() {
                                    article.url = href;
                                }
                            }
                            _ => {
                                if self.feed.link.is_none() {
                                    self.feed.link = Some(href);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn exit_element(&mut self, name: &str) {
        if !is_handled_element(name) {
            return;
        }
        let text = std::mem::take(&mut self.text).trim().to_owned();

        match name {
            "item" | "entry" => {
                if let Some(draft) = self.current.take() {
                    self.feed.articles.push(draft.finalize());
                }
                self.in_item = false;
            }
            "author" => {
                // RSS carries the author as element text; Atom nests it in
                // <author><name>, handled via the in_author flag below.
                self.in_author = false;
                if let Some(article) = self.current.as_mut() {
                    if article.author.is_none() && !text.is_empty() {
                        article.author = Some(text);
                    }
                }
            }
            _ if self.in_item => self.exit_item_element(name, text),
            _ => self.exit_feed_element(name, text),
        }
    }

    fn exit_item_element(&mut self, name: &str, text: String) {
        let Some(article) = self.current.as_mut() else {
            return;
        };

        match name {
            "title" => {
                if article.title.is_empty() {
                    article.title = text;
                }
            }
            "description" | "summary" => {
                if article.summary.is_empty() {
                    article.summary = text;
                }
            }
            "content" | "content:encoded" => {
                if article.content.is_empty() && !text.is_empty() {
                    if article.external_url.is_none() {
                        article.external_url = extract_external_link(&text);
                    }
                    article.content = text;
                }
            }
            "link" => {
                // RSS item links are text content; Atom links were already
                // consumed from the href attribute.
                if self.kind != FeedKind::Atom && article.url.is_empty() && !text.is_empty() {
                    article.url = text;
                }
            }
            "dc:creator" => {
                if article.author.is_none() && !text.is_empty() {
                    article.author = Some(text);
                }
            }
            "name" if self.in_author => {
                if article.author.is_none() && !text.is_empty() {
                    article.author = Some(text);
                }
            }
            "pubdate" | "published" | "updated" | "dc:date" => {
                if article.published.is_none() {
                    article.published = parse_date(&text);
                }
            }
            _ => {}
        }
    }

    fn exit_feed_element(&mut self, name: &str, text: String) {
        // Feed-level metadata: first occurrence wins, never overwritten.
        match name {
            "title" => {
                if self.feed.title.is_empty() {
                    self.feed.title = text;
                }
            }
            "description" | "subtitle" => {
                if self.feed.description.is_empty() {
                    self.feed.description = text;
                }
            }
            "link" => {
                if self.kind != FeedKind::Atom && self.feed.link.is_none() && !text.is_empty() {
                    self.feed.link = Some(text);
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Result<ParsedFeed, ParseError> {
        if !self.saw_root {
            return Err(ParseError::Unknown);
        }
        self.feed.title = strip_control_chars(&self.feed.title).into_owned();
        self.feed.description = strip_control_chars(&self.feed.description).into_owned();
        Ok(self.feed)
    }
}

/// Parses raw feed bytes into a [`ParsedFeed`].
///
/// A feed with zero items yields an empty article list, not an error.
/// Malformed XML fails with [`ParseError::Xml`]; an empty or element-less
/// document fails with [`ParseError::Unknown`].
pub fn parse(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(false);

    let mut state = ParserState::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = element_name(e.name().as_ref());
                let href = link_attributes(&e);
                state.enter_element(&name, href);
            }
            Ok(Event::Empty(e)) => {
                // Self-closing element: enter then immediately exit.
                let name = element_name(e.name().as_ref());
                let href = link_attributes(&e);
                state.enter_element(&name, href);
                state.exit_element(&name);
            }
            Ok(Event::End(e)) => {
                let name = element_name(e.name().as_ref());
                state.exit_element(&name);
            }
            Ok(Event::Text(e)) => {
                let text = match e.unescape() {
                    Ok(t) => t.into_owned(),
                    // Unknown entities are kept literally rather than
                    // aborting the whole document.
                    Err(_) => String::from_utf8_lossy(e.as_ref()).into_owned(),
                };
                state.text.push_str(&text);
            }
            Ok(Event::CData(e)) => {
                // CDATA joins the same running buffer as character data.
                state
                    .text
                    .push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ParseError::Xml(e.to_string())),
        }
        buf.clear();
    }

    state.finish()
}

/// Lowercased qualified element name; matching is case-insensitive
/// throughout.
fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

/// Pulls `(href, rel)` off a `<link>`-shaped element, if present.
fn link_attributes(e: &quick_xml::events::BytesStart<'_>) -> Option<(String, Option<String>)> {
    let mut href = None;
    let mut rel = None;

    for attr in e.attributes().flatten() {
        let key = element_name(attr.key.as_ref());
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match key.as_str() {
            "href" => href = Some(value),
            "rel" => rel = Some(value),
            _ => {}
        }
    }

    href.map(|h| (h, rel))
}

/// Finds a Reddit-style `[link]` anchor and returns its target, unless the
/// target is Reddit itself.
fn extract_external_link(content: &str) -> Option<String> {
    let caps = EXTERNAL_LINK_RE.captures(content)?;
    let href = caps.get(1)?.as_str();

    let host = Url::parse(href).ok()?.host_str()?.to_ascii_lowercase();
    let is_reddit = host == "reddit.com"
        || host.ends_with(".reddit.com")
        || host == "redd.it"
        || host.ends_with(".redd.it");

    if is_reddit {
        None
    } else {
        Some(href.to_owned())
    }
}
