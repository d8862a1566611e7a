//! OPML 2.0 reading and writing.
//!
//! Import preserves one level of structure: top-level `type="rss"` outlines
//! are folderless feeds, any other top-level outline is a folder whose
//! nested feed outlines belong to it (deeper nesting is flattened into the
//! same folder). Folders that end up with no feeds are dropped.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// Maximum allowed nesting depth for OPML outline elements.
const MAX_OPML_DEPTH: usize = 50;

#[derive(Debug, Error)]
pub enum OpmlError {
    #[error("XML parse error: {0}")]
    XmlParsingFailed(String),

    /// The document has no `<opml>` root.
    #[error("not an OPML document")]
    InvalidFormat,

    /// Nesting depth exceeds the safety limit.
    #[error("OPML nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    #[error("failed to serialize OPML: {0}")]
    Write(String),
}

/// One feed subscription from an `<outline>` with an `xmlUrl` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct OpmlFeedEntry {
    /// From `text` (then `title`), falling back to the feed URL.
    pub title: String,
    pub feed_url: String,
    pub website_url: Option<String>,
    pub description: Option<String>,
}

/// A top-level grouping outline and the feeds nested under it.
#[derive(Debug, Clone, PartialEq)]
pub struct OpmlFolder {
    pub name: String,
    pub feeds: Vec<OpmlFeedEntry>,
}

/// Structured view of an OPML file: its head title, folders, and feeds
/// that sit outside any folder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpmlDocument {
    pub title: Option<String>,
    pub folders: Vec<OpmlFolder>,
    pub orphan_feeds: Vec<OpmlFeedEntry>,
}

impl OpmlDocument {
    pub fn feed_count(&self) -> usize {
        self.orphan_feeds.len() + self.folders.iter().map(|f| f.feeds.len()).sum::<usize>()
    }
}

/// Parses OPML content into a structured document.
///
/// XXE is structurally mitigated: quick-xml (0.37) never parses `<!ENTITY>`
/// declarations, so custom entity references fail to unescape rather than
/// expand. Outline nesting beyond [`MAX_OPML_DEPTH`] is rejected.
pub fn parse_document(content: &str) -> Result<OpmlDocument, OpmlError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut doc = OpmlDocument::default();
    let mut buf = Vec::new();
    let mut saw_opml = false;
    let mut in_head_title = false;
    let mut depth: usize = 0;
    // Name and accumulated feeds of the currently open top-level folder.
    let mut open_folder: Option<(String, Vec<OpmlFeedEntry>)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"opml" => saw_opml = true,
                b"title" => in_head_title = true,
                b"outline" => {
                    depth += 1;
                    if depth > MAX_OPML_DEPTH {
                        return Err(OpmlError::MaxDepthExceeded(MAX_OPML_DEPTH));
                    }
                    let attrs = outline_attributes(&e, &reader)?;
                    if attrs.xml_url.is_some() {
                        if let Some(feed) = attrs.into_feed() {
                            match open_folder.as_mut() {
                                Some((_, feeds)) => feeds.push(feed),
                                None => doc.orphan_feeds.push(feed),
                            }
                        }
                    } else if depth == 1 {
                        open_folder = Some((attrs.display_name(), Vec::new()));
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"opml" => saw_opml = true,
                b"outline" => {
                    // Self-closing outlines do not affect depth
                    if let Some(feed) = outline_attributes(&e, &reader)?.into_feed() {
                        match open_folder.as_mut() {
                            Some((_, feeds)) => feeds.push(feed),
                            None => doc.orphan_feeds.push(feed),
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"title" => in_head_title = false,
                b"outline" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        if let Some((name, feeds)) = open_folder.take() {
                            if !feeds.is_empty() {
                                doc.folders.push(OpmlFolder { name, feeds });
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_head_title && doc.title.is_none() => {
                match t.unescape() {
                    Ok(text) => doc.title = Some(text.into_owned()),
                    Err(e) => return Err(OpmlError::XmlParsingFailed(e.to_string())),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpmlError::XmlParsingFailed(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !saw_opml {
        return Err(OpmlError::InvalidFormat);
    }
    Ok(doc)
}

#[derive(Default)]
struct OutlineAttrs {
    text: Option<String>,
    title: Option<String>,
    xml_url: Option<String>,
    html_url: Option<String>,
    description: Option<String>,
}

impl OutlineAttrs {
    /// `text` first, then `title`; empty string if neither is present.
    fn display_name(&self) -> String {
        self.text
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_default()
    }

    /// A feed outline is any outline carrying `xmlUrl`.
    fn into_feed(self) -> Option<OpmlFeedEntry> {
        let feed_url = self.xml_url?;
        let title = self
            .text
            .or(self.title)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| feed_url.clone());
        Some(OpmlFeedEntry {
            title,
            feed_url,
            website_url: self.html_url,
            description: self.description,
        })
    }
}

fn outline_attributes(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<OutlineAttrs, OpmlError> {
    let mut attrs = OutlineAttrs::default();
    let decoder = reader.decoder();

    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed OPML attribute");
                continue;
            }
        };
        let value = attr
            .decode_and_unescape_value(decoder)
            .map_err(|e| OpmlError::XmlParsingFailed(e.to_string()))?
            .into_owned();
        match attr.key.as_ref() {
            b"text" => attrs.text = Some(value),
            b"title" => attrs.title = Some(value),
            b"xmlUrl" => attrs.xml_url = Some(value),
            b"htmlUrl" => attrs.html_url = Some(value),
            b"description" => attrs.description = Some(value),
            _ => {}
        }
    }

    Ok(attrs)
}

/// Serializes a document as OPML 2.0.
///
/// Folderless feeds are written first, then each folder as an outline
/// wrapping its feeds. Attribute values are escaped by quick-xml's writer.
pub fn write_document(doc: &OpmlDocument) -> Result<String, OpmlError> {
    fn wr(e: impl std::fmt::Display) -> OpmlError {
        OpmlError::Write(e.to_string())
    }

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(wr)?;

    let mut opml = BytesStart::new("opml");
    opml.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(opml)).map_err(wr)?;

    writer
        .write_event(Event::Start(BytesStart::new("head")))
        .map_err(wr)?;
    writer
        .write_event(Event::Start(BytesStart::new("title")))
        .map_err(wr)?;
    let title = doc.title.as_deref().unwrap_or("Feed Subscriptions");
    writer
        .write_event(Event::Text(BytesText::new(title)))
        .map_err(wr)?;
    writer
        .write_event(Event::End(BytesEnd::new("title")))
        .map_err(wr)?;
    writer
        .write_event(Event::Start(BytesStart::new("dateCreated")))
        .map_err(wr)?;
    let stamp = chrono::Utc::now().to_rfc2822();
    writer
        .write_event(Event::Text(BytesText::new(&stamp)))
        .map_err(wr)?;
    writer
        .write_event(Event::End(BytesEnd::new("dateCreated")))
        .map_err(wr)?;
    writer
        .write_event(Event::End(BytesEnd::new("head")))
        .map_err(wr)?;

    writer
        .write_event(Event::Start(BytesStart::new("body")))
        .map_err(wr)?;

    for feed in &doc.orphan_feeds {
        writer
            .write_event(Event::Empty(feed_outline(feed)))
            .map_err(wr)?;
    }

    for folder in &doc.folders {
        let mut outline = BytesStart::new("outline");
        outline.push_attribute(("text", folder.name.as_str()));
        outline.push_attribute(("title", folder.name.as_str()));
        writer.write_event(Event::Start(outline)).map_err(wr)?;
        for feed in &folder.feeds {
            writer
                .write_event(Event::Empty(feed_outline(feed)))
                .map_err(wr)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("outline")))
            .map_err(wr)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("body")))
        .map_err(wr)?;
    writer
        .write_event(Event::End(BytesEnd::new("opml")))
        .map_err(wr)?;

    String::from_utf8(writer.into_inner()).map_err(|e| OpmlError::Write(e.to_string()))
}

fn feed_outline(feed: &OpmlFeedEntry) -> BytesStart<'static> {
    let mut outline = BytesStart::new("outline");
    outline.push_attribute(("type", "rss"));
    outline.push_attribute(("text", feed.title.as_str()));
    outline.push_attribute(("title", feed.title.as_str()));
    outline.push_attribute(("xmlUrl", feed.feed_url.as_str()));
    if let Some(ref website) = feed.website_url {
        outline.push_attribute(("htmlUrl", website.as_str()));
    }
    if let Some(ref description) = feed.description {
        outline.push_attribute(("description", description.as_str()));
    }
    outline
}
