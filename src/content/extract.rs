//! Heuristic extraction of the main article body from a full HTML page.
//!
//! Pure CPU work, no DOM: a short ordered list of container patterns is
//! tried first, and if none yields enough cleaned text the extractor falls
//! back to collecting the page's substantial paragraphs.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::util::{collapse_blank_lines, strip_tags};

/// A container match is accepted only if its cleaned text is longer than
/// this many characters.
const MIN_CONTAINER_TEXT: usize = 200;

/// Paragraphs with stripped text at or below this length are treated as
/// boilerplate by the fallback.
const MIN_PARAGRAPH_TEXT: usize = 50;

/// Container patterns tried in order of specificity. The first match whose
/// cleaned text passes [`MIN_CONTAINER_TEXT`] wins.
static CONTAINER_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?is)<article[^>]*>(.*?)</article>").unwrap(),
        Regex::new(
            r#"(?is)<div[^>]*class\s*=\s*["'][^"']*(?:article-content|article-body|post-body|post-content|entry-content|story-body)[^"']*["'][^>]*>(.*?)</div>"#,
        )
        .unwrap(),
        Regex::new(r"(?is)<main[^>]*>(.*?)</main>").unwrap(),
        Regex::new(
            r#"(?is)<div[^>]*id\s*=\s*["'](?:content|main-content|article|post)["'][^>]*>(.*?)</div>"#,
        )
        .unwrap(),
    ]
});

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap());
static STYLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap());
static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

/// Chrome elements removed wholesale from an extracted fragment. Built
/// per-tag because the regex engine has no backreferences.
static CHROME_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["nav", "header", "footer", "aside", "form", "noscript"]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}[^>]*>.*?</{tag}>")).unwrap())
        .collect()
});

static JUNK_DIV_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<div[^>]*class\s*=\s*["'][^"']*(?:advert|ad-|adsbygoogle|social|share|sidebar|related|comments|newsletter)[^"']*["'][^>]*>.*?</div>"#,
    )
    .unwrap()
});

static PARAGRAPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>.*?</p>").unwrap());

/// Extracts the main content region of an HTML page, keeping its markup.
///
/// Tries the container patterns in order; the first match is cleaned and
/// returned if enough text survives. Otherwise every `<p>` element with
/// substantial stripped text is collected, original markup intact, joined
/// with newlines in document order. Returns an empty string when the page
/// has neither.
pub fn extract_main_content(html: &str) -> String {
    for re in CONTAINER_RES.iter() {
        let Some(caps) = re.captures(html) else {
            continue;
        };
        let Some(inner) = caps.get(1) else {
            continue;
        };
        let cleaned = clean_fragment(inner.as_str());
        if strip_tags(&cleaned).chars().count() > MIN_CONTAINER_TEXT {
            return cleaned;
        }
    }

    paragraph_fallback(html)
}

/// Strips scripts, styles, comments, chrome blocks, and junk divs from a
/// fragment, then normalizes whitespace.
fn clean_fragment(fragment: &str) -> String {
    let mut text = SCRIPT_RE.replace_all(fragment, "").into_owned();
    text = STYLE_RE.replace_all(&text, "").into_owned();
    text = COMMENT_RE.replace_all(&text, "").into_owned();
    for re in CHROME_RES.iter() {
        text = re.replace_all(&text, "").into_owned();
    }
    text = JUNK_DIV_RE.replace_all(&text, "").into_owned();
    collapse_blank_lines(&text).trim().to_owned()
}

fn paragraph_fallback(html: &str) -> String {
    PARAGRAPH_RE
        .find_iter(html)
        .map(|m| m.as_str())
        .filter(|p| strip_tags(p).trim().chars().count() > MIN_PARAGRAPH_TEXT)
        .collect::<Vec<_>>()
        .join("\n")
}
