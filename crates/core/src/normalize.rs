//! Field normalization: turns extracted article data into render-ready values.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::article::ArticleContent;
use crate::matcher::ArticleRoute;
use crate::{BroadsheetError, Result};

/// Glyph closing the last paragraph of real article content.
pub const END_OF_ARTICLE: char = '■';

/// Accepted timestamp layouts, tried in order.
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S%.fZ"];

/// Human publish date, e.g. `May 01 2024, 10:00 AM`.
const DISPLAY_FORMAT: &str = "%b %d %Y, %I:%M %p";

const TEXT_ONLY_MARKER: &str = " (Text Only)";

/// Article fields ready for composition and rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedArticle {
    pub headline: String,
    /// Headline reduced to ASCII for the PDF Info dictionary.
    pub ascii_title: String,
    pub description: String,
    pub published: NaiveDateTime,
    /// Body paragraphs up to the end-of-article glyph.
    pub paragraphs: Vec<String>,
    pub author: String,
    pub creator: String,
    pub publisher: String,
    pub language: String,
    pub keywords: String,
    pub section: String,
    pub webpage: Option<String>,
    pub thumbnail: Option<String>,
}

impl NormalizedArticle {
    pub fn display_date(&self) -> String {
        self.published.format(DISPLAY_FORMAT).to_string()
    }
}

/// Normalizes an extracted content block.
///
/// # Errors
///
/// Returns [`BroadsheetError::DateParse`] if the timestamp matches neither
/// accepted layout.
pub fn normalize(content: &ArticleContent, text_only: bool) -> Result<NormalizedArticle> {
    let raw_timestamp = content.timestamp().unwrap_or_default();
    let published = parse_timestamp(raw_timestamp)?;

    Ok(NormalizedArticle {
        headline: content.headline.trim().to_string(),
        ascii_title: ascii_title(content.headline.trim(), text_only),
        description: content.description.trim().to_string(),
        published,
        paragraphs: truncate_body(&content.body),
        author: content.author.clone().unwrap_or_default(),
        creator: content.creator.clone().unwrap_or_default(),
        publisher: content.publisher.clone().unwrap_or_default(),
        language: content.in_language.clone().unwrap_or_default(),
        keywords: content.keywords_joined(),
        section: content.article_section.clone().unwrap_or_default(),
        webpage: content.url.clone().filter(|u| !u.trim().is_empty()),
        thumbnail: content.thumbnail_url.clone().filter(|u| !u.trim().is_empty()),
    })
}

/// Parses a whole-second or sub-second UTC ISO-8601 timestamp.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| BroadsheetError::DateParse { value: raw.to_string() })
}

/// Reduces a headline to ASCII: typographic punctuation is transliterated,
/// anything else outside ASCII is dropped.
pub fn ascii_title(headline: &str, text_only: bool) -> String {
    let mut title = String::with_capacity(headline.len());
    for ch in headline.chars() {
        match ch {
            c if c.is_ascii() => title.push(c),
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => title.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => title.push('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => title.push('-'),
            '\u{2026}' => title.push_str("..."),
            '\u{00A0}' | '\u{2009}' | '\u{202F}' => title.push(' '),
            _ => {}
        }
    }
    if text_only {
        title.push_str(TEXT_ONLY_MARKER);
    }
    title
}

/// Rewrites encodings of the end-of-article glyph that survive some fetch
/// paths (HTML entities, UTF-8 bytes read as Latin-1) to the glyph itself.
pub fn normalize_sentinel(text: &str) -> Cow<'_, str> {
    // the last two are its UTF-8 bytes read as ISO-8859-1 and as windows-1252
    const VARIANTS: [&str; 5] = ["&#9632;", "&#x25A0;", "&#x25a0;", "\u{e2}\u{96}\u{a0}", "\u{e2}\u{2013}\u{a0}"];
    if !VARIANTS.iter().any(|v| text.contains(v)) {
        return Cow::Borrowed(text);
    }
    let mut out = text.to_string();
    for variant in VARIANTS {
        out = out.replace(variant, "■");
    }
    Cow::Owned(out)
}

/// Keeps paragraphs up to the end-of-article glyph.
///
/// The first paragraph containing the glyph is cut there and closes the
/// article; empty paragraphs before it are kept.
pub fn truncate_body(paragraphs: &[String]) -> Vec<String> {
    let mut kept = Vec::with_capacity(paragraphs.len());
    for paragraph in paragraphs {
        let paragraph = normalize_sentinel(paragraph);
        if let Some((last, _)) = paragraph.split_once(END_OF_ARTICLE) {
            let last = last.trim_end();
            if !last.is_empty() {
                kept.push(last.to_string());
            }
            return kept;
        }
        kept.push(paragraph.into_owned());
    }
    kept
}

/// `base_dir` joined with the route's category path and file name.
pub fn output_path(base_dir: &Path, route: &ArticleRoute) -> PathBuf {
    base_dir.join(route.relative_path())
}

/// Creates the parent directory of `path`; an existing directory is fine.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
