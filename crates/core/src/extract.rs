//! Content extraction from a fetched article page.
//!
//! Three things are pulled out of the raw markup:
//!
//! 1. the JSON-LD content block describing the article ([`ArticleContent`]),
//! 2. the subheadline, which the page renders after a ` | <!-- -->` marker,
//! 3. an optional [`AudioClip`] from the page's `<audio>` player.
//!
//! The content block is located through its `<script type="application/ld+json">`
//! anchor. Pages that predate the script anchor carry the object on the second
//! line of the response instead; that layout is still understood.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::article::{ArticleContent, AudioClip};
use crate::parse::Document;
use crate::{BroadsheetError, Result};

const DEFAULT_AUDIO_TITLE: &str = "Listen to this story";

static SUBHEADLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" \| <!-- -->([^<]+)<").unwrap());

/// Everything the renderer needs from one page.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub content: ArticleContent,
    pub subheadline: Option<String>,
    pub audio: Option<AudioClip>,
}

/// Extracts the content block, subheadline and audio clip from a raw page.
///
/// # Errors
///
/// Returns [`BroadsheetError::Extraction`] when no content block (or more than
/// one) is found, or when the block lacks `headline`, `articleBody` or a
/// timestamp.
pub fn extract_page(raw: &str) -> Result<ExtractedPage> {
    let doc = Document::parse(raw);

    let content = locate_content_block(&doc, raw)?;
    let subheadline = extract_subheadline(raw);
    let audio = extract_audio(&doc)?;

    tracing::debug!(
        headline = %content.headline,
        paragraphs = content.body.len(),
        subheadline = subheadline.is_some(),
        audio = audio.is_some(),
        "extracted article page"
    );

    Ok(ExtractedPage { content, subheadline, audio })
}

/// Finds the single JSON object describing the article.
fn locate_content_block(doc: &Document, raw: &str) -> Result<ArticleContent> {
    let mut candidates = Vec::new();
    for script in doc.select(r#"script[type="application/ld+json"]"#)? {
        let text = script.text();
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => collect_articles(value, &mut candidates),
            Err(e) => tracing::debug!("skipping malformed JSON-LD script: {e}"),
        }
    }

    if candidates.is_empty()
        && let Some(line) = raw.lines().nth(1)
        && let Ok(value) = serde_json::from_str::<Value>(line.trim())
    {
        tracing::debug!("content block found on the second response line");
        collect_articles(value, &mut candidates);
    }

    let block = match candidates.len() {
        0 => return Err(BroadsheetError::Extraction("no JSON content block with an articleBody".to_string())),
        1 => candidates.remove(0),
        n => return Err(BroadsheetError::Extraction(format!("{n} JSON content blocks found, expected one"))),
    };

    let content: ArticleContent = serde_json::from_value(block)
        .map_err(|e| BroadsheetError::Extraction(format!("malformed content block: {e}")))?;

    if content.timestamp().is_none() {
        return Err(BroadsheetError::Extraction("content block has no datePublished".to_string()));
    }

    Ok(content)
}

/// Flattens arrays and `@graph` containers, keeping objects that carry an article body.
fn collect_articles(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| collect_articles(item, out)),
        Value::Object(mut obj) => {
            if let Some(graph) = obj.remove("@graph") {
                collect_articles(graph, out);
            }
            if obj.contains_key("articleBody") {
                out.push(Value::Object(obj));
            }
        }
        _ => {}
    }
}

/// Subheadline text following the ` | <!-- -->` marker, entities decoded.
pub fn extract_subheadline(raw: &str) -> Option<String> {
    let caps = SUBHEADLINE.captures(raw)?;
    let text = Document::parse_fragment(&caps[1]).text_content();
    let text = text.trim();
    if text.is_empty() { None } else { Some(text.to_string()) }
}

fn extract_audio(doc: &Document) -> Result<Option<AudioClip>> {
    for player in doc.select("audio")? {
        let src = match player.attr("src") {
            Some(src) => Some(src.to_string()),
            None => player
                .select("source[src]")?
                .first()
                .and_then(|source| source.attr("src"))
                .map(String::from),
        };

        if let Some(src) = src.filter(|s| !s.trim().is_empty()) {
            let title = player
                .attr("title")
                .or_else(|| player.attr("aria-label"))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_AUDIO_TITLE);
            return Ok(Some(AudioClip { src: src.trim().to_string(), title: title.to_string() }));
        }
    }
    Ok(None)
}
