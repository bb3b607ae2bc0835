//! Structured article data as published in the page's JSON-LD block.
//!
//! [`ArticleContent`] is deserialized directly from the embedded JSON object.
//! Publishers are loose about shapes (a person may be a string, an object or a
//! list; keywords may be a comma string or a list), so the helpers below accept
//! every shape seen in the wild and reduce them to plain strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// The content block of one article page.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleContent {
    pub headline: String,

    #[serde(default)]
    pub description: String,

    /// Paragraphs of `articleBody`, split on newlines, in order.
    #[serde(rename = "articleBody", deserialize_with = "paragraphs")]
    pub body: Vec<String>,

    #[serde(default, deserialize_with = "entity_name")]
    pub author: Option<String>,

    #[serde(default, deserialize_with = "entity_name")]
    pub creator: Option<String>,

    #[serde(default, deserialize_with = "entity_name")]
    pub publisher: Option<String>,

    #[serde(default)]
    pub date_published: Option<String>,

    #[serde(default)]
    pub date_created: Option<String>,

    #[serde(default, deserialize_with = "language_tag")]
    pub in_language: Option<String>,

    #[serde(default, deserialize_with = "keyword_list")]
    pub keywords: Vec<String>,

    #[serde(default, deserialize_with = "first_string")]
    pub article_section: Option<String>,

    /// Canonical webpage URL.
    #[serde(default, deserialize_with = "first_string")]
    pub url: Option<String>,

    #[serde(default, deserialize_with = "first_string")]
    pub thumbnail_url: Option<String>,
}

impl ArticleContent {
    /// Publish timestamp, falling back to the creation timestamp.
    pub fn timestamp(&self) -> Option<&str> {
        self.date_published.as_deref().or(self.date_created.as_deref())
    }

    /// Keywords joined the way PDF metadata stores them.
    pub fn keywords_joined(&self) -> String {
        self.keywords.join(", ")
    }
}

/// An audio rendition of the article, linked from the page footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub src: String,
    /// Alt text of the footer icon.
    pub title: String,
}

fn paragraphs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let body = String::deserialize(deserializer)?;
    Ok(body.split('\n').map(|line| line.trim_end_matches('\r').to_string()).collect())
}

fn entity_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(name_of(&value))
}

/// Extracts a display name from a JSON-LD person/organization value.
/// Handles string, object and array formats.
fn name_of(value: &Value) -> Option<String> {
    match value {
        Value::String(name) => Some(name.trim().to_string()).filter(|n| !n.is_empty()),
        Value::Object(obj) => obj.get("name").and_then(name_of),
        Value::Array(items) => items.iter().find_map(name_of),
        _ => None,
    }
}

fn keyword_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let keywords = match value {
        Value::String(list) => list.split(',').map(str::trim).filter(|k| !k.is_empty()).map(String::from).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    };
    Ok(keywords)
}

fn first_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Array(items) => items.into_iter().find_map(|item| match item {
            Value::String(s) => Some(s),
            Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(String::from),
            _ => None,
        }),
        Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(String::from),
        _ => None,
    })
}

fn language_tag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(tag) => Some(tag),
        Value::Object(obj) => obj
            .get("alternateName")
            .or_else(|| obj.get("name"))
            .and_then(Value::as_str)
            .map(String::from),
        _ => None,
    })
}
