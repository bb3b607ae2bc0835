//! HTML parsing and DOM queries.
//!
//! This module provides the [`Document`] and [`Element`] types used by the
//! extractor to find structural anchors (JSON-LD scripts, audio players) in
//! a fetched article page.
//!
//! # Example
//!
//! ```rust
//! use broadsheet_core::parse::Document;
//!
//! let html = r#"<html><body><audio src="/a.mp3" title="Listen"></audio></body></html>"#;
//! let doc = Document::parse(html);
//! let players = doc.select("audio[src]").unwrap();
//! assert_eq!(players[0].attr("title"), Some("Listen"));
//! ```

use scraper::{Html, Selector};

use crate::{BroadsheetError, Result};

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a full HTML document.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Parses an HTML fragment, such as a snippet captured from raw markup.
    pub fn parse_fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html) }
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`BroadsheetError::Extraction`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = Selector::parse(selector)
            .map_err(|e| BroadsheetError::Extraction(format!("Invalid selector {selector:?}: {e}")))?;

        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Gets all text content from the document, entities decoded.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }
}

/// A wrapper around scraper's ElementRef.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the text content of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Selects descendant elements using a CSS selector.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = Selector::parse(selector)
            .map_err(|e| BroadsheetError::Extraction(format!("Invalid selector {selector:?}: {e}")))?;

        Ok(self.element.select(&sel).map(|el| Element { element: el }).collect())
    }
}
