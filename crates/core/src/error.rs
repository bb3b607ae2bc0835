//! Error types for broadsheet operations.
//!
//! This module defines the main error type [`BroadsheetError`] which represents
//! everything that can go wrong while turning one article URL into a PDF:
//! fetching the page, extracting its content block, normalizing fields and
//! rendering the document.
//!
//! Every error is local to a single URL. The batch loop records it and moves on
//! to the next line, so each variant also knows which [`Stage`] produced it.
//!
//! # Example
//!
//! ```rust
//! use broadsheet_core::{BroadsheetError, Result, Stage};
//!
//! fn parse_body(raw: &str) -> Result<&str> {
//!     if raw.is_empty() {
//!         return Err(BroadsheetError::Extraction("empty response".to_string()));
//!     }
//!     Ok(raw)
//! }
//!
//! let err = parse_body("").unwrap_err();
//! assert_eq!(err.stage(), Stage::Extract);
//! ```

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Network access for the article page or its thumbnail.
    Fetch,
    /// Locating and decoding the content block, subheadline and audio clip.
    Extract,
    /// Timestamp parsing and other field normalization.
    Normalize,
    /// Font and asset loading, layout, PDF encoding and file output.
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Normalize => "normalize",
            Stage::Render => "render",
        };
        f.write_str(label)
    }
}

/// Main error type for article conversion.
#[derive(Error, Debug)]
pub enum BroadsheetError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps network errors, DNS failures, proxy and TLS problems.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    ///
    /// Returned when an HTTP request exceeds the configured timeout duration.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// The server answered with a non-success status.
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    /// Invalid URL provided (article, thumbnail or proxy).
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The content block, or a field it must carry, could not be found or decoded.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Neither accepted timestamp format matched.
    #[error("Unrecognised timestamp {value:?}")]
    DateParse { value: String },

    /// A font program could not be read or parsed.
    #[error("Font error for {path}: {reason}")]
    Font { path: PathBuf, reason: String },

    /// An image (thumbnail, logo, icon) could not be decoded.
    #[error("Image error for {source_ref}: {reason}")]
    Image { source_ref: String, reason: String },

    /// PDF object model or content stream encoding errors.
    #[error("PDF encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),

    /// File write errors.
    ///
    /// Wraps standard I/O errors for directory creation and file output.
    #[error("Failed to write to file: {0}")]
    WriteError(#[from] std::io::Error),
}

impl BroadsheetError {
    /// The pipeline stage this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            #[cfg(feature = "fetch")]
            BroadsheetError::HttpError(_) => Stage::Fetch,
            BroadsheetError::Timeout { .. } | BroadsheetError::Status { .. } | BroadsheetError::InvalidUrl(_) => {
                Stage::Fetch
            }
            BroadsheetError::Extraction(_) => Stage::Extract,
            BroadsheetError::DateParse { .. } => Stage::Normalize,
            BroadsheetError::Font { .. }
            | BroadsheetError::Image { .. }
            | BroadsheetError::Pdf(_)
            | BroadsheetError::WriteError(_) => Stage::Render,
        }
    }
}

/// Result type alias for BroadsheetError.
pub type Result<T> = std::result::Result<T, BroadsheetError>;
