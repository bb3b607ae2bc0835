//! Turns news article pages into paginated, decorated PDF documents.
//!
//! A URL goes through [`matcher`] (is it an article, where does it go),
//! [`fetch`], [`extract`] (JSON-LD block, subheadline, audio clip),
//! [`normalize`], [`compose`] and finally [`render`]. [`Converter`] runs the
//! whole chain for one URL and reports an [`Outcome`].
//!
//! # Example
//!
//! ```rust
//! use broadsheet_core::ArticleMatcher;
//!
//! let matcher = ArticleMatcher::new("www.economist.com");
//! let route = matcher.route("https://www.economist.com/business/2024/05/01/example-slug?utm=1").unwrap();
//! assert_eq!(route.display_path(), "business/example-slug_2024-05-01.pdf");
//! assert!(!matcher.is_article("https://www.economist.com/business"));
//! ```

pub mod article;
pub mod compose;
pub mod config;
pub mod error;
pub mod extract;
#[cfg(feature = "fetch")]
pub mod fetch;
pub mod matcher;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod render;

pub use article::{ArticleContent, AudioClip};
pub use compose::compose;
pub use config::{Config, ConfigBuilder, FetchConfig, Publication, Verbosity};
pub use error::{BroadsheetError, Result, Stage};
pub use extract::{ExtractedPage, extract_page, extract_subheadline};
#[cfg(feature = "fetch")]
pub use fetch::{HttpClient, read_stdin};
pub use matcher::{ArticleMatcher, ArticleRoute};
pub use normalize::{NormalizedArticle, normalize, parse_timestamp, truncate_body};
pub use parse::Document;
pub use pipeline::{Converter, Outcome, PRODUCER, url_lines};
pub use render::{
    DocumentInfo, FontSet, ImageStore, LoadedImage, MastheadHeader, PageCountFooter, PageFooter, PageHeader, RenderJob,
    Renderer,
};
