//! URL to PDF conversion.
//!
//! [`Converter`] runs the stages in order for one URL at a time: match,
//! fetch, extract, normalize, compose, render. Every failure stays local to
//! its URL and comes back as [`Outcome::Failed`]; a URL that is not an article
//! is [`Outcome::NotAnArticle`] and costs no request.

use std::path::PathBuf;

use url::Url;

use crate::article::AudioClip;
use crate::compose::compose;
use crate::config::Config;
use crate::extract::{ExtractedPage, extract_page};
#[cfg(feature = "fetch")]
use crate::fetch::HttpClient;
use crate::matcher::{ArticleMatcher, ArticleRoute};
use crate::normalize::{NormalizedArticle, normalize, output_path};
use crate::render::{DocumentInfo, ImageStore, Masthead, RenderJob, Renderer};
#[cfg(feature = "fetch")]
use crate::render::LoadedImage;
use crate::{BroadsheetError, Result};

/// Producer entry of the document metadata.
pub const PRODUCER: &str = concat!("broadsheet ", env!("CARGO_PKG_VERSION"));

/// Result of handling one input line.
#[derive(Debug)]
pub enum Outcome {
    /// A PDF was written.
    Converted {
        path: PathBuf,
        /// Relative output path behind the configured URL prefix.
        display: String,
    },
    /// The line is not an article URL. Nothing was fetched or written.
    NotAnArticle,
    /// Processing stopped at some stage; other URLs are unaffected.
    Failed { error: BroadsheetError },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    fn from_result(result: Result<(PathBuf, String)>) -> Self {
        match result {
            Ok((path, display)) => Outcome::Converted { path, display },
            Err(error) => Outcome::Failed { error },
        }
    }
}

/// Non-empty, trimmed lines of a URL list.
pub fn url_lines(input: &str) -> impl Iterator<Item = &str> {
    input.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Converts article URLs into PDF files under the configured directory.
pub struct Converter {
    config: Config,
    matcher: ArticleMatcher,
    renderer: Renderer,
    #[cfg(feature = "fetch")]
    client: HttpClient,
}

impl Converter {
    /// Builds the HTTP client and loads fonts and assets once for the batch.
    pub fn new(config: Config) -> Result<Self> {
        let renderer = Renderer::from_config(&config)?;
        Ok(Self {
            matcher: ArticleMatcher::new(&config.publication.host),
            #[cfg(feature = "fetch")]
            client: HttpClient::new(&config.fetch)?,
            renderer,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn matcher(&self) -> &ArticleMatcher {
        &self.matcher
    }

    /// Fetches and converts one URL.
    #[cfg(feature = "fetch")]
    pub async fn convert(&self, url: &str) -> Outcome {
        let url = url.trim();
        let Some(route) = self.matcher.route(url) else {
            tracing::debug!(url, "not an article URL");
            return Outcome::NotAnArticle;
        };
        tracing::info!(url, "converting");

        let outcome = Outcome::from_result(self.fetch_and_render(&route, url).await);
        if let Outcome::Failed { error } = &outcome {
            tracing::debug!(url, stage = %error.stage(), "{error}");
        }
        outcome
    }

    #[cfg(feature = "fetch")]
    async fn fetch_and_render(&self, route: &ArticleRoute, url: &str) -> Result<(PathBuf, String)> {
        let raw = self.client.fetch_page(url).await?;
        let (mut job, thumbnail) = self.prepare(route, url, &raw)?;

        if let Some(thumbnail) = thumbnail {
            let bytes = self.client.fetch_bytes(&thumbnail).await?;
            job.images.insert(thumbnail.clone(), LoadedImage::decode(&thumbnail, &bytes)?);
        }

        let path = self.renderer.render(&job)?;
        Ok((path, self.display_path(route)))
    }

    /// Converts an already fetched page. The thumbnail, unless in text-only
    /// mode, must be present in `images` under its URL.
    pub fn convert_page(&self, url: &str, raw: &str, images: &ImageStore) -> Outcome {
        let url = url.trim();
        let Some(route) = self.matcher.route(url) else {
            return Outcome::NotAnArticle;
        };

        Outcome::from_result(self.prepare(&route, url, raw).and_then(|(mut job, thumbnail)| {
            if let Some(thumbnail) = thumbnail {
                if !images.contains(&thumbnail) {
                    return Err(BroadsheetError::Image {
                        source_ref: thumbnail,
                        reason: "thumbnail was not provided".to_string(),
                    });
                }
                job.images = job.images.merged(images);
            }
            let path = self.renderer.render(&job)?;
            Ok((path, self.display_path(&route)))
        }))
    }

    /// Builds the render job for a fetched page. Also returns the thumbnail
    /// URL the job still needs, if any.
    fn prepare(&self, route: &ArticleRoute, url: &str, raw: &str) -> Result<(RenderJob, Option<String>)> {
        let page = extract_page(raw)?;
        let article = normalize(&page.content, self.config.text_only)?;
        let html = compose(&article, self.config.text_only);

        let thumbnail = if self.config.text_only { None } else { article.thumbnail.clone() };
        let job = RenderJob {
            output: output_path(&self.config.output_dir, route),
            html,
            info: document_info(&article),
            text_only: self.config.text_only,
            masthead: Masthead {
                section: article.section.clone(),
                subheadline: page.subheadline.clone(),
                article_url: Some(article.webpage.clone().unwrap_or_else(|| url.to_string())),
            },
            audio: resolve_audio(&page, url),
            images: ImageStore::new(),
        };
        Ok((job, thumbnail))
    }

    fn display_path(&self, route: &ArticleRoute) -> String {
        format!("{}{}", self.config.url_prefix, route.display_path())
    }
}

fn document_info(article: &NormalizedArticle) -> DocumentInfo {
    DocumentInfo {
        title: article.ascii_title.clone(),
        author: article.author.clone(),
        creator: article.creator.clone(),
        producer: PRODUCER.to_string(),
        created: article.published,
        language: article.language.clone(),
        keywords: article.keywords.clone(),
        subject: article.section.clone(),
    }
}

/// The page's audio clip with its source made absolute against the page URL.
fn resolve_audio(page: &ExtractedPage, page_url: &str) -> Option<AudioClip> {
    let clip = page.audio.as_ref()?;
    let src = match Url::parse(&clip.src) {
        Ok(absolute) => absolute.to_string(),
        Err(_) => match Url::parse(page_url).and_then(|base| base.join(&clip.src)) {
            Ok(joined) => joined.to_string(),
            Err(e) => {
                tracing::debug!(src = %clip.src, "dropping unresolvable audio source: {e}");
                return None;
            }
        },
    };
    Some(AudioClip { src, title: clip.title.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::ArticleContent;

    #[test]
    fn test_url_lines() {
        let lines: Vec<_> = url_lines("  https://a.test/x  \n\n\t\nhttps://b.test/y\r\n").collect();
        assert_eq!(lines, vec!["https://a.test/x", "https://b.test/y"]);
    }

    #[test]
    fn test_outcome_kinds_are_distinct() {
        assert!(!Outcome::NotAnArticle.is_failure());
        let failed = Outcome::Failed { error: BroadsheetError::Extraction("x".to_string()) };
        assert!(failed.is_failure());
    }

    #[test]
    fn test_producer_names_the_tool() {
        assert!(PRODUCER.starts_with("broadsheet "));
    }

    #[test]
    fn test_resolve_relative_audio() {
        let page = ExtractedPage {
            content: ArticleContent::default(),
            subheadline: None,
            audio: Some(AudioClip { src: "/media/clip.mp3".to_string(), title: "Listen".to_string() }),
        };
        let clip = resolve_audio(&page, "https://www.economist.com/business/2024/05/01/example-slug").unwrap();
        assert_eq!(clip.src, "https://www.economist.com/media/clip.mp3");
    }

    #[test]
    fn test_not_an_article_skips_everything() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::builder().output_dir(tmp.path()).asset_dir(None).build();
        let converter = Converter::new(config).unwrap();

        let outcome = converter.convert_page("https://example.com/not/an/article", "<html></html>", &ImageStore::new());
        assert!(matches!(outcome, Outcome::NotAnArticle));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_extraction_failure_is_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::builder().output_dir(tmp.path()).asset_dir(None).build();
        let converter = Converter::new(config).unwrap();

        let outcome = converter.convert_page(
            "https://www.economist.com/business/2024/05/01/example-slug",
            "<html><body>no data</body></html>",
            &ImageStore::new(),
        );
        match outcome {
            Outcome::Failed { error } => assert_eq!(error.stage(), crate::Stage::Extract),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
