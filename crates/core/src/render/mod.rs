//! PDF rendering of composed article markup.
//!
//! A [`Renderer`] owns what stays the same for a whole batch (fonts, asset
//! images, the publication) and turns one [`RenderJob`] at a time into a PDF
//! file:
//!
//! 1. the markup is parsed into blocks ([`markup`]),
//! 2. blocks are flowed into A4 pages between header and footer ([`layout`]),
//! 3. the header and footer draw on every page, knowing the page count ([`decor`]),
//! 4. pages, fonts, images and metadata are written with `lopdf` ([`writer`]).
//!
//! Decorations are injected: [`Renderer::render`] uses [`MastheadHeader`] and
//! [`PageCountFooter`], [`Renderer::render_with`] takes any [`PageHeader`] and
//! [`PageFooter`].

pub mod decor;
pub mod fonts;
pub mod images;
pub mod layout;
pub mod markup;
pub mod writer;

use std::fs;
use std::path::{Path, PathBuf};

pub use decor::{AUDIO_ICON_KEY, Blank, LOGO_KEY, MastheadHeader, PageCanvas, PageCountFooter, PageFooter, PageHeader, PageInfo};
pub use fonts::{Face, FontSet};
pub use images::{ImageStore, LoadedImage};
pub use layout::{DrawOp, Page};
pub use writer::DocumentInfo;

use crate::article::AudioClip;
use crate::config::{Config, Publication};
use crate::normalize::ensure_parent_dir;
use crate::Result;
use layout::{Frame, Layout};

/// A4 portrait width in points.
pub const PAGE_WIDTH: f32 = 595.28;
/// A4 portrait height in points.
pub const PAGE_HEIGHT: f32 = 841.89;
/// Page margin in points (1 cm).
pub const MARGIN: f32 = 28.35;
/// Width available to body content.
pub const USABLE_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const LOGO_FILE: &str = "logo.png";
const AUDIO_ICON_FILE: &str = "audio.png";

/// What the header banner says and links to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Masthead {
    pub section: String,
    pub subheadline: Option<String>,
    /// Canonical article URL the banner links to.
    pub article_url: Option<String>,
}

/// One document to render. Built per URL and consumed by the renderer.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub output: PathBuf,
    /// Composed markup.
    pub html: String,
    pub info: DocumentInfo,
    /// Leaves the job's own images out. Logo and audio icon are still drawn.
    pub text_only: bool,
    pub masthead: Masthead,
    pub audio: Option<AudioClip>,
    /// Images the markup refers to, keyed by `src`.
    pub images: ImageStore,
}

/// Renders jobs with one font set and asset collection.
#[derive(Debug, Clone)]
pub struct Renderer {
    fonts: FontSet,
    assets: ImageStore,
    publication: Publication,
}

impl Renderer {
    pub fn new(fonts: FontSet, assets: ImageStore, publication: Publication) -> Self {
        Self { fonts, assets, publication }
    }

    /// Loads fonts from `config.font_dir` (standard fonts when unset) and the
    /// logo and audio icon from `config.asset_dir`, when present.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fonts = match &config.font_dir {
            Some(dir) => FontSet::load(dir)?,
            None => FontSet::standard(),
        };

        let mut assets = ImageStore::new();
        if let Some(dir) = &config.asset_dir {
            load_asset(&mut assets, LOGO_KEY, &dir.join(LOGO_FILE))?;
            load_asset(&mut assets, AUDIO_ICON_KEY, &dir.join(AUDIO_ICON_FILE))?;
        }
        tracing::debug!(assets = assets.len(), custom_fonts = config.font_dir.is_some(), "renderer ready");

        Ok(Self::new(fonts, assets, config.publication.clone()))
    }

    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    /// Renders with the default masthead and page-count footer.
    pub fn render(&self, job: &RenderJob) -> Result<PathBuf> {
        let (header, footer) = self.decorations(job);
        self.render_with(job, &header, &footer)
    }

    /// Renders with the given decorations, overwriting any existing file.
    pub fn render_with(&self, job: &RenderJob, header: &dyn PageHeader, footer: &dyn PageFooter) -> Result<PathBuf> {
        let bytes = self.render_to_bytes(job, header, footer)?;
        ensure_parent_dir(&job.output)?;
        fs::write(&job.output, bytes)?;
        tracing::info!(path = %job.output.display(), "wrote PDF");
        Ok(job.output.clone())
    }

    pub fn render_to_bytes(&self, job: &RenderJob, header: &dyn PageHeader, footer: &dyn PageFooter) -> Result<Vec<u8>> {
        let images = self.images(job);
        let pages = self.paginate(job, &images, header, footer);
        tracing::debug!(pages = pages.len(), "laid out document");

        let mut doc = writer::build_document(&pages, &self.fonts, &images, &job.info)?;
        writer::to_bytes(&mut doc)
    }

    /// Laid-out pages including decorations, without writing anything.
    pub fn layout(&self, job: &RenderJob, header: &dyn PageHeader, footer: &dyn PageFooter) -> Vec<Page> {
        let images = self.images(job);
        self.paginate(job, &images, header, footer)
    }

    /// The default header and footer for `job`.
    pub fn decorations(&self, job: &RenderJob) -> (MastheadHeader, PageCountFooter) {
        let header = MastheadHeader {
            publication: self.publication.clone(),
            section: job.masthead.section.clone(),
            subheadline: job.masthead.subheadline.clone(),
            article_url: job.masthead.article_url.clone(),
        };
        let footer = PageCountFooter { audio: job.audio.clone() };
        (header, footer)
    }

    fn images(&self, job: &RenderJob) -> ImageStore {
        if job.text_only { self.assets.clone() } else { self.assets.merged(&job.images) }
    }

    fn paginate(&self, job: &RenderJob, images: &ImageStore, header: &dyn PageHeader, footer: &dyn PageFooter) -> Vec<Page> {
        let frame = Frame {
            left: MARGIN,
            top: MARGIN + header.height(),
            width: USABLE_WIDTH,
            bottom: PAGE_HEIGHT - MARGIN - footer.height(),
        };
        let blocks = markup::parse_markup(&job.html);
        let mut pages = Layout::new(&self.fonts, images, frame).run(&blocks);

        let total = pages.len();
        for (index, page) in pages.iter_mut().enumerate() {
            let info = PageInfo { number: index + 1, total };
            let mut canvas = PageCanvas::new(&self.fonts, images, page);
            header.draw(&mut canvas, info);
            footer.draw(&mut canvas, info);
        }
        pages
    }
}

fn load_asset(store: &mut ImageStore, key: &str, path: &Path) -> Result<()> {
    if !path.is_file() {
        tracing::debug!("no asset at {}", path.display());
        return Ok(());
    }
    store.insert(key, LoadedImage::open(path)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::parse_timestamp;
    use super::images::png_bytes;

    fn job(output: PathBuf, html: &str) -> RenderJob {
        RenderJob {
            output,
            html: html.to_string(),
            info: DocumentInfo {
                title: "Title".to_string(),
                author: "A".to_string(),
                creator: "C".to_string(),
                producer: "broadsheet test".to_string(),
                created: parse_timestamp("2024-05-01T10:00:00Z").unwrap(),
                language: "en".to_string(),
                keywords: "k1, k2".to_string(),
                subject: "Business".to_string(),
            },
            text_only: false,
            masthead: Masthead {
                section: "Business".to_string(),
                subheadline: Some("Sub".to_string()),
                article_url: Some("https://www.economist.com/business/2024/05/01/example-slug".to_string()),
            },
            audio: None,
            images: ImageStore::new(),
        }
    }

    fn renderer() -> Renderer {
        Renderer::new(FontSet::standard(), ImageStore::new(), Publication::economist())
    }

    #[test]
    fn test_usable_width() {
        assert!((USABLE_WIDTH - 538.58).abs() < 0.01);
    }

    #[test]
    fn test_every_page_is_decorated() {
        let tmp = tempfile::TempDir::new().unwrap();
        let html = "<p>paragraph</p>".repeat(120);
        let job = job(tmp.path().join("a.pdf"), &html);
        let (header, footer) = renderer().decorations(&job);

        let pages = renderer().layout(&job, &header, &footer);
        assert!(pages.len() > 1);
        let total = pages.len();
        for (i, page) in pages.iter().enumerate() {
            let text = page.text();
            assert!(text.contains("Business | Sub"), "page {i}: {text}");
            assert!(text.contains(&format!("{}/{}", i + 1, total)), "page {i}: {text}");
        }
    }

    #[test]
    fn test_blank_decorations() {
        let tmp = tempfile::TempDir::new().unwrap();
        let job = job(tmp.path().join("a.pdf"), "<p>only body</p>");
        let pages = renderer().layout(&job, &Blank, &Blank);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].text(), "only body");
    }

    #[test]
    fn test_render_creates_dirs_and_overwrites() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("business").join("example-slug_2024-05-01.pdf");
        let job = job(output.clone(), "<h1>Title</h1><p>body</p>");

        assert_eq!(renderer().render(&job).unwrap(), output);
        let first = fs::metadata(&output).unwrap().len();
        assert!(first > 0);

        renderer().render(&job).unwrap();
        assert!(output.is_file());
    }

    #[test]
    fn test_job_images_are_embedded() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut job = job(tmp.path().join("a.pdf"), r#"<img src="https://cdn.example.com/t.png" width=538>"#);
        job.images.insert(
            "https://cdn.example.com/t.png",
            LoadedImage::decode("t.png", &png_bytes(8, 4, [200, 10, 10, 255])).unwrap(),
        );

        let (header, footer) = renderer().decorations(&job);
        let pages = renderer().layout(&job, &header, &footer);
        assert_eq!(pages[0].image_count(), 1);

        let bytes = renderer().render_to_bytes(&job, &header, &footer).unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_text_only_keeps_decoration_assets() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut assets = ImageStore::new();
        assets.insert(LOGO_KEY, LoadedImage::decode("logo", &png_bytes(90, 30, [227, 18, 11, 255])).unwrap());
        assets.insert(AUDIO_ICON_KEY, LoadedImage::decode("audio", &png_bytes(16, 16, [0, 0, 0, 255])).unwrap());
        let renderer = Renderer::new(FontSet::standard(), assets, Publication::economist());

        let mut job = job(tmp.path().join("a.pdf"), r#"<img src="https://cdn.example.com/t.png" width=538><p>body</p>"#);
        job.audio = Some(AudioClip { src: "https://cdn.example.com/a.mp3".to_string(), title: "Listen".to_string() });
        job.images.insert(
            "https://cdn.example.com/t.png",
            LoadedImage::decode("t.png", &png_bytes(8, 4, [200, 10, 10, 255])).unwrap(),
        );

        let (header, footer) = renderer.decorations(&job);
        assert_eq!(renderer.layout(&job, &header, &footer)[0].image_count(), 3);

        job.text_only = true;
        let page = &renderer.layout(&job, &header, &footer)[0];
        // logo and audio icon, no thumbnail
        assert_eq!(page.image_count(), 2);
        assert!(!page.text().contains("The Economist"));
        assert!(!page.text().contains("Listen"));
    }

    #[test]
    fn test_from_config_loads_assets() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join(LOGO_FILE), png_bytes(90, 30, [227, 18, 11, 255])).unwrap();

        let config = Config::builder().asset_dir(Some(tmp.path().to_path_buf())).build();
        let renderer = Renderer::from_config(&config).unwrap();
        assert!(renderer.assets.contains(LOGO_KEY));
        assert!(!renderer.assets.contains(AUDIO_ICON_KEY));
    }

    #[test]
    fn test_from_config_rejects_broken_asset() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join(AUDIO_ICON_FILE), b"not an image").unwrap();

        let config = Config::builder().asset_dir(Some(tmp.path().to_path_buf())).build();
        assert!(Renderer::from_config(&config).is_err());
    }
}
