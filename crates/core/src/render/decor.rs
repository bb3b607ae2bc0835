//! Page decorations drawn around the flowed body.
//!
//! The renderer asks a [`PageHeader`] and a [`PageFooter`] for their height
//! before layout, then calls them once per finished page, when the total page
//! count is known. Both draw through a [`PageCanvas`].

use super::fonts::{Face, FontSet};
use super::images::ImageStore;
use super::layout::{DrawOp, Page, Rect};
use super::markup::{Rgb, TextStyle};
use super::{MARGIN, PAGE_HEIGHT, PAGE_WIDTH};
use crate::article::AudioClip;
use crate::config::Publication;

/// Key of the publication logo in the asset store.
pub const LOGO_KEY: &str = "asset:logo";
/// Key of the footer audio icon in the asset store.
pub const AUDIO_ICON_KEY: &str = "asset:audio";

const BRAND_RED: Rgb = Rgb(0xE3, 0x12, 0x0B);
const BANNER_GRAY: Rgb = Rgb(0x59, 0x59, 0x59);
const RULE_GRAY: Rgb = Rgb(0xB3, 0xB3, 0xB3);
const LINK_BLUE: Rgb = Rgb(0, 0, 0xFF);

const LOGO_WIDTH: f32 = 90.0;
const LOGO_MAX_HEIGHT: f32 = 28.0;
const BANNER_SIZE: f32 = 9.0;
const ICON_SIZE: f32 = 16.0;

/// Position of a page in the document, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub number: usize,
    pub total: usize,
}

/// Drawing surface handed to decorations.
pub struct PageCanvas<'a> {
    fonts: &'a FontSet,
    images: &'a ImageStore,
    page: &'a mut Page,
}

impl<'a> PageCanvas<'a> {
    pub fn new(fonts: &'a FontSet, images: &'a ImageStore, page: &'a mut Page) -> Self {
        Self { fonts, images, page }
    }

    pub fn measure(&self, text: &str, style: &TextStyle) -> f32 {
        self.fonts.measure(style.face, style.size, text)
    }

    /// Draws `text` starting at `x`; returns its box.
    pub fn text(&mut self, x: f32, baseline: f32, text: &str, style: TextStyle) -> Rect {
        let width = self.measure(text, &style);
        if style.underline {
            let y = baseline + style.size * 0.15;
            self.rule((x, y), (x + width, y), (style.size * 0.06).max(0.5), style.color);
        }
        self.page.ops.push(DrawOp::Text { x, baseline, width, text: text.to_string(), style });
        Rect { x, y: baseline - style.size * 0.9, width, height: style.size * 1.2 }
    }

    /// Draws `text` ending at `right`; returns its box.
    pub fn text_right(&mut self, right: f32, baseline: f32, text: &str, style: TextStyle) -> Rect {
        let width = self.measure(text, &style);
        self.text(right - width, baseline, text, style)
    }

    pub fn has_image(&self, key: &str) -> bool {
        self.images.contains(key)
    }

    /// Draws a stored image `width` points wide, capped at `max_height`.
    /// Returns `None` when the store has no such image.
    pub fn image(&mut self, key: &str, x: f32, y: f32, width: f32, max_height: f32) -> Option<Rect> {
        let image = self.images.get(key)?;
        let mut rect = Rect { x, y, width, height: width * image.aspect() };
        if rect.height > max_height {
            rect.width *= max_height / rect.height;
            rect.height = max_height;
        }
        self.page.ops.push(DrawOp::Image { key: key.to_string(), rect });
        Some(rect)
    }

    pub fn link(&mut self, rect: Rect, uri: &str, alt: Option<&str>) {
        self.page.ops.push(DrawOp::Link { rect, uri: uri.to_string(), alt: alt.map(String::from) });
    }

    pub fn rule(&mut self, from: (f32, f32), to: (f32, f32), thickness: f32, color: Rgb) {
        self.page.ops.push(DrawOp::Rule { from, to, thickness, color });
    }
}

/// Drawn at the top of every page.
pub trait PageHeader {
    /// Vertical space reserved below the top margin.
    fn height(&self) -> f32;
    fn draw(&self, canvas: &mut PageCanvas<'_>, page: PageInfo);
}

/// Drawn at the bottom of every page.
pub trait PageFooter {
    /// Vertical space reserved above the bottom margin.
    fn height(&self) -> f32;
    fn draw(&self, canvas: &mut PageCanvas<'_>, page: PageInfo);
}

/// Draws nothing and reserves no space.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blank;

impl PageHeader for Blank {
    fn height(&self) -> f32 {
        0.0
    }

    fn draw(&self, _canvas: &mut PageCanvas<'_>, _page: PageInfo) {}
}

impl PageFooter for Blank {
    fn height(&self) -> f32 {
        0.0
    }

    fn draw(&self, _canvas: &mut PageCanvas<'_>, _page: PageInfo) {}
}

/// Publication logo linked to the home page, and a `section | subheadline`
/// banner linked to the article.
#[derive(Debug, Clone)]
pub struct MastheadHeader {
    pub publication: Publication,
    pub section: String,
    pub subheadline: Option<String>,
    pub article_url: Option<String>,
}

impl MastheadHeader {
    /// Banner text; empty parts are left out.
    pub fn banner(&self) -> String {
        [Some(self.section.trim()), self.subheadline.as_deref().map(str::trim)]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl PageHeader for MastheadHeader {
    fn height(&self) -> f32 {
        42.0
    }

    fn draw(&self, canvas: &mut PageCanvas<'_>, _page: PageInfo) {
        let top = MARGIN;
        let baseline = top + 18.0;
        let home = self.publication.home.as_str();
        let name = self.publication.name.as_str();

        let logo = match canvas.image(LOGO_KEY, MARGIN, top, LOGO_WIDTH, LOGO_MAX_HEIGHT) {
            Some(rect) => rect,
            None => {
                let style = TextStyle { size: 14.0, color: BRAND_RED, ..TextStyle::default() };
                canvas.text(MARGIN, baseline, name, style)
            }
        };
        canvas.link(logo, home, Some(name));

        let banner = self.banner();
        if !banner.is_empty() {
            let style = TextStyle { size: BANNER_SIZE, color: BANNER_GRAY, ..TextStyle::default() };
            let rect = canvas.text_right(PAGE_WIDTH - MARGIN, baseline, &banner, style);
            if let Some(url) = &self.article_url {
                canvas.link(rect, url, Some(&banner));
            }
        }

        let rule_y = top + 32.0;
        canvas.rule((MARGIN, rule_y), (PAGE_WIDTH - MARGIN, rule_y), 0.5, RULE_GRAY);
    }
}

/// `n/N` page counter, and a link to the audio edition when there is one.
#[derive(Debug, Clone, Default)]
pub struct PageCountFooter {
    pub audio: Option<AudioClip>,
}

impl PageFooter for PageCountFooter {
    fn height(&self) -> f32 {
        24.0
    }

    fn draw(&self, canvas: &mut PageCanvas<'_>, page: PageInfo) {
        let baseline = PAGE_HEIGHT - MARGIN - 4.0;
        let counter = format!("{}/{}", page.number, page.total);
        let style = TextStyle { size: BANNER_SIZE, color: BANNER_GRAY, ..TextStyle::default() };
        canvas.text_right(PAGE_WIDTH - MARGIN, baseline, &counter, style);

        let Some(audio) = &self.audio else {
            return;
        };
        let icon_top = PAGE_HEIGHT - MARGIN - ICON_SIZE;
        let rect = match canvas.image(AUDIO_ICON_KEY, MARGIN, icon_top, ICON_SIZE, ICON_SIZE) {
            Some(rect) => rect,
            None => {
                let style = TextStyle { size: BANNER_SIZE, color: LINK_BLUE, underline: true, face: Face::Regular };
                canvas.text(MARGIN, baseline, "Listen", style)
            }
        };
        canvas.link(rect, &audio.src, Some(&audio.title));
    }
}
