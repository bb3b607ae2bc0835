//! The HTML subset understood by the renderer.
//!
//! Supported tags: `h1`-`h6`, `p` (`align`, `line-height`), `div`, `font`
//! (`face`, `size`, `color`), `u`, `a` (`href`), `i`/`em`, `b`/`strong`, `br`
//! and `img` (`src`, `width`, `alt`). Unknown tags are transparent; `script`,
//! `style` and `head` are dropped with their content.
//!
//! Inline tags may wrap block tags (`<font ...><p>..</p></font>`), in which case
//! the block inherits the inline style.

use scraper::{ElementRef, Html, Node};

use super::fonts::Face;
use crate::compose::ITALIC_FACE;

/// Body text size in points.
pub const BASE_SIZE: f32 = 12.0;

const HEADING_SIZES: [f32; 6] = [24.0, 18.0, 15.0, 13.0, 12.0, 11.0];

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// Parses `#rrggbb`, `#rgb` or one of a few colour names.
    pub fn parse(value: &str) -> Option<Rgb> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            let digits: Vec<u8> = hex.chars().map(|c| c.to_digit(16).map(|d| d as u8)).collect::<Option<_>>()?;
            return match digits.as_slice() {
                [r, g, b] => Some(Rgb(r * 17, g * 17, b * 17)),
                [r1, r2, g1, g2, b1, b2] => Some(Rgb(r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2)),
                _ => None,
            };
        }
        match value.to_ascii_lowercase().as_str() {
            "black" => Some(Rgb::BLACK),
            "white" => Some(Rgb(255, 255, 255)),
            "red" => Some(Rgb(255, 0, 0)),
            "green" => Some(Rgb(0, 128, 0)),
            "blue" => Some(Rgb(0, 0, 255)),
            "gray" | "grey" => Some(Rgb(128, 128, 128)),
            _ => None,
        }
    }

    /// Components scaled to `0.0..=1.0`.
    pub fn components(self) -> [f32; 3] {
        [self.0, self.1, self.2].map(|c| f32::from(c) / 255.0)
    }
}

/// Horizontal alignment of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    /// Reads `L`/`C`/`R`/`J` or the spelled-out names.
    pub fn parse(value: &str) -> Option<Align> {
        match value.trim().to_ascii_lowercase().as_str() {
            "l" | "left" => Some(Align::Left),
            "c" | "center" | "centre" => Some(Align::Center),
            "r" | "right" => Some(Align::Right),
            "j" | "justify" => Some(Align::Justify),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub face: Face,
    pub size: f32,
    pub color: Rgb,
    pub underline: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self { face: Face::Regular, size: BASE_SIZE, color: Rgb::BLACK, underline: false }
    }
}

/// A stretch of text sharing one style and link target. `\n` is a forced break.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub style: TextStyle,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub runs: Vec<Run>,
    pub align: Align,
    /// Multiplier of the natural leading.
    pub line_height: f32,
    /// Size used for a block without runs.
    pub base_size: f32,
    pub space_after: f32,
}

impl TextBlock {
    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    pub src: String,
    /// Requested width in points.
    pub width: Option<f32>,
    pub align: Align,
    pub link: Option<String>,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text(TextBlock),
    Image(ImageBlock),
}

#[derive(Debug, Clone)]
struct Context {
    style: TextStyle,
    link: Option<String>,
    align: Align,
    line_height: f32,
}

impl Default for Context {
    fn default() -> Self {
        Self { style: TextStyle::default(), link: None, align: Align::Left, line_height: 1.0 }
    }
}

#[derive(Default)]
struct Builder {
    blocks: Vec<Block>,
    current: Option<TextBlock>,
}

impl Builder {
    fn open(&mut self, ctx: &Context, space_after: f32) {
        self.flush();
        self.current = Some(TextBlock {
            runs: Vec::new(),
            align: ctx.align,
            line_height: ctx.line_height,
            base_size: ctx.style.size,
            space_after,
        });
    }

    /// Closes the open block; explicit blocks are kept even when empty.
    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            self.blocks.push(Block::Text(block));
        }
    }

    fn push_text(&mut self, raw: &str, ctx: &Context) {
        let collapsed = collapse_whitespace(raw);
        if self.current.is_none() {
            if collapsed.trim().is_empty() {
                return;
            }
            self.open(ctx, ctx.style.size * 0.5);
        }
        let Some(block) = &mut self.current else {
            return;
        };

        let at_line_start = block.runs.last().is_none_or(|r| r.text.ends_with([' ', '\n']));
        let text = if at_line_start { collapsed.trim_start() } else { collapsed.as_str() };
        if text.is_empty() {
            return;
        }
        push_run(block, text, ctx);
    }

    fn push_break(&mut self, ctx: &Context) {
        if self.current.is_none() {
            self.open(ctx, ctx.style.size * 0.5);
        }
        if let Some(block) = &mut self.current {
            if let Some(last) = block.runs.last_mut() {
                let trimmed = last.text.trim_end_matches(' ').len();
                last.text.truncate(trimmed);
            }
            push_run(block, "\n", ctx);
        }
    }
}

fn push_run(block: &mut TextBlock, text: &str, ctx: &Context) {
    if let Some(last) = block.runs.last_mut()
        && last.style == ctx.style
        && last.link == ctx.link
    {
        last.text.push_str(text);
        return;
    }
    block.runs.push(Run { text: text.to_string(), style: ctx.style, link: ctx.link.clone() });
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Parses a markup fragment into blocks, in document order.
pub fn parse_markup(html: &str) -> Vec<Block> {
    let fragment = Html::parse_fragment(html);
    let mut builder = Builder::default();
    walk(fragment.root_element(), &Context::default(), &mut builder);
    builder.flush();
    builder.blocks
}

fn walk(element: ElementRef<'_>, ctx: &Context, builder: &mut Builder) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => builder.push_text(text, ctx),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    visit(el, ctx, builder);
                }
            }
            _ => {}
        }
    }
}

fn visit(el: ElementRef<'_>, ctx: &Context, builder: &mut Builder) {
    let name = el.value().name().to_ascii_lowercase();
    let attr = |key: &str| el.value().attr(key);

    match name.as_str() {
        "script" | "style" | "head" | "title" => {}
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = usize::from(name.as_bytes()[1] - b'1');
            let mut inner = block_context(ctx, attr("align"), attr("line-height"));
            inner.style.size = HEADING_SIZES[level];
            builder.open(&inner, inner.style.size * 0.5);
            walk(el, &inner, builder);
            builder.flush();
        }
        "p" | "div" => {
            let inner = block_context(ctx, attr("align"), attr("line-height"));
            builder.open(&inner, inner.style.size * 0.5);
            walk(el, &inner, builder);
            builder.flush();
        }
        "br" => builder.push_break(ctx),
        "img" => {
            builder.flush();
            if let Some(src) = attr("src").map(str::trim).filter(|s| !s.is_empty()) {
                builder.blocks.push(Block::Image(ImageBlock {
                    src: src.to_string(),
                    width: attr("width").and_then(parse_number),
                    align: attr("align").and_then(Align::parse).unwrap_or(ctx.align),
                    link: ctx.link.clone(),
                    alt: attr("alt").map(String::from),
                }));
            }
        }
        _ => {
            let mut inner = ctx.clone();
            match name.as_str() {
                "font" => {
                    if let Some(face) = attr("face") {
                        inner.style.face = parse_face(face);
                    }
                    if let Some(size) = attr("size").and_then(parse_number) {
                        inner.style.size = size;
                    }
                    if let Some(color) = attr("color").and_then(Rgb::parse) {
                        inner.style.color = color;
                    }
                }
                "i" | "em" => inner.style.face = Face::Italic,
                "u" => inner.style.underline = true,
                "a" => inner.link = attr("href").map(|h| h.trim().to_string()).filter(|h| !h.is_empty()),
                // no bold program is loaded; strong text keeps the current face
                _ => {}
            }
            walk(el, &inner, builder);
        }
    }
}

fn block_context(ctx: &Context, align: Option<&str>, line_height: Option<&str>) -> Context {
    let mut inner = ctx.clone();
    inner.align = align.and_then(Align::parse).unwrap_or(Align::Left);
    inner.line_height = line_height.and_then(parse_number).unwrap_or(1.0);
    inner
}

fn parse_face(face: &str) -> Face {
    let face = face.trim().to_ascii_lowercase();
    if face == ITALIC_FACE || face.ends_with("italic") || face.ends_with("inclined") || face.ends_with("oblique") {
        Face::Italic
    } else {
        Face::Regular
    }
}

fn parse_number(value: &str) -> Option<f32> {
    let value = value.trim().trim_end_matches("px").trim_end_matches("pt");
    value.parse::<f32>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_blocks(blocks: &[Block]) -> Vec<&TextBlock> {
        blocks
            .iter()
            .filter_map(|b| match b {
                Block::Text(t) => Some(t),
                Block::Image(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_font_wrapping_paragraph() {
        let blocks = parse_markup(r#"<font face="italic" size=16><p line-height=2>Desc</p></font>"#);
        let texts = text_blocks(&blocks);
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].line_height, 2.0);
        assert_eq!(texts[0].runs[0].style.face, Face::Italic);
        assert_eq!(texts[0].runs[0].style.size, 16.0);
    }

    #[test]
    fn test_heading_and_alignment() {
        let blocks = parse_markup("<h1>Title</h1><p align=R>May 01 2024, 10:00 AM</p>");
        let texts = text_blocks(&blocks);
        assert_eq!(texts[0].runs[0].style.size, 24.0);
        assert_eq!(texts[1].align, Align::Right);
        assert_eq!(texts[1].text(), "May 01 2024, 10:00 AM");
    }

    #[test]
    fn test_colored_underlined_link() {
        let blocks = parse_markup(r#"<p align=R><font color=#0000ff><u><a href="https://x.test/a">Webpage</a></u></font></p>"#);
        let run = &text_blocks(&blocks)[0].runs[0];
        assert_eq!(run.text, "Webpage");
        assert_eq!(run.style.color, Rgb(0, 0, 255));
        assert!(run.style.underline);
        assert_eq!(run.link.as_deref(), Some("https://x.test/a"));
    }

    #[test]
    fn test_image_block() {
        let blocks = parse_markup(r#"<p>a</p><img src="https://cdn.example.com/t.png" width=538><p>b</p>"#);
        assert_eq!(blocks.len(), 3);
        match &blocks[1] {
            Block::Image(img) => {
                assert_eq!(img.src, "https://cdn.example.com/t.png");
                assert_eq!(img.width, Some(538.0));
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_paragraph_is_kept() {
        let blocks = parse_markup("<p line-height=1.5>a</p><p line-height=1.5></p><p line-height=1.5>b</p>");
        let texts = text_blocks(&blocks);
        assert_eq!(texts.len(), 3);
        assert!(texts[1].is_empty());
        assert_eq!(texts[1].line_height, 1.5);
    }

    #[test]
    fn test_whitespace_and_breaks() {
        let blocks = parse_markup("<p>  one \n  two <br> three</p>\n\n");
        let texts = text_blocks(&blocks);
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].text(), "one two\nthree");
    }

    #[test]
    fn test_entities_are_decoded() {
        let blocks = parse_markup("<p>Bread &amp; &lt;butter&gt;</p>");
        assert_eq!(text_blocks(&blocks)[0].text(), "Bread & <butter>");
    }

    #[test]
    fn test_mixed_styles_split_runs() {
        let blocks = parse_markup("<p>plain <i>slanted</i> plain</p>");
        let runs = &text_blocks(&blocks)[0].runs;
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].style.face, Face::Italic);
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!(Rgb::parse("#E3120B"), Some(Rgb(0xE3, 0x12, 0x0B)));
        assert_eq!(Rgb::parse("#fff"), Some(Rgb(255, 255, 255)));
        assert_eq!(Rgb::parse("Blue"), Some(Rgb(0, 0, 255)));
        assert_eq!(Rgb::parse("#12345"), None);
        assert_eq!(Rgb::parse("mauve"), None);
    }
}
