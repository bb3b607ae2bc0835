//! Line breaking and pagination.
//!
//! Blocks are flowed top to bottom into a [`Frame`]. Text is broken greedily at
//! spaces; a word wider than the frame is broken between characters. Every
//! character is measured with the glyph the font set will actually use, so
//! fallback glyphs take their own advance.
//!
//! The result is a list of [`Page`]s holding absolute [`DrawOp`]s with the
//! origin at the top-left corner of the page.

use std::mem;

use super::fonts::FontSet;
use super::images::ImageStore;
use super::markup::{Align, Block, ImageBlock, Rgb, TextBlock, TextStyle};

/// Line box height relative to the font size.
pub const LEADING: f32 = 1.2;
/// Baseline position inside a line box, relative to the font size.
const ASCENT: f32 = 0.8;
const IMAGE_GAP: f32 = 6.0;
const EPSILON: f32 = 0.01;

/// Rectangle with its origin at the top-left, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text { x: f32, baseline: f32, width: f32, text: String, style: TextStyle },
    Image { key: String, rect: Rect },
    Link { rect: Rect, uri: String, alt: Option<String> },
    Rule { from: (f32, f32), to: (f32, f32), thickness: f32, color: Rgb },
}

/// Everything drawn on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// Visible text, one line per baseline.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut last: Option<(f32, f32)> = None;

        for op in &self.ops {
            let DrawOp::Text { x, baseline, width, text, .. } = op else {
                continue;
            };
            match last {
                Some((prev_baseline, _)) if (prev_baseline - baseline).abs() > EPSILON => out.push('\n'),
                Some((_, prev_end)) if *x > prev_end + 0.5 && !out.ends_with(' ') => out.push(' '),
                _ => {}
            }
            out.push_str(text);
            last = Some((*baseline, x + width));
        }
        out
    }

    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Link { uri, .. } => Some(uri.as_str()),
            _ => None,
        })
    }

    pub fn image_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, DrawOp::Image { .. })).count()
    }
}

/// Body area of a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub bottom: f32,
}

impl Frame {
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

#[derive(Debug, Clone)]
struct Piece {
    text: String,
    style: TextStyle,
    link: Option<String>,
    width: f32,
    is_space: bool,
}

enum Token {
    Word(Vec<Piece>),
    Space(Piece),
    Break,
}

#[derive(Default)]
struct Line {
    pieces: Vec<Piece>,
    width: f32,
    spaces: usize,
    /// Last line of its paragraph or ended by `<br>`: never justified.
    ragged: bool,
}

impl Line {
    fn push(&mut self, piece: Piece) {
        self.width += piece.width;
        if piece.is_space {
            self.spaces += 1;
        }
        self.pieces.push(piece);
    }
}

/// Flows blocks into pages.
pub struct Layout<'a> {
    fonts: &'a FontSet,
    images: &'a ImageStore,
    frame: Frame,
    pages: Vec<Page>,
    y: f32,
}

impl<'a> Layout<'a> {
    pub fn new(fonts: &'a FontSet, images: &'a ImageStore, frame: Frame) -> Self {
        Self { fonts, images, frame, pages: vec![Page::default()], y: frame.top }
    }

    /// Lays out all blocks. There is always at least one page.
    pub fn run(mut self, blocks: &[Block]) -> Vec<Page> {
        for block in blocks {
            match block {
                Block::Text(text) => self.text_block(text),
                Block::Image(image) => self.image_block(image),
            }
        }
        self.pages
    }

    fn page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Starts a new page unless `height` still fits, or the page is empty.
    fn ensure_room(&mut self, height: f32) {
        if self.y + height > self.frame.bottom + EPSILON && self.y > self.frame.top + EPSILON {
            self.pages.push(Page::default());
            self.y = self.frame.top;
        }
    }

    fn text_block(&mut self, block: &TextBlock) {
        let tokens = tokenize(block, self.fonts);
        let lines = break_lines(tokens, self.frame.width, self.fonts);

        for line in lines {
            let size = line.pieces.iter().map(|p| p.style.size).fold(0.0_f32, f32::max);
            let size = if size > 0.0 { size } else { block.base_size };
            let leading = size * LEADING * block.line_height;

            self.ensure_room(leading);
            let baseline = self.y + (leading - size) / 2.0 + size * ASCENT;
            self.emit_line(line, block.align, baseline);
            self.y += leading;
        }
        self.y += block.space_after;
    }

    fn emit_line(&mut self, line: Line, align: Align, baseline: f32) {
        let free = (self.frame.width - line.width).max(0.0);
        let (offset, extra) = match align {
            Align::Left => (0.0, 0.0),
            Align::Center => (free / 2.0, 0.0),
            Align::Right => (free, 0.0),
            Align::Justify if !line.ragged && line.spaces > 0 => (0.0, free / line.spaces as f32),
            Align::Justify => (0.0, 0.0),
        };

        let mut x = self.frame.left + offset;
        let mut run: Option<(f32, Piece)> = None;
        let mut ops = Vec::new();

        for piece in line.pieces {
            if piece.is_space && extra > 0.0 {
                if let Some((start, done)) = run.take() {
                    text_ops(&mut ops, start, baseline, done);
                }
                x += piece.width + extra;
                continue;
            }
            let width = piece.width;
            let continues = matches!(&run, Some((_, current)) if current.style == piece.style && current.link == piece.link);
            if continues && let Some((_, current)) = &mut run {
                current.text.push_str(&piece.text);
                current.width += piece.width;
            } else {
                if let Some((start, done)) = run.take() {
                    text_ops(&mut ops, start, baseline, done);
                }
                run = Some((x, piece));
            }
            x += width;
        }
        if let Some((start, done)) = run.take() {
            text_ops(&mut ops, start, baseline, done);
        }
        self.page().ops.extend(ops);
    }

    fn image_block(&mut self, block: &ImageBlock) {
        let Some(image) = self.images.get(&block.src) else {
            tracing::warn!(src = %block.src, "image was not loaded, leaving it out");
            return;
        };

        let mut width = block.width.unwrap_or(image.width as f32).min(self.frame.width);
        let mut height = width * image.aspect();
        let max_height = self.frame.height();
        if height > max_height {
            width *= max_height / height;
            height = max_height;
        }

        self.ensure_room(height);
        let free = self.frame.width - width;
        let x = self.frame.left
            + match block.align {
                Align::Center => free / 2.0,
                Align::Right => free,
                Align::Left | Align::Justify => 0.0,
            };
        let rect = Rect { x, y: self.y, width, height };

        let page = self.page();
        page.ops.push(DrawOp::Image { key: block.src.clone(), rect });
        if let Some(uri) = &block.link {
            page.ops.push(DrawOp::Link { rect, uri: uri.clone(), alt: block.alt.clone() });
        }
        self.y += height + IMAGE_GAP;
    }
}

/// Text, underline and link ops for one styled stretch of a line.
fn text_ops(ops: &mut Vec<DrawOp>, x: f32, baseline: f32, piece: Piece) {
    let size = piece.style.size;
    if piece.style.underline {
        let y = baseline + size * 0.15;
        ops.push(DrawOp::Rule {
            from: (x, y),
            to: (x + piece.width, y),
            thickness: (size * 0.06).max(0.5),
            color: piece.style.color,
        });
    }
    if let Some(uri) = &piece.link {
        let rect = Rect { x, y: baseline - size * 0.9, width: piece.width, height: size * LEADING };
        ops.push(DrawOp::Link { rect, uri: uri.clone(), alt: Some(piece.text.clone()) });
    }
    ops.push(DrawOp::Text { x, baseline, width: piece.width, text: piece.text, style: piece.style });
}

fn tokenize(block: &TextBlock, fonts: &FontSet) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word: Vec<Piece> = Vec::new();

    let piece = |text: String, style: TextStyle, link: &Option<String>, is_space: bool| {
        let width = fonts.measure(style.face, style.size, &text);
        Piece { text, style, link: link.clone(), width, is_space }
    };

    for run in &block.runs {
        let mut buf = String::new();
        for ch in run.text.chars() {
            match ch {
                ' ' | '\n' => {
                    if !buf.is_empty() {
                        word.push(piece(mem::take(&mut buf), run.style, &run.link, false));
                    }
                    if !word.is_empty() {
                        tokens.push(Token::Word(mem::take(&mut word)));
                    }
                    tokens.push(if ch == ' ' {
                        Token::Space(piece(" ".to_string(), run.style, &run.link, true))
                    } else {
                        Token::Break
                    });
                }
                _ => buf.push(ch),
            }
        }
        if !buf.is_empty() {
            word.push(piece(buf, run.style, &run.link, false));
        }
    }
    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }
    tokens
}

fn break_lines(tokens: Vec<Token>, max_width: f32, fonts: &FontSet) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();
    let mut pending_space: Option<Piece> = None;

    for token in tokens {
        match token {
            Token::Break => {
                line.ragged = true;
                lines.push(mem::take(&mut line));
                pending_space = None;
            }
            Token::Space(space) => {
                if !line.pieces.is_empty() {
                    pending_space = Some(space);
                }
            }
            Token::Word(pieces) => {
                let width: f32 = pieces.iter().map(|p| p.width).sum();
                let space_width = pending_space.as_ref().map_or(0.0, |s| s.width);

                if !line.pieces.is_empty() && line.width + space_width + width > max_width + EPSILON {
                    lines.push(mem::take(&mut line));
                    pending_space = None;
                }

                if line.pieces.is_empty() && width > max_width + EPSILON {
                    split_word(pieces, max_width, fonts, &mut line, &mut lines);
                    continue;
                }
                if let Some(space) = pending_space.take() {
                    line.push(space);
                }
                for piece in pieces {
                    line.push(piece);
                }
            }
        }
    }

    if !line.pieces.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    if let Some(last) = lines.last_mut() {
        last.ragged = true;
    }
    lines
}

/// Breaks an over-long word between characters, filling `line` and pushing
/// full lines to `lines`.
fn split_word(pieces: Vec<Piece>, max_width: f32, fonts: &FontSet, line: &mut Line, lines: &mut Vec<Line>) {
    for piece in pieces {
        let mut chunk = String::new();
        let mut chunk_width = 0.0;
        for ch in piece.text.chars() {
            let mut buf = [0u8; 4];
            let cw = fonts.measure(piece.style.face, piece.style.size, ch.encode_utf8(&mut buf));
            let has_content = !line.pieces.is_empty() || !chunk.is_empty();
            if has_content && line.width + chunk_width + cw > max_width + EPSILON {
                if !chunk.is_empty() {
                    line.push(Piece { text: mem::take(&mut chunk), width: chunk_width, ..piece.clone() });
                }
                chunk_width = 0.0;
                lines.push(mem::take(line));
            }
            chunk.push(ch);
            chunk_width += cw;
        }
        if !chunk.is_empty() {
            line.push(Piece { text: chunk, width: chunk_width, ..piece });
        }
    }
}
