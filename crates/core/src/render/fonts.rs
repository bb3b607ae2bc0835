//! Font programs, glyph resolution and fallback.
//!
//! A [`FontSet`] holds a regular and an italic program plus an optional
//! fallback. Text is never assigned to a program by the markup: every
//! character is resolved here, first against the requested face, then against
//! the fallback, and finally replaced by `?`.
//!
//! Two kinds of program exist. TrueType files are embedded and addressed by
//! glyph id. Without a font directory the standard Helvetica pair is used,
//! which viewers supply themselves and which only covers WinAnsi.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::{BroadsheetError, Result};

/// Regular program file name inside a font directory.
pub const REGULAR_FILE: &str = "MiloTE.ttf";
/// Italic program file name inside a font directory.
pub const ITALIC_FILE: &str = "MiloTE-inclined.ttf";
/// Optional fallback program file name inside a font directory.
pub const FALLBACK_FILE: &str = "fallback.ttf";

const REPLACEMENT: char = '?';

/// Face requested by the markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Face {
    #[default]
    Regular,
    Italic,
}

/// Program a glyph was resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontSlot {
    Regular,
    Italic,
    Fallback,
}

impl FontSlot {
    /// Name of the font in the page resource dictionary.
    pub fn resource_name(self) -> &'static str {
        match self {
            FontSlot::Regular => "F1",
            FontSlot::Italic => "F2",
            FontSlot::Fallback => "F3",
        }
    }
}

/// A resolved character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub slot: FontSlot,
    /// WinAnsi byte for standard fonts, glyph id for TrueType programs.
    pub code: u16,
    /// Advance in thousandths of the font size.
    pub width: f32,
    /// Character the glyph draws; `?` when the input could not be encoded.
    pub ch: char,
}

/// One of the 14 standard PDF fonts, WinAnsi encoded.
#[derive(Debug, Clone)]
pub struct StandardFont {
    pub base_font: &'static str,
}

impl StandardFont {
    fn glyph(&self, ch: char) -> Option<(u16, f32)> {
        let code = win_ansi_code(ch)?;
        let width = HELVETICA_WIDTHS[usize::from(code) - 0x20];
        if width == 0 {
            return None;
        }
        Some((u16::from(code), f32::from(width)))
    }
}

/// An embeddable TrueType program.
#[derive(Debug, Clone)]
pub struct TrueTypeFont {
    /// PostScript name, used as `/BaseFont`.
    pub name: String,
    pub data: Vec<u8>,
    pub italic: bool,
    glyphs: HashMap<char, (u16, u16)>,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    cap_height: i16,
    bbox: [i16; 4],
}

impl TrueTypeFont {
    pub fn load(path: &Path, italic: bool) -> Result<Self> {
        let data = fs::read(path).map_err(|e| BroadsheetError::Font { path: path.to_path_buf(), reason: e.to_string() })?;
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("Embedded");
        Self::from_bytes(data, stem, italic).map_err(|reason| BroadsheetError::Font { path: path.to_path_buf(), reason })
    }

    /// Parses a TrueType program. `fallback_name` is used when the font has no PostScript name.
    pub fn from_bytes(data: Vec<u8>, fallback_name: &str, italic: bool) -> std::result::Result<Self, String> {
        let face = ttf_parser::Face::parse(&data, 0).map_err(|e| e.to_string())?;

        let units_per_em = face.units_per_em();
        if units_per_em == 0 {
            return Err("font declares zero units per em".to_string());
        }

        let mut glyphs = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    if let Some(ch) = char::from_u32(cp)
                        && let Some(gid) = subtable.glyph_index(cp)
                    {
                        let advance = face.glyph_hor_advance(gid).unwrap_or(0);
                        glyphs.entry(ch).or_insert((gid.0, advance));
                    }
                });
            }
        }

        let name = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .find_map(|n| n.to_string())
            .unwrap_or_else(|| fallback_name.to_string());

        let bbox = face.global_bounding_box();
        let ascender = face.ascender();
        let descender = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascender);
        let bbox = [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max];
        drop(face);

        Ok(Self {
            name: sanitize_font_name(&name),
            data,
            italic,
            glyphs,
            units_per_em,
            ascender,
            descender,
            cap_height,
            bbox,
        })
    }

    fn glyph(&self, ch: char) -> Option<(u16, f32)> {
        let (gid, advance) = *self.glyphs.get(&ch)?;
        if gid == 0 {
            return None;
        }
        Some((gid, self.scale(advance as i32)))
    }

    /// Font units to thousandths of an em.
    pub fn scale(&self, value: i32) -> f32 {
        value as f32 * 1000.0 / f32::from(self.units_per_em)
    }

    pub fn ascent(&self) -> f32 {
        self.scale(i32::from(self.ascender))
    }

    pub fn descent(&self) -> f32 {
        self.scale(i32::from(self.descender))
    }

    pub fn cap_height(&self) -> f32 {
        self.scale(i32::from(self.cap_height))
    }

    /// Bounding box in thousandths of an em: `[x_min, y_min, x_max, y_max]`.
    pub fn bbox(&self) -> [f32; 4] {
        self.bbox.map(|v| self.scale(i32::from(v)))
    }
}

/// A font program of either kind.
#[derive(Debug, Clone)]
pub enum FontProgram {
    Standard(StandardFont),
    TrueType(TrueTypeFont),
}

impl FontProgram {
    fn glyph(&self, ch: char) -> Option<(u16, f32)> {
        match self {
            FontProgram::Standard(font) => font.glyph(ch),
            FontProgram::TrueType(font) => font.glyph(ch),
        }
    }
}

/// Regular, italic and fallback programs used for one document.
#[derive(Debug, Clone)]
pub struct FontSet {
    regular: FontProgram,
    italic: FontProgram,
    fallback: Option<FontProgram>,
}

impl FontSet {
    /// Helvetica and Helvetica-Oblique, no fallback.
    pub fn standard() -> Self {
        Self {
            regular: FontProgram::Standard(StandardFont { base_font: "Helvetica" }),
            italic: FontProgram::Standard(StandardFont { base_font: "Helvetica-Oblique" }),
            fallback: None,
        }
    }

    /// Loads the TrueType programs of a font directory.
    ///
    /// # Errors
    ///
    /// Returns [`BroadsheetError::Font`] when the regular or italic program is
    /// missing or unreadable, or when a present fallback program is unreadable.
    pub fn load(dir: &Path) -> Result<Self> {
        let regular = TrueTypeFont::load(&dir.join(REGULAR_FILE), false)?;
        let italic = TrueTypeFont::load(&dir.join(ITALIC_FILE), true)?;

        let fallback_path = dir.join(FALLBACK_FILE);
        let fallback = if fallback_path.is_file() {
            Some(FontProgram::TrueType(TrueTypeFont::load(&fallback_path, false)?))
        } else {
            tracing::debug!("no fallback font in {}", dir.display());
            None
        };

        Ok(Self::from_programs(FontProgram::TrueType(regular), FontProgram::TrueType(italic), fallback))
    }

    pub fn from_programs(regular: FontProgram, italic: FontProgram, fallback: Option<FontProgram>) -> Self {
        Self { regular, italic, fallback }
    }

    pub fn program(&self, slot: FontSlot) -> Option<&FontProgram> {
        match slot {
            FontSlot::Regular => Some(&self.regular),
            FontSlot::Italic => Some(&self.italic),
            FontSlot::Fallback => self.fallback.as_ref(),
        }
    }

    /// Resolves a character: requested face, then fallback, then `?` in the requested face.
    pub fn resolve(&self, face: Face, ch: char) -> Glyph {
        let (slot, program) = match face {
            Face::Regular => (FontSlot::Regular, &self.regular),
            Face::Italic => (FontSlot::Italic, &self.italic),
        };

        if let Some((code, width)) = program.glyph(ch) {
            return Glyph { slot, code, width, ch };
        }
        if let Some(fallback) = &self.fallback
            && let Some((code, width)) = fallback.glyph(ch)
        {
            return Glyph { slot: FontSlot::Fallback, code, width, ch };
        }
        match program.glyph(REPLACEMENT) {
            Some((code, width)) => Glyph { slot, code, width, ch: REPLACEMENT },
            None => Glyph { slot, code: 0, width: 0.0, ch: REPLACEMENT },
        }
    }

    /// Width of `text` in points at `size`.
    pub fn measure(&self, face: Face, size: f32, text: &str) -> f32 {
        let units: f32 = text.chars().map(|ch| self.resolve(face, ch).width).sum();
        units * size / 1000.0
    }
}

fn sanitize_font_name(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_').collect();
    if cleaned.is_empty() { "Embedded".to_string() } else { cleaned }
}

/// Code points of WinAnsi bytes 0x80..=0x9F; `\0` marks unused bytes.
const WIN_ANSI_HIGH: [char; 32] = [
    '€', '\0', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\0', 'Ž', '\0',
    '\0', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', '\0', 'ž', 'Ÿ',
];

fn win_ansi_code(ch: char) -> Option<u8> {
    let code = u32::from(ch);
    match code {
        0x20..=0x7E | 0xA0..=0xFF => u8::try_from(code).ok(),
        _ if ch == '\0' => None,
        _ => WIN_ANSI_HIGH.iter().position(|&c| c == ch).and_then(|i| u8::try_from(0x80 + i).ok()),
    }
}

/// Helvetica advances for WinAnsi bytes 0x20..=0xFF (Helvetica-Oblique shares them).
const HELVETICA_WIDTHS: [u16; 224] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0,
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];
