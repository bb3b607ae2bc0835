//! PDF serialization of laid-out pages.
//!
//! Pages share one resource dictionary on the page tree. Fonts are written
//! after all pages so only glyphs that were actually drawn end up in the width
//! arrays and `ToUnicode` maps.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

use super::fonts::{FontProgram, FontSet, FontSlot, StandardFont, TrueTypeFont};
use super::images::{ImageStore, LoadedImage};
use super::layout::{DrawOp, Page, Rect};
use super::markup::{Rgb, TextStyle};
use super::{PAGE_HEIGHT, PAGE_WIDTH};
use crate::Result;

const PDF_VERSION: &str = "1.7";
const CREATION_DATE_FORMAT: &str = "D:%Y%m%d%H%M%SZ";
const BFCHAR_CHUNK: usize = 100;

/// Values of the document Info dictionary and catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    pub creator: String,
    pub producer: String,
    pub created: NaiveDateTime,
    /// Written to the catalog as `/Lang`.
    pub language: String,
    pub keywords: String,
    pub subject: String,
}

/// Glyphs drawn per font slot: code to (character, advance).
type GlyphUsage = BTreeMap<FontSlot, BTreeMap<u16, (char, f32)>>;

struct Writer<'a> {
    doc: Document,
    fonts: &'a FontSet,
    images: &'a ImageStore,
    used_glyphs: GlyphUsage,
    xobjects: HashMap<String, (String, ObjectId)>,
}

/// Builds the PDF object graph for `pages`.
pub fn build_document(pages: &[Page], fonts: &FontSet, images: &ImageStore, info: &DocumentInfo) -> Result<Document> {
    let mut writer = Writer {
        doc: Document::with_version(PDF_VERSION),
        fonts,
        images,
        used_glyphs: GlyphUsage::new(),
        xobjects: HashMap::new(),
    };

    let pages_id = writer.doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        kids.push(Object::Reference(writer.page(page, pages_id)?));
    }

    let resources = writer.resources()?;
    let page_count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    let tree = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "MediaBox" => [0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT].map(Object::from).to_vec(),
        "Resources" => resources,
    };
    writer.doc.objects.insert(pages_id, Object::Dictionary(tree));

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    if !info.language.is_empty() {
        catalog.set("Lang", text_string(&info.language));
    }
    let catalog_id = writer.doc.add_object(catalog);

    let info_id = writer.doc.add_object(info_dictionary(info));
    writer.doc.trailer.set("Root", catalog_id);
    writer.doc.trailer.set("Info", info_id);

    let mut doc = writer.doc;
    doc.compress();
    Ok(doc)
}

/// Serializes a built document.
pub fn to_bytes(doc: &mut Document) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

impl Writer<'_> {
    fn page(&mut self, page: &Page, parent: ObjectId) -> Result<ObjectId> {
        let mut operations = Vec::new();
        let mut annots = Vec::new();

        for op in &page.ops {
            match op {
                DrawOp::Text { x, baseline, text, style, .. } => self.text(&mut operations, *x, *baseline, text, style),
                DrawOp::Image { key, rect } => self.image(&mut operations, key, rect),
                DrawOp::Rule { from, to, thickness, color } => rule(&mut operations, *from, *to, *thickness, *color),
                DrawOp::Link { rect, uri, alt } => {
                    let annot = link_annotation(rect, uri, alt.as_deref());
                    annots.push(Object::Reference(self.doc.add_object(annot)));
                }
            }
        }

        let content = Content { operations }.encode()?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));

        let mut dict = dictionary! {
            "Type" => "Page",
            "Parent" => parent,
            "Contents" => content_id,
        };
        if !annots.is_empty() {
            dict.set("Annots", annots);
        }
        Ok(self.doc.add_object(dict))
    }

    fn text(&mut self, ops: &mut Vec<Operation>, x: f32, baseline: f32, text: &str, style: &TextStyle) {
        let segments = self.encode(text, style);
        if segments.is_empty() {
            return;
        }

        let [r, g, b] = style.color.components();
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
        ops.push(Operation::new("Td", vec![x.into(), (PAGE_HEIGHT - baseline).into()]));
        for (slot, bytes) in segments {
            let format = match self.fonts.program(slot) {
                Some(FontProgram::TrueType(_)) => StringFormat::Hexadecimal,
                _ => StringFormat::Literal,
            };
            ops.push(Operation::new("Tf", vec![Object::Name(slot.resource_name().as_bytes().to_vec()), style.size.into()]));
            ops.push(Operation::new("Tj", vec![Object::String(bytes, format)]));
        }
        ops.push(Operation::new("ET", vec![]));
    }

    /// Splits `text` into runs of bytes per font slot, recording used glyphs.
    fn encode(&mut self, text: &str, style: &TextStyle) -> Vec<(FontSlot, Vec<u8>)> {
        let mut segments: Vec<(FontSlot, Vec<u8>)> = Vec::new();
        for ch in text.chars() {
            let glyph = self.fonts.resolve(style.face, ch);
            self.used_glyphs.entry(glyph.slot).or_default().entry(glyph.code).or_insert((glyph.ch, glyph.width));

            let bytes = match self.fonts.program(glyph.slot) {
                Some(FontProgram::TrueType(_)) => glyph.code.to_be_bytes().to_vec(),
                _ => vec![u8::try_from(glyph.code).unwrap_or(b'?')],
            };
            match segments.last_mut() {
                Some((slot, buf)) if *slot == glyph.slot => buf.extend(bytes),
                _ => segments.push((glyph.slot, bytes)),
            }
        }
        segments
    }

    fn image(&mut self, ops: &mut Vec<Operation>, key: &str, rect: &Rect) {
        let Some(name) = self.xobject(key) else {
            tracing::warn!(key, "image missing at write time, leaving it out");
            return;
        };
        let bottom = PAGE_HEIGHT - (rect.y + rect.height);
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![rect.width.into(), 0.into(), 0.into(), rect.height.into(), rect.x.into(), bottom.into()],
        ));
        ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        ops.push(Operation::new("Q", vec![]));
    }

    /// Resource name of the XObject for `key`, writing it on first use.
    fn xobject(&mut self, key: &str) -> Option<String> {
        if let Some((name, _)) = self.xobjects.get(key) {
            return Some(name.clone());
        }
        let image = self.images.get(key)?;
        let id = image_xobject(&mut self.doc, image);
        let name = format!("Im{}", self.xobjects.len() + 1);
        self.xobjects.insert(key.to_string(), (name.clone(), id));
        Some(name)
    }

    fn resources(&mut self) -> Result<Dictionary> {
        let mut font_dict = Dictionary::new();
        let usage = std::mem::take(&mut self.used_glyphs);
        for (slot, glyphs) in &usage {
            let id = match self.fonts.program(*slot) {
                Some(FontProgram::Standard(font)) => self.doc.add_object(standard_font(font)),
                Some(FontProgram::TrueType(font)) => truetype_font(&mut self.doc, font, glyphs)?,
                None => continue,
            };
            font_dict.set(slot.resource_name(), id);
        }

        let mut xobject_dict = Dictionary::new();
        for (name, id) in self.xobjects.values() {
            xobject_dict.set(name.as_str(), *id);
        }

        let mut resources = dictionary! {
            "ProcSet" => ["PDF", "Text", "ImageC"].map(|name| Object::Name(name.as_bytes().to_vec())).to_vec(),
        };
        if !font_dict.is_empty() {
            resources.set("Font", font_dict);
        }
        if !xobject_dict.is_empty() {
            resources.set("XObject", xobject_dict);
        }
        Ok(resources)
    }
}

fn rule(ops: &mut Vec<Operation>, from: (f32, f32), to: (f32, f32), thickness: f32, color: Rgb) {
    let [r, g, b] = color.components();
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
    ops.push(Operation::new("w", vec![thickness.into()]));
    ops.push(Operation::new("m", vec![from.0.into(), (PAGE_HEIGHT - from.1).into()]));
    ops.push(Operation::new("l", vec![to.0.into(), (PAGE_HEIGHT - to.1).into()]));
    ops.push(Operation::new("S", vec![]));
    ops.push(Operation::new("Q", vec![]));
}

fn link_annotation(rect: &Rect, uri: &str, alt: Option<&str>) -> Dictionary {
    let bottom = PAGE_HEIGHT - (rect.y + rect.height);
    let mut annot = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => [rect.x, bottom, rect.x + rect.width, bottom + rect.height].map(Object::from).to_vec(),
        "Border" => vec![Object::Integer(0); 3],
        "A" => dictionary! {
            "S" => "URI",
            "URI" => Object::string_literal(uri),
        },
    };
    if let Some(alt) = alt.filter(|a| !a.is_empty()) {
        annot.set("Contents", text_string(alt));
    }
    annot
}

fn image_xobject(doc: &mut Document, image: &LoadedImage) -> ObjectId {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(image.width),
        "Height" => i64::from(image.height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    if let Some(alpha) = &image.alpha {
        let mask = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width),
            "Height" => i64::from(image.height),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        };
        let mask_id = doc.add_object(Stream::new(mask, alpha.clone()));
        dict.set("SMask", mask_id);
    }
    doc.add_object(Stream::new(dict, image.rgb.clone()))
}

fn standard_font(font: &StandardFont) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Writes a Type0 font with an embedded CIDFontType2 descendant and returns the Type0 id.
fn truetype_font(doc: &mut Document, font: &TrueTypeFont, glyphs: &BTreeMap<u16, (char, f32)>) -> Result<ObjectId> {
    let base_font = Object::Name(font.name.as_bytes().to_vec());

    let file_len = i64::try_from(font.data.len()).unwrap_or(i64::MAX);
    let file_id = doc.add_object(Stream::new(dictionary! { "Length1" => file_len }, font.data.clone()));

    // symbolic flag is left clear, italic flag follows the program
    let flags: i64 = if font.italic { 32 | 64 } else { 32 };
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => base_font.clone(),
        "Flags" => flags,
        "FontBBox" => font.bbox().iter().map(|v| Object::from(*v)).collect::<Vec<_>>(),
        "ItalicAngle" => if font.italic { -12 } else { 0 },
        "Ascent" => font.ascent(),
        "Descent" => font.descent(),
        "CapHeight" => font.cap_height(),
        "StemV" => 80,
        "FontFile2" => file_id,
    });

    let widths: Vec<Object> = glyphs
        .iter()
        .flat_map(|(gid, (_, width))| [Object::Integer(i64::from(*gid)), Object::Array(vec![Object::from(*width)])])
        .collect();

    let cid_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => base_font.clone(),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000,
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let cmap = to_unicode_cmap(glyphs);
    let cmap_id = doc.add_object(Stream::new(Dictionary::new(), cmap.into_bytes()));

    Ok(doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => base_font,
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_id)],
        "ToUnicode" => cmap_id,
    }))
}

fn to_unicode_cmap(glyphs: &BTreeMap<u16, (char, f32)>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let entries: Vec<(u16, char)> = glyphs.iter().map(|(gid, (ch, _))| (*gid, *ch)).collect();
    for chunk in entries.chunks(BFCHAR_CHUNK) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, ch) in chunk {
            let mut units = [0u16; 2];
            let hex: String = ch.encode_utf16(&mut units).iter().map(|u| format!("{u:04X}")).collect();
            cmap.push_str(&format!("<{gid:04X}> <{hex}>\n"));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

fn info_dictionary(info: &DocumentInfo) -> Dictionary {
    let mut dict = Dictionary::new();
    for (key, value) in [
        ("Title", info.title.as_str()),
        ("Author", info.author.as_str()),
        ("Creator", info.creator.as_str()),
        ("Producer", info.producer.as_str()),
        ("Keywords", info.keywords.as_str()),
        ("Subject", info.subject.as_str()),
    ] {
        if !value.is_empty() {
            dict.set(key, text_string(value));
        }
    }
    dict.set("CreationDate", Object::string_literal(info.created.format(CREATION_DATE_FORMAT).to_string()));
    dict
}

/// A PDF text string: literal when ASCII, UTF-16BE with a byte order mark otherwise.
pub fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::string_literal(value);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Decodes a PDF text string written by [`text_string`].
pub fn decode_text_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
            String::from_utf16_lossy(&units)
        }
        None => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}
