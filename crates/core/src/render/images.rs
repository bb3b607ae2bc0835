//! Decoded raster images, keyed by the `src` the markup refers to them by.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use image::GenericImageView;

use crate::{BroadsheetError, Result};

/// An image ready to become a PDF XObject: 8-bit RGB samples plus an optional
/// 8-bit alpha plane.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub alpha: Option<Vec<u8>>,
}

impl LoadedImage {
    /// Decodes PNG, JPEG, GIF or WebP bytes.
    ///
    /// `source_ref` only names the image in errors.
    pub fn decode(source_ref: &str, bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| BroadsheetError::Image { source_ref: source_ref.to_string(), reason: e.to_string() })?;

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(BroadsheetError::Image {
                source_ref: source_ref.to_string(),
                reason: "image has no pixels".to_string(),
            });
        }

        let has_alpha = decoded.color().has_alpha();
        let rgba = decoded.to_rgba8();

        let pixels = (width as usize) * (height as usize);
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(if has_alpha { pixels } else { 0 });
        for px in rgba.pixels() {
            rgb.extend_from_slice(&px.0[..3]);
            if has_alpha {
                alpha.push(px.0[3]);
            }
        }

        let alpha = (has_alpha && alpha.iter().any(|&a| a != u8::MAX)).then_some(alpha);
        Ok(Self { width, height, rgb, alpha })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::decode(&path.display().to_string(), &bytes)
    }

    /// Height over width.
    pub fn aspect(&self) -> f32 {
        self.height as f32 / self.width as f32
    }
}

/// Images available to one render, keyed by `src`.
#[derive(Debug, Clone, Default)]
pub struct ImageStore {
    images: HashMap<String, Arc<LoadedImage>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, image: LoadedImage) {
        self.images.insert(key.into(), Arc::new(image));
    }

    pub fn get(&self, key: &str) -> Option<&Arc<LoadedImage>> {
        self.images.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.images.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// A store holding both sets; entries of `other` win on key clashes.
    pub fn merged(&self, other: &ImageStore) -> ImageStore {
        let mut images = self.images.clone();
        images.extend(other.images.iter().map(|(k, v)| (k.clone(), Arc::clone(v))));
        ImageStore { images }
    }
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
