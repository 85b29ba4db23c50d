//! Image decoding and thumbnail production.
//!
//! Decoding and resizing go through the [`ImageCodec`] trait so the loading
//! pipeline does not depend on a concrete codec.

use crate::config::THUMBNAIL_SIZE;
use crate::error::{AppError, Result};
use image::DynamicImage;
use image::imageops::FilterType;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;

const PLACEHOLDER_GRAY: u8 = 0x99;

/// Decoded RGB8 pixels of a thumbnail or preview image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    placeholder: bool,
}

impl Thumbnail {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            placeholder: false,
        }
    }

    pub fn from_image(image: &DynamicImage) -> Self {
        Self::new(image.to_rgb8().into_raw(), image.width(), image.height())
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

static PLACEHOLDER: Lazy<Arc<Thumbnail>> = Lazy::new(|| {
    let pixels = (THUMBNAIL_SIZE * THUMBNAIL_SIZE * 3) as usize;
    Arc::new(Thumbnail {
        data: vec![PLACEHOLDER_GRAY; pixels],
        width: THUMBNAIL_SIZE,
        height: THUMBNAIL_SIZE,
        placeholder: true,
    })
});

/// Shared placeholder shown until a thumbnail has been decoded.
pub fn placeholder() -> Arc<Thumbnail> {
    PLACEHOLDER.clone()
}

/// Decoder/resizer used by the loading pipeline.
pub trait ImageCodec: Send + Sync {
    /// Decodes the file at `path`.
    fn decode(&self, path: &Path) -> Result<DynamicImage>;

    /// Resizes `image` to fit inside a `width` x `height` box, keeping its aspect ratio.
    /// Small images are scaled up to the box.
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;
}

/// [`ImageCodec`] backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateCodec;

impl ImageCodec for ImageCrateCodec {
    fn decode(&self, path: &Path) -> Result<DynamicImage> {
        image::ImageReader::open(path)
            .map_err(|e| AppError::image_load(path, e))?
            .with_guessed_format()
            .map_err(|e| AppError::image_load(path, e))?
            .decode()
            .map_err(|e| AppError::image_load(path, e))
    }

    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (fit_width, fit_height) = fit_within(image.width(), image.height(), width, height);
        image.resize_exact(fit_width, fit_height, FilterType::Lanczos3)
    }
}

/// Computes the size of a `src_width` x `src_height` image fitted into a box.
///
/// The longer side (relative to the box) fills the box; the other side is scaled
/// proportionally and truncated, never below one pixel.
pub fn fit_within(src_width: u32, src_height: u32, box_width: u32, box_height: u32) -> (u32, u32) {
    if src_width == 0 || src_height == 0 {
        return (box_width.max(1), box_height.max(1));
    }

    let original_ratio = src_width as f64 / src_height as f64;
    let target_ratio = box_width as f64 / box_height as f64;

    let (width, height) = if original_ratio > target_ratio {
        (box_width, (box_width as f64 / original_ratio) as u32)
    } else {
        ((box_height as f64 * original_ratio) as u32, box_height)
    };

    (width.max(1), height.max(1))
}

/// Decodes `path` and fits it into the thumbnail box.
pub fn create_thumbnail(codec: &dyn ImageCodec, path: &Path, size: u32) -> Result<Thumbnail> {
    let image = codec.decode(path)?;
    let resized = codec.resize(&image, size, size);
    Ok(Thumbnail::from_image(&resized))
}

/// Decodes `path` at full size for the preview pane.
pub fn load_image_blocking(codec: &dyn ImageCodec, path: &Path) -> Result<Thumbnail> {
    let image = codec.decode(path)?;
    Ok(Thumbnail::from_image(&image))
}
