//! Mask resolution: turning an annotation raster into an alpha channel.
//!
//! Annotations are drawn on a down-scaled preview, so the raster is first
//! upsampled to source resolution. Each upsampled pixel's intent is read from
//! its color alone, whichever tool produced it:
//!
//! - red without green marks removal: `alpha = 0`
//! - any green marks restoration: `alpha = 255`, overriding removal
//!
//! Pixels carrying neither keep the source alpha. RGB is never touched.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use log::debug;

use crate::error::{Error, Result};

/// Alpha written for removal marks.
pub const TRANSPARENT: u8 = 0;

/// Alpha written for restoration marks.
pub const OPAQUE: u8 = 255;

/// What an annotation pixel asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// No mark: the source alpha is kept.
    Keep,
    /// Red-only mark: the pixel becomes fully transparent.
    Remove,
    /// Green mark: the pixel becomes fully opaque.
    Restore,
}

impl Intent {
    /// Classify an annotation pixel by its color channels.
    ///
    /// Restoration dominates: a pixel with both red and green is [`Intent::Restore`].
    #[must_use]
    pub fn classify(pixel: &Rgba<u8>) -> Self {
        if is_restoration(pixel) {
            Intent::Restore
        } else if is_removal(pixel) {
            Intent::Remove
        } else {
            Intent::Keep
        }
    }
}

/// `red > 0 && green == 0`.
#[must_use]
pub fn is_removal(pixel: &Rgba<u8>) -> bool {
    pixel[0] > 0 && pixel[1] == 0
}

/// `green > 0`, regardless of red.
#[must_use]
pub fn is_restoration(pixel: &Rgba<u8>) -> bool {
    pixel[1] > 0
}

/// Wrap an externally produced RGBA buffer as an annotation raster.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if either dimension is zero or the
/// buffer length is not `width * height * 4`.
pub fn annotation_from_raw(width: u32, height: u32, bytes: Vec<u8>) -> Result<RgbaImage> {
    let len = bytes.len();
    let mismatch = Error::DimensionMismatch { width, height, len };
    if width == 0 || height == 0 {
        return Err(mismatch);
    }
    RgbaImage::from_raw(width, height, bytes).ok_or(mismatch)
}

/// Upscale an annotation raster to `width x height` with nearest-neighbor sampling.
///
/// Nearest-neighbor keeps mark boundaries pixel-sharp, so no partially
/// transparent fringe appears around a resolved region.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the raster or the target is empty.
pub fn upscale_nearest(annotation: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage> {
    let (w, h) = annotation.dimensions();
    if w == 0 || h == 0 || width == 0 || height == 0 {
        return Err(Error::DimensionMismatch {
            width: w,
            height: h,
            len: annotation.as_raw().len(),
        });
    }

    if (w, h) == (width, height) {
        return Ok(annotation.clone());
    }

    debug!("upscaling annotation {w}x{h} -> {width}x{height} (nearest)");
    Ok(imageops::resize(annotation, width, height, FilterType::Nearest))
}

/// Resolve an annotation raster against the source image.
///
/// Returns a copy of `source` whose alpha channel reflects the marks. The
/// source is never mutated, so resolving the same pair twice yields
/// byte-identical output.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the annotation raster (or the
/// source) has a zero dimension.
pub fn resolve(source: &RgbaImage, annotation: &RgbaImage) -> Result<RgbaImage> {
    let mask = upscale_nearest(annotation, source.width(), source.height())?;
    let mut result = source.clone();

    let mut removed = 0usize;
    let mut restored = 0usize;

    for (px, mark) in result.pixels_mut().zip(mask.pixels()) {
        // Removal first, restoration second: green wins on overlap.
        if is_removal(mark) {
            px[3] = TRANSPARENT;
            removed += 1;
        }
        if is_restoration(mark) {
            px[3] = OPAQUE;
            restored += 1;
        }
    }

    debug!(
        "resolved {}x{}: {removed} pixels removed, {restored} restored",
        result.width(),
        result.height()
    );

    Ok(result)
}
