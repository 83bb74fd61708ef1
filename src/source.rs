//! Upload decoding, preview derivation and PNG export.

use std::io::Cursor;
use std::path::Path;

use image::buffer::ConvertBuffer;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage, RgbaImage};
use log::{debug, info};

use crate::error::{Error, Result};

/// Maximum preview width; wider uploads are scaled down to it.
pub const DISPLAY_WIDTH: u32 = 800;

/// File name offered for the exported result.
pub const EXPORT_NAME: &str = "final_overlay.png";

/// MIME type of the exported result.
pub const EXPORT_MIME: &str = "image/png";

/// Check if a file has an extension accepted for upload.
#[must_use]
pub fn is_supported_upload(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(ext.to_lowercase().as_str(), "png" | "jpg" | "jpeg"),
        None => false,
    }
}

/// Decode an uploaded PNG or JPEG and normalize it to RGBA.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] if the bytes are not a PNG or JPEG
/// container or the decoded image is empty, and [`Error::Image`] if decoding
/// a recognized container fails.
pub fn decode_upload(bytes: &[u8]) -> Result<RgbaImage> {
    let format =
        image::guess_format(bytes).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(Error::UnsupportedFormat(format!("{format:?}")));
    }

    let rgba = image::load_from_memory_with_format(bytes, format)?.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(Error::UnsupportedFormat("image has no pixels".to_string()));
    }

    info!(
        "decoded {format:?} upload ({}x{}, {} bytes)",
        rgba.width(),
        rgba.height(),
        bytes.len()
    );
    Ok(rgba)
}

/// Read and decode an upload from disk.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for extensions other than png/jpg/jpeg,
/// [`Error::Io`] if the file cannot be read, or any error from [`decode_upload`].
pub fn open_upload(path: &Path) -> Result<RgbaImage> {
    if !is_supported_upload(path) {
        let ext = path
            .extension()
            .map_or_else(String::new, |e| e.to_string_lossy().into_owned());
        return Err(Error::UnsupportedFormat(ext));
    }
    let bytes = std::fs::read(path)?;
    decode_upload(&bytes)
}

/// Compute preview dimensions for an image of `width x height`.
///
/// Images wider than `display_width` are scaled down to exactly that width,
/// with the height truncated to preserve the aspect ratio (never below 1).
/// Narrower images keep their size.
#[must_use]
pub fn preview_size(width: u32, height: u32, display_width: u32) -> (u32, u32) {
    if display_width == 0 || width <= display_width {
        return (width, height);
    }
    let scale = f64::from(width) / f64::from(display_width);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled_height = (f64::from(height) / scale) as u32;
    (display_width, scaled_height.max(1))
}

/// Down-scaled, read-only copy of the source used as the annotation background.
#[derive(Debug, Clone)]
pub struct Preview {
    image: RgbaImage,
    scale_factor: f32,
}

impl Preview {
    /// Derive a preview no wider than `display_width`.
    #[must_use]
    pub fn new(source: &RgbaImage, display_width: u32) -> Self {
        let (w, h) = source.dimensions();
        let (pw, ph) = preview_size(w, h, display_width);

        let image = if (pw, ph) == (w, h) {
            source.clone()
        } else {
            imageops::resize(source, pw, ph, FilterType::CatmullRom)
        };

        #[allow(clippy::cast_precision_loss)]
        let scale_factor = w as f32 / pw as f32;
        debug!("preview {pw}x{ph} for {w}x{h} source (scale {scale_factor:.3})");

        Self {
            image,
            scale_factor,
        }
    }

    /// Preview width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Preview height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// `(width, height)` of the preview.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Source width divided by preview width (1.0 when not scaled).
    #[must_use]
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// The preview pixels.
    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Opaque RGB rendition for display behind the annotation surface.
    #[must_use]
    pub fn background(&self) -> RgbImage {
        self.image.convert()
    }
}

/// Encode an image as PNG bytes.
///
/// # Errors
///
/// Returns [`Error::EncodingFailure`] if the PNG encoder rejects the image.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(Error::EncodingFailure)?;
    Ok(buf.into_inner())
}
