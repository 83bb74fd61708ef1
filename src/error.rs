//! Error types for the mask-cutout crate.

use crate::surface::Tool;

/// Errors that can occur while loading, annotating, resolving or exporting an image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The annotation raster is empty or its buffer disagrees with its dimensions.
    #[error("annotation raster {width}x{height} cannot be mapped onto the source ({len} bytes)")]
    DimensionMismatch {
        /// Declared raster width in pixels.
        width: u32,
        /// Declared raster height in pixels.
        height: u32,
        /// Length of the pixel buffer in bytes.
        len: usize,
    },

    /// The image cannot be interpreted as a 4-channel pixel grid.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The final image could not be serialized to PNG.
    #[error("failed to encode PNG: {0}")]
    EncodingFailure(image::ImageError),

    /// A drawing call was made while a different tool was active.
    #[error("drawing needs the {expected:?} tool, but {active:?} is active")]
    ToolMismatch {
        /// Tool the drawing call needs.
        expected: Tool,
        /// Tool currently selected on the surface.
        active: Tool,
    },

    /// An I/O error occurred while reading an upload from disk.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A recognized image container failed to decode.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Short message suitable for an inline notice next to the preview.
    #[must_use]
    pub fn notice(&self) -> String {
        match self {
            Error::DimensionMismatch { .. } => {
                format!("Annotation could not be applied ({self}). Try redrawing.")
            }
            Error::UnsupportedFormat(_) | Error::Image(_) | Error::Io(_) => {
                format!("Image could not be read ({self}). Please upload a PNG or JPEG.")
            }
            Error::EncodingFailure(_) => format!("Result could not be saved ({self})."),
            Error::ToolMismatch { .. } => self.to_string(),
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
