//! Editing session: one uploaded image, its preview, and the marks drawn on it.

use std::path::Path;

use image::RgbaImage;
use log::{info, warn};

use crate::error::{Error, Result};
use crate::resolver;
use crate::source::{self, Preview, DISPLAY_WIDTH, EXPORT_MIME, EXPORT_NAME};
use crate::surface::{AnnotationSurface, DEFAULT_BRUSH_WIDTH};

/// Options controlling a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Maximum preview width in pixels.
    pub display_width: u32,
    /// Initial freehand brush width (clamped to `1..=50`).
    pub brush_width: u32,
    /// File name offered for the exported PNG.
    pub export_name: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            display_width: DISPLAY_WIDTH,
            brush_width: DEFAULT_BRUSH_WIDTH,
            export_name: EXPORT_NAME.to_string(),
        }
    }
}

/// PNG download produced from the current marks.
#[derive(Debug, Clone)]
pub struct Export {
    /// Suggested file name.
    pub name: String,
    /// MIME type, always `image/png`.
    pub mime: &'static str,
    /// Encoded PNG bytes.
    pub bytes: Vec<u8>,
    /// Width of the exported image.
    pub width: u32,
    /// Height of the exported image.
    pub height: u32,
}

impl Export {
    /// Caption shown under the result preview.
    #[must_use]
    pub fn caption(&self) -> String {
        format!("Final size: {}x{}", self.width, self.height)
    }
}

/// Outcome of a render pass.
#[derive(Debug)]
pub enum Rendered {
    /// The resolved image.
    Image(RgbaImage),
    /// A failure, phrased for display next to the preview.
    Notice(String),
}

/// State for one uploaded image.
///
/// Replacing the source resets the marks. Failed resolves and exports leave
/// the session untouched so the user can redraw or re-upload.
pub struct Session {
    options: SessionOptions,
    source: RgbaImage,
    preview: Preview,
    surface: AnnotationSurface,
}

impl Session {
    /// Start a session on an already decoded RGBA image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] if the image has no pixels.
    pub fn new(source: RgbaImage, options: SessionOptions) -> Result<Self> {
        if source.width() == 0 || source.height() == 0 {
            return Err(Error::UnsupportedFormat("image has no pixels".to_string()));
        }

        let preview = Preview::new(&source, options.display_width);
        let (pw, ph) = preview.dimensions();
        let mut surface = AnnotationSurface::new(pw, ph);
        surface.set_brush_width(options.brush_width);

        info!(
            "session opened: source {}x{}, preview {pw}x{ph}",
            source.width(),
            source.height()
        );

        Ok(Self {
            options,
            source,
            preview,
            surface,
        })
    }

    /// Start a session from uploaded PNG or JPEG bytes.
    ///
    /// # Errors
    ///
    /// Returns any error from [`source::decode_upload`].
    pub fn open(bytes: &[u8], options: SessionOptions) -> Result<Self> {
        Self::new(source::decode_upload(bytes)?, options)
    }

    /// Start a session from an image file on disk.
    ///
    /// # Errors
    ///
    /// Returns any error from [`source::open_upload`].
    pub fn open_path(path: &Path, options: SessionOptions) -> Result<Self> {
        Self::new(source::open_upload(path)?, options)
    }

    /// Swap in a new upload, clearing all marks.
    ///
    /// On error the current image and marks are kept.
    ///
    /// # Errors
    ///
    /// Returns any error from [`source::decode_upload`].
    pub fn replace_source(&mut self, bytes: &[u8]) -> Result<()> {
        let source = source::decode_upload(bytes)?;
        let preview = Preview::new(&source, self.options.display_width);
        let (pw, ph) = preview.dimensions();

        let mut surface = AnnotationSurface::new(pw, ph);
        surface.select_tool(self.surface.tool());
        surface.set_brush_width(self.surface.brush_width());

        info!(
            "source replaced: {}x{}, preview {pw}x{ph}",
            source.width(),
            source.height()
        );

        self.source = source;
        self.preview = preview;
        self.surface = surface;
        Ok(())
    }

    /// Replace the marks with a raster emitted by an external drawing widget.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] unless the raster matches the preview size.
    pub fn load_annotation(&mut self, raster: RgbaImage) -> Result<()> {
        if raster.dimensions() != self.preview.dimensions() {
            return Err(Error::DimensionMismatch {
                width: raster.width(),
                height: raster.height(),
                len: raster.as_raw().len(),
            });
        }
        let mut surface = AnnotationSurface::from_raster(raster)?;
        surface.select_tool(self.surface.tool());
        surface.set_brush_width(self.surface.brush_width());
        self.surface = surface;
        Ok(())
    }

    /// Session options.
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The full-resolution upload.
    #[must_use]
    pub fn source(&self) -> &RgbaImage {
        &self.source
    }

    /// The annotation background.
    #[must_use]
    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    /// The marks drawn so far.
    #[must_use]
    pub fn surface(&self) -> &AnnotationSurface {
        &self.surface
    }

    /// Mutable access for drawing.
    pub fn surface_mut(&mut self) -> &mut AnnotationSurface {
        &mut self.surface
    }

    /// Resolve the current marks into the final image.
    ///
    /// # Errors
    ///
    /// Returns any error from [`resolver::resolve`].
    pub fn resolve(&self) -> Result<RgbaImage> {
        resolver::resolve(&self.source, self.surface.raster())
    }

    /// Resolve for display, turning failures into a notice.
    #[must_use]
    pub fn render(&self) -> Rendered {
        match self.resolve() {
            Ok(image) => Rendered::Image(image),
            Err(e) => {
                warn!("resolve failed: {e}");
                Rendered::Notice(e.notice())
            }
        }
    }

    /// Resolve and encode the result as a PNG download.
    ///
    /// # Errors
    ///
    /// Returns any error from [`resolver::resolve`] or [`source::encode_png`].
    pub fn export(&self) -> Result<Export> {
        let image = self.resolve()?;
        let bytes = source::encode_png(&image)?;

        info!(
            "exported {} ({}x{}, {} bytes)",
            self.options.export_name,
            image.width(),
            image.height(),
            bytes.len()
        );

        Ok(Export {
            name: self.options.export_name.clone(),
            mime: EXPORT_MIME,
            bytes,
            width: image.width(),
            height: image.height(),
        })
    }
}
