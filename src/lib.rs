//! Cut out image regions by painting over a preview.
//!
//! Users mark a down-scaled preview of their image with two tools: red
//! rectangles for regions to remove and green freehand strokes for regions to
//! keep. The marks form a single RGBA raster at preview resolution. Resolving
//! upsamples that raster to the original resolution with nearest-neighbor
//! sampling and rewrites the alpha channel of a copy of the original:
//!
//! - red without green: fully transparent
//! - any green: fully opaque (restoration wins over removal)
//! - unmarked: original alpha
//!
//! RGB values are never changed. The result is exported as a PNG.
//!
//! # Quick Start
//!
//! ```no_run
//! use mask_cutout::{Session, SessionOptions, Tool};
//!
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! let mut session = Session::open(&bytes, SessionOptions::default()).unwrap();
//!
//! let surface = session.surface_mut();
//! surface.draw_rect((100, 80), (400, 300)).unwrap();
//! surface.select_tool(Tool::Freehand);
//! surface.draw_freehand(&[(200, 150), (260, 180)]).unwrap();
//!
//! let export = session.export().unwrap();
//! std::fs::write(&export.name, &export.bytes).unwrap();
//! ```
//!
//! # Resolving without a session
//!
//! Rasters produced by any drawing widget can be resolved directly:
//!
//! ```no_run
//! use mask_cutout::{annotation_from_raw, resolve};
//!
//! let source = image::open("photo.png").unwrap().to_rgba8();
//! # let (w, h, marks) = (800, 600, vec![0u8; 800 * 600 * 4]);
//! let annotation = annotation_from_raw(w, h, marks).unwrap();
//! let cutout = resolve(&source, &annotation).unwrap();
//! ```

#![deny(missing_docs)]

pub mod error;
pub mod resolver;
mod session;
pub mod source;
pub mod surface;

pub use error::{Error, Result};
pub use resolver::{annotation_from_raw, resolve, upscale_nearest, Intent};
pub use session::{Export, Rendered, Session, SessionOptions};
pub use source::{decode_upload, encode_png, preview_size, Preview};
pub use surface::{AnnotationSurface, Tool, ToolSettings};
