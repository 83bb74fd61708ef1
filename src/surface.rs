//! Annotation surface: the raster users draw removal and restoration marks on.
//!
//! The surface is sized to the preview. Rectangles are drawn in red with a
//! translucent red fill, freehand strokes in opaque green. Marks are
//! source-over blended into a single RGBA raster that starts fully
//! transparent, so color alone carries intent (see [`crate::resolver`]).
//!
//! Tool selection and brush width only affect the next mark. Nothing
//! already on the raster is touched when they change.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, Blend, BresenhamLineIter, Canvas,
};
use imageproc::rect::Rect;
use log::debug;

use crate::error::{Error, Result};
use crate::resolver::Intent;

/// Outline color of removal rectangles (`#ff0000`).
pub const REMOVAL_STROKE: Rgba<u8> = Rgba([255, 0, 0, 255]);
/// Fill color of removal rectangles (`rgba(255, 0, 0, 0.3)`).
pub const REMOVAL_FILL: Rgba<u8> = Rgba([255, 0, 0, 77]);
/// Color of restoration strokes (`#00ff00`).
pub const RESTORATION_STROKE: Rgba<u8> = Rgba([0, 255, 0, 255]);
/// Fill color paired with restoration strokes (`rgba(0, 255, 0, 0.3)`).
pub const RESTORATION_FILL: Rgba<u8> = Rgba([0, 255, 0, 77]);

/// Outline width of removal rectangles.
pub const RECT_STROKE_WIDTH: u32 = 2;
/// Narrowest freehand brush.
pub const MIN_BRUSH_WIDTH: u32 = 1;
/// Widest freehand brush.
pub const MAX_BRUSH_WIDTH: u32 = 50;
/// Freehand brush width until the user changes it.
pub const DEFAULT_BRUSH_WIDTH: u32 = 15;

/// Drawing mode of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Drag a rectangle to mark a region for removal.
    Rectangle,
    /// Paint freehand to mark pixels for restoration.
    Freehand,
}

impl Tool {
    /// The intent marks drawn with this tool resolve to.
    #[must_use]
    pub fn intent(self) -> Intent {
        match self {
            Tool::Rectangle => Intent::Remove,
            Tool::Freehand => Intent::Restore,
        }
    }
}

/// Appearance of the next mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSettings {
    /// Active drawing mode.
    pub tool: Tool,
    /// Outline (or brush) color.
    pub stroke: Rgba<u8>,
    /// Translucent fill color.
    pub fill: Rgba<u8>,
    /// Outline (or brush) width in preview pixels.
    pub stroke_width: u32,
}

impl ToolSettings {
    /// Settings for `tool`; `brush_width` only applies to [`Tool::Freehand`].
    #[must_use]
    pub fn for_tool(tool: Tool, brush_width: u32) -> Self {
        match tool {
            Tool::Rectangle => Self {
                tool,
                stroke: REMOVAL_STROKE,
                fill: REMOVAL_FILL,
                stroke_width: RECT_STROKE_WIDTH,
            },
            Tool::Freehand => Self {
                tool,
                stroke: RESTORATION_STROKE,
                fill: RESTORATION_FILL,
                stroke_width: clamp_brush_width(brush_width),
            },
        }
    }
}

fn clamp_brush_width(width: u32) -> u32 {
    width.clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH)
}

/// Accumulating annotation raster at preview resolution.
pub struct AnnotationSurface {
    canvas: Blend<RgbaImage>,
    tool: Tool,
    brush_width: u32,
}

impl AnnotationSurface {
    /// Create an empty, fully transparent surface.
    ///
    /// Starts with the rectangle tool and the default brush width.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: Blend(RgbaImage::new(width, height)),
            tool: Tool::Rectangle,
            brush_width: DEFAULT_BRUSH_WIDTH,
        }
    }

    /// Adopt a raster emitted by an external drawing widget.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the raster is empty.
    pub fn from_raster(raster: RgbaImage) -> Result<Self> {
        if raster.width() == 0 || raster.height() == 0 {
            return Err(Error::DimensionMismatch {
                width: raster.width(),
                height: raster.height(),
                len: raster.as_raw().len(),
            });
        }
        Ok(Self {
            canvas: Blend(raster),
            tool: Tool::Rectangle,
            brush_width: DEFAULT_BRUSH_WIDTH,
        })
    }

    /// Switch the drawing mode. Existing marks are kept.
    pub fn select_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    /// The active drawing mode.
    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Set the freehand brush width, clamped to `1..=50`. Returns the width applied.
    pub fn set_brush_width(&mut self, width: u32) -> u32 {
        self.brush_width = clamp_brush_width(width);
        self.brush_width
    }

    /// The freehand brush width.
    #[must_use]
    pub fn brush_width(&self) -> u32 {
        self.brush_width
    }

    /// Appearance of the next mark.
    #[must_use]
    pub fn settings(&self) -> ToolSettings {
        ToolSettings::for_tool(self.tool, self.brush_width)
    }

    /// `(width, height)` of the raster.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.canvas.0.dimensions()
    }

    /// The current annotation raster.
    #[must_use]
    pub fn raster(&self) -> &RgbaImage {
        &self.canvas.0
    }

    /// Consume the surface, returning its raster.
    #[must_use]
    pub fn into_raster(self) -> RgbaImage {
        self.canvas.0
    }

    /// Whether nothing has been drawn.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.canvas.0.pixels().all(|p| p[3] == 0)
    }

    /// Drop every mark. Tool and brush width are kept.
    pub fn clear(&mut self) {
        let (w, h) = self.dimensions();
        self.canvas.0 = RgbaImage::new(w, h);
    }

    /// Draw a removal rectangle spanning two corners (inclusive).
    ///
    /// Corners may lie outside the raster; only the visible part is marked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolMismatch`] unless the rectangle tool is active.
    pub fn draw_rect(&mut self, corner_a: (i32, i32), corner_b: (i32, i32)) -> Result<()> {
        let settings = self.require(Tool::Rectangle)?;

        let x0 = i64::from(corner_a.0.min(corner_b.0));
        let y0 = i64::from(corner_a.1.min(corner_b.1));
        let x1 = i64::from(corner_a.0.max(corner_b.0));
        let y1 = i64::from(corner_a.1.max(corner_b.1));

        self.fill_clipped((x0, y0), (x1, y1), settings.fill);

        // Outline grows inward, one ring per pixel of stroke width.
        for inset in 0..i64::from(settings.stroke_width) {
            let (left, top) = (x0 + inset, y0 + inset);
            let (right, bottom) = (x1 - inset, y1 - inset);
            if left > right || top > bottom {
                break;
            }
            self.fill_clipped((left, top), (right, top), settings.stroke);
            self.fill_clipped((left, bottom), (right, bottom), settings.stroke);
            self.fill_clipped((left, top), (left, bottom), settings.stroke);
            self.fill_clipped((right, top), (right, bottom), settings.stroke);
        }

        debug!("removal rect ({x0},{y0})-({x1},{y1})");
        Ok(())
    }

    /// Draw a restoration stroke through `points` with the current brush.
    ///
    /// A single point stamps one dab. An empty slice draws nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolMismatch`] unless the freehand tool is active.
    pub fn draw_freehand(&mut self, points: &[(i32, i32)]) -> Result<()> {
        let settings = self.require(Tool::Freehand)?;
        #[allow(clippy::cast_possible_wrap)]
        let radius = (settings.stroke_width / 2) as i32;

        match points {
            [] => return Ok(()),
            [only] => self.dab(*only, radius, settings.stroke),
            _ => {
                for segment in points.windows(2) {
                    self.stroke_segment(segment[0], segment[1], radius, settings.stroke);
                }
            }
        }

        debug!(
            "restoration stroke: {} points, width {}",
            points.len(),
            settings.stroke_width
        );
        Ok(())
    }

    fn require(&self, tool: Tool) -> Result<ToolSettings> {
        if self.tool == tool {
            Ok(self.settings())
        } else {
            Err(Error::ToolMismatch {
                expected: tool,
                active: self.tool,
            })
        }
    }

    /// Blend `color` over the inclusive box `min..=max`, clipped to the raster.
    fn fill_clipped(&mut self, min: (i64, i64), max: (i64, i64), color: Rgba<u8>) {
        let (w, h) = self.dimensions();
        let x0 = min.0.max(0);
        let y0 = min.1.max(0);
        let x1 = max.0.min(i64::from(w) - 1);
        let y1 = max.1.min(i64::from(h) - 1);
        if x0 > x1 || y0 > y1 {
            return;
        }
        // Clipped coordinates lie within the raster, so they fit both i32 and u32.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rect = Rect::at(x0 as i32, y0 as i32)
            .of_size((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32);
        draw_filled_rect_mut(&mut self.canvas, rect, color);
    }

    /// Stamp dabs along the line from `from` to `to`.
    fn stroke_segment(&mut self, from: (i32, i32), to: (i32, i32), radius: i32, color: Rgba<u8>) {
        let (w, h) = self.dimensions();
        let margin = f64::from(radius) + 1.0;
        let min = (-margin, -margin);
        let max = (f64::from(w) - 1.0 + margin, f64::from(h) - 1.0 + margin);

        let Some((start, end)) = clip_segment(from, to, min, max) else {
            return;
        };
        for point in BresenhamLineIter::new(start, end) {
            self.dab(point, radius, color);
        }
    }

    fn dab(&mut self, center: (i32, i32), radius: i32, color: Rgba<u8>) {
        if radius > 0 {
            draw_filled_circle_mut(&mut self.canvas, center, radius, color);
            return;
        }
        let (w, h) = self.dimensions();
        if let (Ok(x), Ok(y)) = (u32::try_from(center.0), u32::try_from(center.1)) {
            if x < w && y < h {
                self.canvas.draw_pixel(x, y, color);
            }
        }
    }
}

/// Clip a segment to the box `min..=max` (Liang-Barsky).
///
/// Returns `None` when no part of the segment lies inside the box.
fn clip_segment(
    from: (i32, i32),
    to: (i32, i32),
    min: (f64, f64),
    max: (f64, f64),
) -> Option<((f32, f32), (f32, f32))> {
    let (x0, y0) = (f64::from(from.0), f64::from(from.1));
    let dx = f64::from(to.0) - x0;
    let dy = f64::from(to.1) - y0;

    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (p, q) in [
        (-dx, x0 - min.0),
        (dx, max.0 - x0),
        (-dy, y0 - min.1),
        (dy, max.1 - y0),
    ] {
        if p.abs() < f64::EPSILON {
            // Parallel to this edge: inside or entirely out.
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    let point = |t: f64| ((x0 + t * dx).round() as f32, (y0 + t * dy).round() as f32);
    Some((point(t0), point(t1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Intent;

    fn intent_at(surface: &AnnotationSurface, x: u32, y: u32) -> Intent {
        Intent::classify(surface.raster().get_pixel(x, y))
    }

    #[test]
    fn new_surface_is_blank() {
        let surface = AnnotationSurface::new(40, 30);
        assert_eq!(surface.dimensions(), (40, 30));
        assert!(surface.is_blank());
        assert_eq!(surface.tool(), Tool::Rectangle);
        assert_eq!(surface.brush_width(), DEFAULT_BRUSH_WIDTH);
    }

    #[test]
    fn tool_settings_follow_tool() {
        let rect = ToolSettings::for_tool(Tool::Rectangle, 40);
        assert_eq!(rect.stroke, REMOVAL_STROKE);
        assert_eq!(rect.fill, REMOVAL_FILL);
        assert_eq!(rect.stroke_width, RECT_STROKE_WIDTH);

        let pen = ToolSettings::for_tool(Tool::Freehand, 40);
        assert_eq!(pen.stroke, RESTORATION_STROKE);
        assert_eq!(pen.stroke_width, 40);
        assert_eq!(Tool::Freehand.intent(), Intent::Restore);
        assert_eq!(Tool::Rectangle.intent(), Intent::Remove);
    }

    #[test]
    fn brush_width_is_clamped() {
        let mut surface = AnnotationSurface::new(10, 10);
        assert_eq!(surface.set_brush_width(0), MIN_BRUSH_WIDTH);
        assert_eq!(surface.set_brush_width(500), MAX_BRUSH_WIDTH);
        assert_eq!(surface.set_brush_width(7), 7);
    }

    #[test]
    fn rect_marks_interior_and_outline_for_removal() {
        let mut surface = AnnotationSurface::new(50, 50);
        surface.draw_rect((30, 30), (10, 10)).unwrap();

        // Two-pixel outline is opaque.
        for (x, y) in [(10, 10), (11, 11), (30, 30), (29, 20)] {
            let px = surface.raster().get_pixel(x, y);
            assert_eq!(intent_at(&surface, x, y), Intent::Remove);
            assert!(px[3] > 250, "outline at ({x},{y}) is {px:?}");
        }
        // Interior carries the translucent fill.
        let inner = surface.raster().get_pixel(20, 20);
        assert_eq!(intent_at(&surface, 20, 20), Intent::Remove);
        assert!(inner[3] > 0 && inner[3] < 100, "fill is {inner:?}");
        // Outside is untouched.
        assert_eq!(intent_at(&surface, 9, 9), Intent::Keep);
        assert_eq!(intent_at(&surface, 31, 20), Intent::Keep);
    }

    #[test]
    fn freehand_paints_opaque_green_with_brush_width() {
        let mut surface = AnnotationSurface::new(60, 60);
        surface.select_tool(Tool::Freehand);
        surface.set_brush_width(10);
        surface.draw_freehand(&[(10, 30), (50, 30)]).unwrap();

        assert_eq!(*surface.raster().get_pixel(30, 30), RESTORATION_STROKE);
        assert_eq!(intent_at(&surface, 30, 34), Intent::Restore);
        assert_eq!(intent_at(&surface, 30, 40), Intent::Keep);
    }

    #[test]
    fn thinnest_brush_stamps_single_pixels() {
        let mut surface = AnnotationSurface::new(10, 10);
        surface.select_tool(Tool::Freehand);
        surface.set_brush_width(1);
        surface.draw_freehand(&[(2, 2), (5, 2)]).unwrap();
        surface.draw_freehand(&[(-3, 40)]).unwrap();

        for x in 2..=5 {
            assert_eq!(intent_at(&surface, x, 2), Intent::Restore);
        }
        assert_eq!(intent_at(&surface, 2, 3), Intent::Keep);
    }

    #[test]
    fn switching_tools_keeps_prior_marks() {
        let mut surface = AnnotationSurface::new(40, 40);
        surface.draw_rect((5, 5), (15, 15)).unwrap();
        let after_rect = surface.raster().clone();

        surface.select_tool(Tool::Freehand);
        surface.set_brush_width(3);
        assert_eq!(surface.raster(), &after_rect);

        surface.draw_freehand(&[(30, 30)]).unwrap();
        surface.select_tool(Tool::Rectangle);
        assert_eq!(intent_at(&surface, 10, 10), Intent::Remove);
        assert_eq!(intent_at(&surface, 30, 30), Intent::Restore);
    }

    #[test]
    fn green_over_red_fill_restores() {
        let mut surface = AnnotationSurface::new(40, 40);
        surface.draw_rect((0, 0), (39, 39)).unwrap();
        surface.select_tool(Tool::Freehand);
        surface.set_brush_width(4);
        surface.draw_freehand(&[(20, 20)]).unwrap();

        assert_eq!(intent_at(&surface, 20, 20), Intent::Restore);
        assert_eq!(intent_at(&surface, 10, 10), Intent::Remove);
    }

    #[test]
    fn red_fill_over_green_still_restores() {
        let mut surface = AnnotationSurface::new(40, 40);
        surface.select_tool(Tool::Freehand);
        surface.draw_freehand(&[(20, 20)]).unwrap();
        surface.select_tool(Tool::Rectangle);
        surface.draw_rect((0, 0), (39, 39)).unwrap();

        // Translucent red blended over green keeps some green.
        assert_eq!(intent_at(&surface, 20, 20), Intent::Restore);
    }

    #[test]
    fn drawing_with_wrong_tool_is_rejected() {
        let mut surface = AnnotationSurface::new(10, 10);
        assert!(matches!(
            surface.draw_freehand(&[(1, 1)]),
            Err(Error::ToolMismatch {
                expected: Tool::Freehand,
                active: Tool::Rectangle
            })
        ));
        surface.select_tool(Tool::Freehand);
        assert!(surface.draw_rect((0, 0), (3, 3)).is_err());
        assert!(surface.is_blank());
    }

    #[test]
    fn clear_drops_marks_but_keeps_tool() {
        let mut surface = AnnotationSurface::new(10, 10);
        surface.select_tool(Tool::Freehand);
        surface.draw_freehand(&[(5, 5)]).unwrap();
        assert!(!surface.is_blank());

        surface.clear();
        assert!(surface.is_blank());
        assert_eq!(surface.tool(), Tool::Freehand);
    }

    #[test]
    fn long_stroke_across_tall_surface() {
        let mut surface = AnnotationSurface::new(100, 60_000);
        surface.select_tool(Tool::Freehand);
        surface.set_brush_width(1);
        surface.draw_freehand(&[(5, 0), (5, 59_999)]).unwrap();

        for y in [0, 1, 30_000, 46_341, 59_999] {
            assert_eq!(intent_at(&surface, 5, y), Intent::Restore, "row {y}");
        }
        assert_eq!(intent_at(&surface, 6, 30_000), Intent::Keep);
    }

    #[test]
    fn stroke_with_extreme_endpoints_is_clipped() {
        let mut surface = AnnotationSurface::new(10, 10);
        surface.select_tool(Tool::Freehand);
        surface.set_brush_width(1);
        surface.draw_freehand(&[(i32::MIN, 5), (i32::MAX, 5)]).unwrap();
        surface.draw_freehand(&[(i32::MIN, i32::MIN), (-20, -20)]).unwrap();

        for x in 0..10 {
            assert_eq!(intent_at(&surface, x, 5), Intent::Restore);
            assert_eq!(intent_at(&surface, x, 4), Intent::Keep);
        }
        assert_eq!(intent_at(&surface, 0, 0), Intent::Keep);
    }

    #[test]
    fn rect_is_clipped_to_raster() {
        let mut surface = AnnotationSurface::new(10, 10);
        surface.draw_rect((-5, -5), (4, 4)).unwrap();

        assert_eq!(intent_at(&surface, 0, 0), Intent::Remove);
        assert_eq!(intent_at(&surface, 4, 4), Intent::Remove);
        assert!(surface.raster().get_pixel(4, 4)[3] > 250, "outline stays opaque");
        assert_eq!(intent_at(&surface, 5, 5), Intent::Keep);
        assert_eq!(intent_at(&surface, 0, 5), Intent::Keep);
    }

    #[test]
    fn rect_with_extreme_corners_does_not_overflow() {
        let mut surface = AnnotationSurface::new(10, 10);
        surface.draw_rect((-50, -50), (-10, -10)).unwrap();
        assert!(surface.is_blank());

        surface
            .draw_rect((i32::MIN, i32::MIN), (i32::MAX, i32::MAX))
            .unwrap();
        assert!(surface
            .raster()
            .pixels()
            .all(|p| Intent::classify(p) == Intent::Remove));
    }

    #[test]
    fn from_raster_rejects_empty() {
        assert!(AnnotationSurface::from_raster(RgbaImage::new(0, 3)).is_err());
        let surface = AnnotationSurface::from_raster(RgbaImage::new(4, 3)).unwrap();
        assert_eq!(surface.dimensions(), (4, 3));
    }
}
