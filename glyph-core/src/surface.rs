//! The stroke surface: turns pointer drags into brush strokes on a raster.

use serde::{Deserialize, Serialize};
use tiny_skia::{Color, FillRule, LineCap, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::error::{CoreError, CoreResult};
use crate::event::{InputEvent, StrokeAction};
use crate::raster::{CanvasRaster, Point, RawStroke, DEFAULT_BRUSH_WIDTH, DEFAULT_CANVAS_SIDE};

/// On-screen bounding rectangle of the surface, in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceBounds {
    /// Left edge.
    pub left: f32,
    /// Top edge.
    pub top: f32,
    /// Displayed width.
    pub width: f32,
    /// Displayed height.
    pub height: f32,
}

impl SurfaceBounds {
    /// Bounds for a surface displayed at its native size at the origin.
    #[must_use]
    pub fn native(side: u32) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let side = side as f32;
        Self {
            left: 0.0,
            top: 0.0,
            width: side,
            height: side,
        }
    }

    /// Map a client position into raster space.
    ///
    /// Subtracts the on-screen offset and rescales when the surface is
    /// displayed at a size other than its raster side.
    #[must_use]
    pub fn to_raster(&self, client: Point, side: u32) -> Point {
        #[allow(clippy::cast_precision_loss)]
        let side = side as f32;
        let sx = if self.width > 0.0 { side / self.width } else { 1.0 };
        let sy = if self.height > 0.0 { side / self.height } else { 1.0 };
        Point::new((client.x - self.left) * sx, (client.y - self.top) * sy)
    }
}

/// Live drawing surface holding the native-resolution raster.
#[derive(Debug, Clone)]
pub struct StrokeSurface {
    raster: CanvasRaster,
    side: u32,
    brush_width: f32,
    bounds: SurfaceBounds,
    drawing: bool,
    last: Point,
    strokes: Vec<RawStroke>,
}

impl StrokeSurface {
    /// Create a blank surface with the given side and brush width.
    #[must_use]
    pub fn new(side: u32, brush_width: f32) -> Self {
        Self {
            raster: CanvasRaster::blank(side),
            side,
            brush_width,
            bounds: SurfaceBounds::native(side),
            drawing: false,
            last: Point::default(),
            strokes: Vec::new(),
        }
    }

    /// Create a surface over an existing square raster (e.g. an imported image).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRaster`] if the raster is not square.
    pub fn with_raster(raster: CanvasRaster, brush_width: f32) -> CoreResult<Self> {
        if raster.width() != raster.height() {
            return Err(CoreError::InvalidRaster(format!(
                "surface raster must be square, got {}x{}",
                raster.width(),
                raster.height()
            )));
        }
        let side = raster.width();
        Ok(Self {
            raster,
            side,
            brush_width,
            bounds: SurfaceBounds::native(side),
            drawing: false,
            last: Point::default(),
            strokes: Vec::new(),
        })
    }

    /// Update where the surface sits on screen.
    pub fn set_bounds(&mut self, bounds: SurfaceBounds) {
        self.bounds = bounds;
    }

    /// Current on-screen bounds.
    #[must_use]
    pub fn bounds(&self) -> SurfaceBounds {
        self.bounds
    }

    /// Raster side length in pixels.
    #[must_use]
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Whether a stroke is in progress.
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Strokes drawn since the last clear, in raster coordinates.
    #[must_use]
    pub fn strokes(&self) -> &[RawStroke] {
        &self.strokes
    }

    /// Start a stroke at a raster-space point.
    pub fn begin(&mut self, point: Point) {
        self.last = point;
        self.drawing = true;
        self.strokes.push(vec![point]);
        tracing::trace!(x = point.x, y = point.y, "stroke begin");
    }

    /// Paint a segment from the last point to `point`.
    ///
    /// Ignored when no stroke is active, so stray move events from
    /// overlapping touch and mouse input cannot paint.
    pub fn extend(&mut self, point: Point) {
        if !self.drawing {
            return;
        }
        let from = self.last;
        self.paint_segment(from, point);
        self.last = point;
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.push(point);
        }
    }

    /// Finish the active stroke.
    pub fn end(&mut self) {
        if self.drawing {
            tracing::trace!("stroke end");
        }
        self.drawing = false;
    }

    /// Reset the raster to background and forget recorded strokes.
    pub fn clear(&mut self) {
        self.raster.clear();
        self.strokes.clear();
        self.drawing = false;
    }

    /// Read-only view of the current raster.
    #[must_use]
    pub fn snapshot(&self) -> &CanvasRaster {
        &self.raster
    }

    /// Apply an input event given in client coordinates.
    pub fn handle_event(&mut self, event: &InputEvent) {
        match event.stroke_action() {
            Some(StrokeAction::Begin(p)) => self.begin(self.bounds.to_raster(p, self.side)),
            Some(StrokeAction::Extend(p)) => self.extend(self.bounds.to_raster(p, self.side)),
            Some(StrokeAction::End) => self.end(),
            None => {}
        }
    }

    /// Replay recorded strokes (raster coordinates) onto the surface.
    pub fn replay(&mut self, strokes: &[RawStroke]) {
        for stroke in strokes {
            let mut points = stroke.iter();
            let Some(&first) = points.next() else {
                continue;
            };
            self.begin(first);
            // A lone sample still leaves a round dot.
            self.extend(first);
            for &p in points {
                self.extend(p);
            }
            self.end();
        }
    }

    /// Stroke a round-capped, anti-aliased segment of the brush width.
    ///
    /// The segment is rendered into a scratch pixmap covering its bounding
    /// box and the pixmap's alpha is merged into the raster as coverage.
    fn paint_segment(&mut self, a: Point, b: Point) {
        let radius = self.brush_width / 2.0;
        let reach = radius + 1.0;
        let Some((x0, x1)) = span(a.x.min(b.x) - reach, a.x.max(b.x) + reach, self.side) else {
            return;
        };
        let Some((y0, y1)) = span(a.y.min(b.y) - reach, a.y.max(b.y) + reach, self.side) else {
            return;
        };
        let Some(mut pixmap) = Pixmap::new(x1 - x0, y1 - y0) else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(Color::WHITE);
        paint.anti_alias = true;
        #[allow(clippy::cast_precision_loss)]
        let transform = Transform::from_translate(-(x0 as f32), -(y0 as f32));

        if a == b {
            // Zero-length segment: a round dot.
            let Some(dot) = PathBuilder::from_circle(a.x, a.y, radius) else {
                return;
            };
            pixmap.fill_path(&dot, &paint, FillRule::Winding, transform, None);
        } else {
            let mut pb = PathBuilder::new();
            pb.move_to(a.x, a.y);
            pb.line_to(b.x, b.y);
            let Some(path) = pb.finish() else {
                return;
            };
            let stroke = Stroke {
                width: self.brush_width,
                line_cap: LineCap::Round,
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }

        let row_len = pixmap.width() as usize;
        for (y, row) in (y0..y1).zip(pixmap.pixels().chunks_exact(row_len)) {
            for (x, px) in (x0..x1).zip(row) {
                let alpha = px.alpha();
                if alpha > 0 {
                    self.raster.paint(x, y, f32::from(alpha) / 255.0);
                }
            }
        }
    }
}

impl Default for StrokeSurface {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_SIDE, DEFAULT_BRUSH_WIDTH)
    }
}

/// Clamp a float range to whole cells in `[0, side)`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn span(lo: f32, hi: f32, side: u32) -> Option<(u32, u32)> {
    let max = side as f32;
    let lo = lo.floor().max(0.0);
    let hi = (hi.ceil() + 1.0).min(max);
    if hi <= lo {
        return None;
    }
    Some((lo as u32, hi as u32))
}
