//! Native-resolution raster owned by the stroke surface.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Side length of the drawing surface in pixels.
pub const DEFAULT_CANVAS_SIDE: u32 = 280;

/// Brush diameter in native pixels (about 3-4 px after down-sampling).
pub const DEFAULT_BRUSH_WIDTH: f32 = 12.0;

/// Bytes per RGBA pixel.
const CHANNELS: usize = 4;

/// Opaque black.
const BACKGROUND: [u8; 4] = [0, 0, 0, 255];

/// A position in raster space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Column, in pixels from the left edge.
    pub x: f32,
    /// Row, in pixels from the top edge.
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Ordered pointer samples making up one stroke.
pub type RawStroke = Vec<Point>;

/// RGBA pixel grid at native capture resolution.
///
/// Background is opaque black and the brush paints white, so every channel
/// of a painted cell carries the stroke coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasRaster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl CanvasRaster {
    /// Create a blank square raster.
    #[must_use]
    pub fn blank(side: u32) -> Self {
        let cells = (side as usize) * (side as usize);
        let mut data = Vec::with_capacity(cells * CHANNELS);
        for _ in 0..cells {
            data.extend_from_slice(&BACKGROUND);
        }
        Self {
            width: side,
            height: side,
            data,
        }
    }

    /// Wrap raw RGBA bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRaster`] if `data` is not exactly
    /// `width * height * 4` bytes.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> CoreResult<Self> {
        let expected = (width as usize) * (height as usize) * CHANNELS;
        if data.len() != expected {
            return Err(CoreError::InvalidRaster(format!(
                "{width}x{height} raster needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap a decoded image.
    #[must_use]
    pub fn from_image(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    /// Copy the raster into an image buffer for export.
    #[must_use]
    pub fn to_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| image::RgbaImage::new(self.width, self.height))
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    #[must_use]
    pub fn as_rgba(&self) -> &[u8] {
        &self.data
    }

    /// RGBA value of a cell, or `None` outside the raster.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Raise a cell's intensity to at least `coverage` (0.0 to 1.0).
    ///
    /// Painting never darkens a cell, so overlapping segments compose.
    pub fn paint(&mut self, x: u32, y: u32, coverage: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let level = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
        let i = self.offset(x, y);
        for c in &mut self.data[i..i + 3] {
            *c = (*c).max(level);
        }
        self.data[i + 3] = 255;
    }

    /// Reset every cell to the background value.
    pub fn clear(&mut self) {
        for px in self.data.chunks_exact_mut(CHANNELS) {
            px.copy_from_slice(&BACKGROUND);
        }
    }

    /// Check whether no cell has been painted.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.data
            .chunks_exact(CHANNELS)
            .all(|px| px[..3] == BACKGROUND[..3])
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * CHANNELS
    }
}
