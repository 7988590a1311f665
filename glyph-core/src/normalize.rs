//! Raster normalization into the classifier's input layout.
//!
//! The pipeline is fixed: area-averaged down-sample, luminance reduction to
//! `[0, 1]`, transpose composed with a mirror, then a row-major flatten of the
//! corrected grid. The classifier was trained on column-major, mirrored
//! glyphs; getting the orientation step wrong still yields plausible labels,
//! so its index law is covered directly by tests.

use crate::error::{CoreError, CoreResult};
use crate::raster::CanvasRaster;

/// Side length the classifier expects.
pub const TARGET_SIDE: u32 = 28;

/// Rec. 601 luma weights, in thousandths.
const LUMA: [f32; 3] = [299.0, 587.0, 114.0];

/// Flat `side × side` grid of intensities in `[0, 1]`.
///
/// Index order follows the classifier's orientation convention, not screen
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    side: u32,
    values: Vec<f32>,
}

impl NormalizedTensor {
    /// Side length of the square grid.
    #[must_use]
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Number of values (`side²`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the tensor holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in wire order.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Value at a row/column of the corrected grid.
    #[must_use]
    pub fn get(&self, row: u32, col: u32) -> Option<f32> {
        if row >= self.side || col >= self.side {
            return None;
        }
        self.values
            .get((row as usize) * (self.side as usize) + col as usize)
            .copied()
    }

    /// Sum of all values, a rough measure of stroke coverage.
    #[must_use]
    pub fn sum(&self) -> f32 {
        self.values.iter().sum()
    }

    /// Render the tensor as an 8-bit grayscale image in wire order.
    ///
    /// This is the image the service keeps per request for auditing.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_preview_image(&self) -> image::GrayImage {
        let pixels = self
            .values
            .iter()
            .map(|v| (v * 255.0).round() as u8)
            .collect();
        image::GrayImage::from_raw(self.side, self.side, pixels)
            .unwrap_or_else(|| image::GrayImage::new(self.side, self.side))
    }
}

/// Normalize a square native raster into a `target_side²` tensor.
///
/// # Errors
///
/// Returns [`CoreError::InvalidRaster`] if either side is zero or the raster
/// is not `source_side × source_side`.
pub fn normalize(
    raster: &CanvasRaster,
    source_side: u32,
    target_side: u32,
) -> CoreResult<NormalizedTensor> {
    if source_side == 0 || target_side == 0 {
        return Err(CoreError::InvalidRaster(format!(
            "sides must be positive (source {source_side}, target {target_side})"
        )));
    }
    if raster.width() != source_side || raster.height() != source_side {
        return Err(CoreError::InvalidRaster(format!(
            "expected {source_side}x{source_side} raster, got {}x{}",
            raster.width(),
            raster.height()
        )));
    }

    let small = downsample(raster, source_side, target_side);
    let intensity: Vec<f32> = small.iter().map(|&rgb| luminance(rgb)).collect();
    let values = orient(&intensity, target_side as usize);

    Ok(NormalizedTensor {
        side: target_side,
        values,
    })
}

/// Area-average the raster to `dst × dst` premultiplied RGB cells.
fn downsample(raster: &CanvasRaster, src: u32, dst: u32) -> Vec<[f32; 3]> {
    let weights = axis_weights(src, dst);
    #[allow(clippy::cast_possible_truncation)]
    let area = (f64::from(src) / f64::from(dst)).powi(2) as f32;
    let rgba = raster.as_rgba();
    let stride = src as usize;

    let mut out = Vec::with_capacity((dst as usize).pow(2));
    for row in &weights {
        for col in &weights {
            let mut acc = [0.0f32; 3];
            for &(sy, wy) in row {
                for &(sx, wx) in col {
                    let i = (sy * stride + sx) * 4;
                    let alpha = f32::from(rgba[i + 3]) / 255.0;
                    let w = wy * wx;
                    for (c, slot) in acc.iter_mut().enumerate() {
                        *slot += w * f32::from(rgba[i + c]) * alpha;
                    }
                }
            }
            out.push(acc.map(|v| v / area));
        }
    }
    out
}

/// For each destination index, the source indices it overlaps and by how much.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn axis_weights(src: u32, dst: u32) -> Vec<Vec<(usize, f32)>> {
    let scale = f64::from(src) / f64::from(dst);
    (0..dst)
        .map(|d| {
            let lo = f64::from(d) * scale;
            let hi = f64::from(d + 1) * scale;
            let (first, last) = (lo.floor() as u32, (hi.ceil() as u32).min(src));
            (first..last)
                .filter_map(|s| {
                    let overlap = hi.min(f64::from(s + 1)) - lo.max(f64::from(s));
                    (overlap > 0.0).then_some((s as usize, overlap as f32))
                })
                .collect()
        })
        .collect()
}

/// Collapse premultiplied RGB to a single channel in `[0, 1]`.
fn luminance(rgb: [f32; 3]) -> f32 {
    let y = (LUMA[0] * rgb[0] + LUMA[1] * rgb[1] + LUMA[2] * rgb[2]) / 1000.0;
    (y / 255.0).clamp(0.0, 1.0)
}

/// Transpose and mirror: `dst[x][side-1-y] = src[y][x]`, flattened row-major.
fn orient(src: &[f32], side: usize) -> Vec<f32> {
    let mut dst = vec![0.0; side * side];
    for y in 0..side {
        for x in 0..side {
            dst[x * side + (side - 1 - y)] = src[y * side + x];
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Point, DEFAULT_CANVAS_SIDE};
    use crate::surface::StrokeSurface;

    const S2: usize = TARGET_SIDE as usize;

    /// Light the native block that down-samples to grid cell (x0, y0).
    fn raster_with_block(x0: u32, y0: u32) -> CanvasRaster {
        let scale = DEFAULT_CANVAS_SIDE / TARGET_SIDE;
        let mut raster = CanvasRaster::blank(DEFAULT_CANVAS_SIDE);
        for y in y0 * scale..(y0 + 1) * scale {
            for x in x0 * scale..(x0 + 1) * scale {
                raster.paint(x, y, 1.0);
            }
        }
        raster
    }

    #[test]
    fn test_blank_raster_is_all_zero() {
        let raster = CanvasRaster::blank(DEFAULT_CANVAS_SIDE);
        let tensor = normalize(&raster, DEFAULT_CANVAS_SIDE, TARGET_SIDE).expect("normalize");
        assert_eq!(tensor.len(), S2 * S2);
        assert!(tensor.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_orientation_law_single_bright_cell() {
        for &(x0, y0) in &[(0u32, 0u32), (3, 17), (27, 0), (0, 27), (12, 5), (27, 27)] {
            let raster = raster_with_block(x0, y0);
            let tensor = normalize(&raster, DEFAULT_CANVAS_SIDE, TARGET_SIDE).expect("normalize");
            let expected = x0 as usize * S2 + (S2 - 1 - y0 as usize);

            for (i, &v) in tensor.as_slice().iter().enumerate() {
                if i == expected {
                    assert!((v - 1.0).abs() < 1e-6, "cell ({x0},{y0}) -> {i} = {v}");
                } else {
                    assert!(v == 0.0, "unexpected value {v} at {i} for ({x0},{y0})");
                }
            }
        }
    }

    #[test]
    fn test_orientation_without_resampling() {
        let mut raster = CanvasRaster::blank(TARGET_SIDE);
        raster.paint(4, 9, 1.0);
        let tensor = normalize(&raster, TARGET_SIDE, TARGET_SIDE).expect("normalize");
        assert_eq!(tensor.get(4, 27 - 9), Some(1.0));
        assert!((tensor.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_area_average_is_not_point_sampled() {
        // One lit native pixel inside a 10x10 block contributes a tenth of a tenth.
        let mut raster = CanvasRaster::blank(DEFAULT_CANVAS_SIDE);
        raster.paint(3, 3, 1.0);
        let tensor = normalize(&raster, DEFAULT_CANVAS_SIDE, TARGET_SIDE).expect("normalize");
        let v = tensor.get(0, S2 as u32 - 1).expect("in range");
        assert!((v - 0.01).abs() < 1e-5, "got {v}");
    }

    #[test]
    fn test_non_integer_ratio_preserves_mass() {
        let mut raster = CanvasRaster::blank(30);
        for y in 0..30 {
            for x in 0..30 {
                raster.paint(x, y, 1.0);
            }
        }
        let tensor = normalize(&raster, 30, TARGET_SIDE).expect("normalize");
        assert!(tensor.as_slice().iter().all(|&v| (v - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_transparent_pixels_read_as_background() {
        let data = [255u8, 255, 255, 0].repeat(28 * 28);
        let raster = CanvasRaster::from_rgba(28, 28, data).expect("raster");
        let tensor = normalize(&raster, 28, TARGET_SIDE).expect("normalize");
        assert!((tensor.sum()).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rejects_bad_sides() {
        let raster = CanvasRaster::blank(20);
        assert!(matches!(
            normalize(&raster, 0, TARGET_SIDE),
            Err(CoreError::InvalidRaster(_))
        ));
        assert!(matches!(
            normalize(&raster, 20, 0),
            Err(CoreError::InvalidRaster(_))
        ));
        assert!(matches!(
            normalize(&raster, 28, TARGET_SIDE),
            Err(CoreError::InvalidRaster(_))
        ));
    }

    #[test]
    fn test_preview_image_matches_values() {
        let tensor = normalize(&raster_with_block(2, 1), DEFAULT_CANVAS_SIDE, TARGET_SIDE)
            .expect("normalize");
        let preview = tensor.to_preview_image();
        assert_eq!(preview.dimensions(), (TARGET_SIDE, TARGET_SIDE));
        // Row x0 = 2, column side-1-y0 = 26.
        assert_eq!(preview.get_pixel(26, 2).0[0], 255);
        assert_eq!(preview.get_pixel(0, 0).0[0], 0);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_stroke() -> impl Strategy<Value = Vec<Point>> {
            prop::collection::vec((0.0f32..280.0, 0.0f32..280.0), 1..12)
                .prop_map(|pts| pts.into_iter().map(|(x, y)| Point::new(x, y)).collect())
        }

        proptest! {
            #[test]
            fn prop_in_bounds_strokes_yield_unit_range(
                strokes in prop::collection::vec(arb_stroke(), 0..4)
            ) {
                let mut surface = StrokeSurface::default();
                surface.replay(&strokes);

                let tensor = normalize(surface.snapshot(), DEFAULT_CANVAS_SIDE, TARGET_SIDE)
                    .expect("normalize");

                prop_assert_eq!(tensor.len(), S2 * S2);
                prop_assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
            }

            #[test]
            fn prop_normalize_is_deterministic(
                strokes in prop::collection::vec(arb_stroke(), 1..3)
            ) {
                let mut surface = StrokeSurface::default();
                surface.replay(&strokes);

                let a = normalize(surface.snapshot(), DEFAULT_CANVAS_SIDE, TARGET_SIDE)
                    .expect("normalize");
                let b = normalize(surface.snapshot(), DEFAULT_CANVAS_SIDE, TARGET_SIDE)
                    .expect("normalize");

                let bits_a: Vec<u32> = a.as_slice().iter().map(|v| v.to_bits()).collect();
                let bits_b: Vec<u32> = b.as_slice().iter().map(|v| v.to_bits()).collect();
                prop_assert_eq!(bits_a, bits_b);
            }
        }
    }
}
