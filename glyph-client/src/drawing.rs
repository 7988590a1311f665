//! Drawing input and preview output for the command-line front end.
//!
//! Drawings come either as recorded strokes (JSON, raster coordinates) that
//! are replayed through the session like live input, or as an image that is
//! scaled onto the surface directly.

use std::path::Path;

use glyph_core::{
    CanvasRaster, CoreError, NormalizedTensor, RawStroke, Session, SessionError, StrokeSurface,
};
use image::imageops::FilterType;
use thiserror::Error;

/// Errors reading a drawing or writing a preview.
#[derive(Debug, Error)]
pub enum InputError {
    /// File could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Strokes file was not valid JSON of the expected shape.
    #[error("invalid strokes file: {0}")]
    Strokes(#[from] serde_json::Error),
    /// Image could not be decoded or encoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    /// Raster had an unusable shape.
    #[error(transparent)]
    Raster(#[from] CoreError),
    /// Strokes could not be replayed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Read recorded strokes: `[[{"x": .., "y": ..}, ..], ..]`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_strokes(path: &Path) -> Result<Vec<RawStroke>, InputError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Build a session by replaying recorded strokes.
///
/// # Errors
///
/// Returns an error if the strokes cannot be replayed.
pub fn session_from_strokes(
    strokes: &[RawStroke],
    side: u32,
    brush_width: f32,
) -> Result<Session, InputError> {
    let mut session = Session::new(side, brush_width);
    session.replay(strokes)?;
    tracing::debug!(strokes = strokes.len(), "Replayed strokes");
    Ok(session)
}

/// Load an image as a `side × side` raster.
///
/// Images are expected white-on-black; pass `invert` for dark ink on a light
/// background. Non-square or differently sized images are stretched.
///
/// # Errors
///
/// Returns an error if the image cannot be opened or decoded.
pub fn load_image(path: &Path, side: u32, invert: bool) -> Result<CanvasRaster, InputError> {
    let mut rgba = image::open(path)?.to_rgba8();
    if rgba.dimensions() != (side, side) {
        tracing::debug!(
            from = ?rgba.dimensions(),
            to = side,
            "Scaling image onto surface"
        );
        rgba = image::imageops::resize(&rgba, side, side, FilterType::Triangle);
    }

    // Composite onto the opaque background so transparent regions read as empty.
    for px in rgba.pixels_mut() {
        let alpha = u16::from(px.0[3]);
        for c in &mut px.0[..3] {
            let v = if invert { 255 - *c } else { *c };
            #[allow(clippy::cast_possible_truncation)]
            let premultiplied = (u16::from(v) * alpha / 255) as u8;
            *c = premultiplied;
        }
        px.0[3] = 255;
    }

    Ok(CanvasRaster::from_image(rgba))
}

/// Build a session whose surface holds an imported image.
///
/// # Errors
///
/// Returns an error if the image cannot be loaded.
pub fn session_from_image(
    path: &Path,
    side: u32,
    brush_width: f32,
    invert: bool,
) -> Result<Session, InputError> {
    let raster = load_image(path, side, invert)?;
    let surface = StrokeSurface::with_raster(raster, brush_width)?;
    Ok(Session::with_surface(surface))
}

/// Write the normalized tensor as a grayscale PNG.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_preview(tensor: &NormalizedTensor, path: &Path) -> Result<(), InputError> {
    tensor.to_preview_image().save(path)?;
    tracing::info!(path = %path.display(), "Preview written");
    Ok(())
}
