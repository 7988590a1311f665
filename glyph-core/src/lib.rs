//! # Glyphpad Core
//!
//! Drawing, normalization and session logic for hand-drawn character
//! classification. Nothing here touches the network.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 glyph-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Stroke Surface   │  Input Events           │
//! │  - Brush strokes  │  - Touch / pointer      │
//! │  - Native raster  │  - Client → raster map  │
//! ├─────────────────────────────────────────────┤
//! │  Normalizer       │  Session                │
//! │  - Area average   │  - State machine        │
//! │  - Orientation    │  - Correlation token    │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod event;
pub mod normalize;
pub mod protocol;
pub mod raster;
pub mod session;
pub mod surface;

pub use error::{CoreError, CoreResult, SessionError, SessionResult};
pub use event::{InputEvent, PointerPhase, StrokeAction, TouchEvent, TouchPhase, TouchPoint};
pub use normalize::{normalize, NormalizedTensor, TARGET_SIDE};
pub use protocol::{
    FeedbackRecord, InferenceBody, InferenceRequest, InferenceResult, ModelKind, Verdict,
};
pub use raster::{CanvasRaster, Point, RawStroke, DEFAULT_BRUSH_WIDTH, DEFAULT_CANVAS_SIDE};
pub use session::{CaptureId, PendingCapture, Session, SessionState};
pub use surface::{StrokeSurface, SurfaceBounds};

/// Glyphpad core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
