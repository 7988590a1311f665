//! Input events for the drawing surface.
//!
//! Touch and pointer input arrive in client (screen) coordinates and are
//! reduced to a single stream of stroke phases before they reach the raster.

use serde::{Deserialize, Serialize};

use crate::raster::Point;

/// Phase of a touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    /// Touch started (finger down).
    Start,
    /// Touch moved (finger dragging).
    Move,
    /// Touch ended (finger up).
    End,
    /// Touch cancelled (e.g., palm rejection).
    Cancel,
}

/// A single touch point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Touch identifier (for multi-touch).
    pub id: u32,
    /// X position in client coordinates.
    pub x: f32,
    /// Y position in client coordinates.
    pub y: f32,
}

/// A touch event with one or more touch points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    /// Phase of this touch event.
    pub phase: TouchPhase,
    /// All current touch points.
    pub touches: Vec<TouchPoint>,
    /// Timestamp in milliseconds since the surface was created.
    pub timestamp_ms: u64,
}

impl TouchEvent {
    /// Create a new touch event.
    #[must_use]
    pub fn new(phase: TouchPhase, touches: Vec<TouchPoint>, timestamp_ms: u64) -> Self {
        Self {
            phase,
            touches,
            timestamp_ms,
        }
    }

    /// Get the primary (first) touch point.
    #[must_use]
    pub fn primary_touch(&self) -> Option<&TouchPoint> {
        self.touches.first()
    }
}

/// Phase of a pointer (mouse/pen) event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed.
    Down,
    /// Pointer moved.
    Move,
    /// Button released.
    Up,
    /// Pointer left the surface.
    Leave,
}

/// All input events the drawing surface can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// Raw touch event.
    Touch(TouchEvent),

    /// Pointer (mouse) event.
    Pointer {
        /// X coordinate in client space.
        x: f32,
        /// Y coordinate in client space.
        y: f32,
        /// What the pointer did.
        phase: PointerPhase,
    },
}

/// What an input event means for the stroke currently being drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokeAction {
    /// Start a stroke at the given client position.
    Begin(Point),
    /// Extend the active stroke to the given client position.
    Extend(Point),
    /// Finish the active stroke.
    End,
}

impl InputEvent {
    /// Reduce the event to a stroke action.
    ///
    /// Touch and pointer input are treated alike; when several touches are
    /// present the first one wins. Returns `None` for events that carry no
    /// usable position.
    #[must_use]
    pub fn stroke_action(&self) -> Option<StrokeAction> {
        match self {
            Self::Touch(touch) => match touch.phase {
                TouchPhase::End | TouchPhase::Cancel => Some(StrokeAction::End),
                TouchPhase::Start => touch
                    .primary_touch()
                    .map(|t| StrokeAction::Begin(Point::new(t.x, t.y))),
                TouchPhase::Move => touch
                    .primary_touch()
                    .map(|t| StrokeAction::Extend(Point::new(t.x, t.y))),
            },
            Self::Pointer { x, y, phase } => Some(match phase {
                PointerPhase::Down => StrokeAction::Begin(Point::new(*x, *y)),
                PointerPhase::Move => StrokeAction::Extend(Point::new(*x, *y)),
                PointerPhase::Up | PointerPhase::Leave => StrokeAction::End,
            }),
        }
    }
}
