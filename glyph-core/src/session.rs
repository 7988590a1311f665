//! Session state for one draw → predict → feedback cycle.
//!
//! The session owns the stroke surface, the state machine and the live
//! correlation token. Network calls happen outside; callers start a capture,
//! perform the call, and report the outcome back with the capture id so that
//! late responses for cancelled captures are discarded.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::event::{InputEvent, StrokeAction};
use crate::normalize::{normalize, TARGET_SIDE};
use crate::protocol::{FeedbackRecord, InferenceRequest, InferenceResult, ModelKind, Verdict};
use crate::raster::{Point, DEFAULT_BRUSH_WIDTH, DEFAULT_CANVAS_SIDE};
use crate::surface::{StrokeSurface, SurfaceBounds};

/// Where the session is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing drawn since the last completed cycle.
    Idle,
    /// A stroke is in progress.
    Drawing,
    /// A drawing is ready to capture.
    Ready,
    /// A prediction request is in flight.
    AwaitingPrediction,
    /// A label is shown and awaits the user's verdict.
    Confirming,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Drawing => "drawing",
            Self::Ready => "ready",
            Self::AwaitingPrediction => "awaiting a prediction",
            Self::Confirming => "confirming a prediction",
        })
    }
}

/// Identifies one capture so its response can be matched or discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureId(Uuid);

impl CaptureId {
    /// Create a new unique capture ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CaptureId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A capture that has been normalized and awaits its network call.
#[derive(Debug, Clone)]
pub struct PendingCapture {
    /// Id to report the outcome with.
    pub id: CaptureId,
    /// Request to send.
    pub request: InferenceRequest,
}

/// The drawing session.
#[derive(Debug, Clone)]
pub struct Session {
    surface: StrokeSurface,
    state: SessionState,
    in_flight: Option<CaptureId>,
    label: Option<String>,
    token: Option<String>,
}

impl Session {
    /// Create a session with a blank surface of the given side and brush width.
    #[must_use]
    pub fn new(side: u32, brush_width: f32) -> Self {
        Self::with_surface(StrokeSurface::new(side, brush_width))
    }

    /// Create a session around an existing surface.
    ///
    /// A surface that already holds strokes starts out ready to capture.
    #[must_use]
    pub fn with_surface(mut surface: StrokeSurface) -> Self {
        surface.end();
        let state = if surface.snapshot().is_blank() {
            SessionState::Idle
        } else {
            SessionState::Ready
        };
        Self {
            surface,
            state,
            in_flight: None,
            label: None,
            token: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Label of the prediction being confirmed.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Live correlation token, if feedback can still be sent.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Id of the capture in flight.
    #[must_use]
    pub fn in_flight(&self) -> Option<CaptureId> {
        self.in_flight
    }

    /// The drawing surface.
    #[must_use]
    pub fn surface(&self) -> &StrokeSurface {
        &self.surface
    }

    /// Update where the surface sits on screen.
    pub fn set_bounds(&mut self, bounds: SurfaceBounds) {
        self.surface.set_bounds(bounds);
    }

    /// Whether a capture may start now.
    #[must_use]
    pub fn can_capture(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Whether feedback may be submitted now.
    #[must_use]
    pub fn can_submit_feedback(&self) -> bool {
        self.state == SessionState::Confirming && self.token.is_some()
    }

    /// Whether the surface may be cleared now.
    #[must_use]
    pub fn can_clear(&self) -> bool {
        self.state != SessionState::AwaitingPrediction
    }

    /// Start a stroke at a raster-space point.
    ///
    /// While a prediction is in flight the surface stays interactive but
    /// the state does not change.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] while a prediction is
    /// being confirmed.
    pub fn begin_stroke(&mut self, point: Point) -> SessionResult<()> {
        match self.state {
            SessionState::Idle | SessionState::Ready | SessionState::Drawing => {
                self.surface.begin(point);
                self.transition(SessionState::Drawing);
                Ok(())
            }
            SessionState::AwaitingPrediction => {
                self.surface.begin(point);
                Ok(())
            }
            SessionState::Confirming => Err(self.rejected("begin a stroke")),
        }
    }

    /// Extend the active stroke. No-op when no stroke is active.
    pub fn extend_stroke(&mut self, point: Point) {
        self.surface.extend(point);
    }

    /// Finish the active stroke.
    pub fn end_stroke(&mut self) {
        self.surface.end();
        if self.state == SessionState::Drawing {
            self.transition(SessionState::Ready);
        }
    }

    /// Apply an input event given in client coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the event starts a stroke while one is not allowed.
    pub fn handle_event(&mut self, event: &InputEvent) -> SessionResult<()> {
        let bounds = self.surface.bounds();
        let side = self.surface.side();
        match event.stroke_action() {
            Some(StrokeAction::Begin(p)) => self.begin_stroke(bounds.to_raster(p, side))?,
            Some(StrokeAction::Extend(p)) => self.extend_stroke(bounds.to_raster(p, side)),
            Some(StrokeAction::End) => self.end_stroke(),
            None => {}
        }
        Ok(())
    }

    /// Snapshot and normalize the drawing, entering `AwaitingPrediction`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless the session is
    /// ready, or [`SessionError::Normalize`] if the raster cannot be
    /// normalized (the session returns to ready).
    pub fn begin_capture(&mut self, model: ModelKind) -> SessionResult<PendingCapture> {
        if self.state != SessionState::Ready {
            return Err(self.rejected("capture"));
        }
        self.transition(SessionState::AwaitingPrediction);

        let side = self.surface.side();
        let pixels = match normalize(self.surface.snapshot(), side, TARGET_SIDE) {
            Ok(pixels) => pixels,
            Err(e) => {
                tracing::error!("Normalization failed, capture aborted: {e}");
                self.transition(SessionState::Ready);
                return Err(e.into());
            }
        };

        let id = CaptureId::new();
        self.in_flight = Some(id);
        tracing::info!(capture = %id, %model, coverage = pixels.sum(), "Capture started");
        Ok(PendingCapture {
            id,
            request: InferenceRequest { pixels, model },
        })
    }

    /// Apply a successful prediction.
    ///
    /// Returns `false` if the capture is no longer in flight (cancelled or
    /// superseded); the response is then discarded.
    pub fn resolve_capture(&mut self, id: CaptureId, result: InferenceResult) -> bool {
        if !self.is_current(id) {
            tracing::warn!(capture = %id, "Discarding late prediction");
            return false;
        }
        self.in_flight = None;
        self.surface.end();
        tracing::info!(capture = %id, label = %result.label, "Prediction received");
        self.label = Some(result.label);
        self.token = Some(result.correlation_token);
        self.transition(SessionState::Confirming);
        true
    }

    /// Apply a failed prediction, returning to ready with no token.
    ///
    /// Returns `false` if the capture is no longer in flight.
    pub fn fail_capture(&mut self, id: CaptureId) -> bool {
        if !self.is_current(id) {
            tracing::debug!(capture = %id, "Ignoring failure of stale capture");
            return false;
        }
        self.in_flight = None;
        self.token = None;
        self.label = None;
        self.return_to_drawing_or_ready();
        true
    }

    /// Abandon the capture in flight; its response will be discarded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] if nothing is in flight.
    pub fn cancel_capture(&mut self) -> SessionResult<()> {
        if self.state != SessionState::AwaitingPrediction {
            return Err(self.rejected("cancel a capture"));
        }
        if let Some(id) = self.in_flight.take() {
            tracing::info!(capture = %id, "Capture cancelled");
        }
        self.return_to_drawing_or_ready();
        Ok(())
    }

    /// Take the live token and build the feedback record for it.
    ///
    /// The token leaves the session, so a second submission for the same
    /// prediction is impossible.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] outside `Confirming`, or
    /// [`SessionError::NoLiveToken`] if feedback was already taken.
    pub fn begin_feedback(&mut self, verdict: Verdict) -> SessionResult<FeedbackRecord> {
        if self.state != SessionState::Confirming {
            return Err(self.rejected("submit feedback"));
        }
        let correlation_token = self.token.take().ok_or(SessionError::NoLiveToken)?;
        tracing::info!(token = %correlation_token, %verdict, "Feedback submitted");
        Ok(FeedbackRecord {
            correlation_token,
            verdict,
        })
    }

    /// Close the cycle after the feedback call, whatever its outcome.
    ///
    /// The raster is kept.
    pub fn finish_feedback(&mut self) {
        if self.state != SessionState::Confirming {
            return;
        }
        self.token = None;
        self.label = None;
        self.transition(SessionState::Idle);
    }

    /// Reset the surface and discard any pending prediction.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CaptureInFlight`] while a prediction is in
    /// flight; the request is not interrupted.
    pub fn clear(&mut self) -> SessionResult<()> {
        if self.state == SessionState::AwaitingPrediction {
            tracing::warn!("Clear rejected while a prediction is in flight");
            return Err(SessionError::CaptureInFlight);
        }
        self.surface.clear();
        self.label = None;
        self.token = None;
        self.transition(SessionState::Idle);
        Ok(())
    }

    /// Replay recorded strokes (raster coordinates) as user input.
    ///
    /// # Errors
    ///
    /// Returns an error if strokes cannot start in the current state.
    pub fn replay(&mut self, strokes: &[Vec<Point>]) -> SessionResult<()> {
        for stroke in strokes {
            let mut points = stroke.iter();
            let Some(&first) = points.next() else {
                continue;
            };
            self.begin_stroke(first)?;
            self.extend_stroke(first);
            for &p in points {
                self.extend_stroke(p);
            }
            self.end_stroke();
        }
        Ok(())
    }

    fn is_current(&self, id: CaptureId) -> bool {
        self.state == SessionState::AwaitingPrediction && self.in_flight == Some(id)
    }

    fn return_to_drawing_or_ready(&mut self) {
        if self.surface.is_drawing() {
            self.transition(SessionState::Drawing);
        } else {
            self.transition(SessionState::Ready);
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "Session transition");
            self.state = next;
        }
    }

    fn rejected(&self, action: &'static str) -> SessionError {
        tracing::warn!(state = %self.state, action, "Transition rejected");
        SessionError::InvalidTransition {
            state: self.state,
            action,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_SIDE, DEFAULT_BRUSH_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawn_session() -> Session {
        let mut session = Session::default();
        session
            .replay(&[vec![Point::new(60.0, 140.0), Point::new(220.0, 140.0)]])
            .expect("replay");
        session
    }

    fn prediction(label: &str, token: &str) -> InferenceResult {
        InferenceResult {
            label: label.into(),
            correlation_token: token.into(),
        }
    }

    #[test]
    fn test_stroke_lifecycle_states() {
        let mut session = Session::default();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.can_capture());

        session.begin_stroke(Point::new(10.0, 10.0)).expect("begin");
        assert_eq!(session.state(), SessionState::Drawing);
        session.extend_stroke(Point::new(50.0, 50.0));
        session.end_stroke();
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.can_capture());
    }

    #[test]
    fn test_capture_then_resolve_enters_confirming() {
        let mut session = drawn_session();
        let pending = session.begin_capture(ModelKind::Cnn).expect("capture");
        assert_eq!(session.state(), SessionState::AwaitingPrediction);
        assert_eq!(pending.request.pixels.len(), 784);
        assert!(!session.can_capture());

        assert!(session.resolve_capture(pending.id, prediction("A", "abc123")));
        assert_eq!(session.state(), SessionState::Confirming);
        assert_eq!(session.label(), Some("A"));
        assert_eq!(session.token(), Some("abc123"));
    }

    #[test]
    fn test_capture_requires_ready() {
        let mut session = Session::default();
        let err = session.begin_capture(ModelKind::Rnn).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                state: SessionState::Idle,
                ..
            }
        ));
    }

    #[test]
    fn test_clear_rejected_while_awaiting() {
        let mut session = drawn_session();
        let pending = session.begin_capture(ModelKind::Cnn).expect("capture");
        assert!(!session.can_clear());
        assert!(matches!(session.clear(), Err(SessionError::CaptureInFlight)));
        assert_eq!(session.state(), SessionState::AwaitingPrediction);
        assert!(!session.surface().snapshot().is_blank());

        // The in-flight request still lands.
        assert!(session.resolve_capture(pending.id, prediction("B", "t1")));
    }

    #[test]
    fn test_failure_returns_to_ready_without_token() {
        let mut session = drawn_session();
        let before = session.surface().snapshot().clone();
        let pending = session.begin_capture(ModelKind::Cnn).expect("capture");

        assert!(session.fail_capture(pending.id));
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.token(), None);
        assert_eq!(session.surface().snapshot(), &before);
    }

    #[test]
    fn test_cancelled_capture_discards_late_response() {
        let mut session = drawn_session();
        let pending = session.begin_capture(ModelKind::Cnn).expect("capture");
        session.cancel_capture().expect("cancel");
        assert_eq!(session.state(), SessionState::Ready);

        assert!(!session.resolve_capture(pending.id, prediction("C", "late")));
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.token(), None);
    }

    #[test]
    fn test_stale_capture_id_does_not_resolve_new_capture() {
        let mut session = drawn_session();
        let first = session.begin_capture(ModelKind::Cnn).expect("capture");
        session.cancel_capture().expect("cancel");
        let second = session.begin_capture(ModelKind::Cnn).expect("capture");

        assert!(!session.resolve_capture(first.id, prediction("X", "old")));
        assert!(session.resolve_capture(second.id, prediction("Y", "new")));
        assert_eq!(session.token(), Some("new"));
    }

    #[test]
    fn test_feedback_consumes_token_once() {
        let mut session = drawn_session();
        let pending = session.begin_capture(ModelKind::Cnn).expect("capture");
        session.resolve_capture(pending.id, prediction("A", "abc123"));

        let record = session.begin_feedback(Verdict::Correct).expect("feedback");
        assert_eq!(record.correlation_token, "abc123");
        assert!(!session.can_submit_feedback());
        assert!(matches!(
            session.begin_feedback(Verdict::Correct),
            Err(SessionError::NoLiveToken)
        ));

        session.finish_feedback();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.label(), None);
        // Raster persists after the cycle.
        assert!(!session.surface().snapshot().is_blank());
        assert!(matches!(
            session.begin_feedback(Verdict::Incorrect),
            Err(SessionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_stroke_rejected_while_confirming() {
        let mut session = drawn_session();
        let pending = session.begin_capture(ModelKind::Cnn).expect("capture");
        session.resolve_capture(pending.id, prediction("A", "t"));
        assert!(session.begin_stroke(Point::new(1.0, 1.0)).is_err());
        assert_eq!(session.state(), SessionState::Confirming);
    }

    #[test]
    fn test_drawing_during_flight_keeps_state() {
        let mut session = drawn_session();
        let pending = session.begin_capture(ModelKind::Cnn).expect("capture");
        session.begin_stroke(Point::new(5.0, 5.0)).expect("begin");
        session.extend_stroke(Point::new(20.0, 5.0));
        assert_eq!(session.state(), SessionState::AwaitingPrediction);

        assert!(session.fail_capture(pending.id));
        assert_eq!(session.state(), SessionState::Drawing);
        session.end_stroke();
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_clear_discards_token() {
        let mut session = drawn_session();
        let pending = session.begin_capture(ModelKind::Cnn).expect("capture");
        session.resolve_capture(pending.id, prediction("A", "t"));

        session.clear().expect("clear");
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.token(), None);
        assert!(session.surface().snapshot().is_blank());
    }

    #[test]
    fn test_session_state_serializes_snake_case() {
        let json = serde_json::to_string(&SessionState::AwaitingPrediction).expect("serialize");
        assert_eq!(json, "\"awaiting_prediction\"");
    }
}
