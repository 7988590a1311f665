//! Error types for drawing, normalization and session operations.

use thiserror::Error;

use crate::session::SessionState;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for session transitions.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Raster shape does not match what the caller declared.
    #[error("Invalid raster: {0}")]
    InvalidRaster(String),

    /// Model selector did not name a known model.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Verdict string was neither "correct" nor "incorrect".
    #[error("Unknown verdict: {0}")]
    UnknownVerdict(String),
}

/// Errors returned when a session transition is not permitted.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The requested action is not valid from the current state.
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        /// State the session was in.
        state: SessionState,
        /// Action that was attempted.
        action: &'static str,
    },

    /// The raster cannot be reset while a capture is in flight.
    #[error("Cannot clear the surface while a prediction is in flight")]
    CaptureInFlight,

    /// Feedback requires a correlation token from a prior prediction.
    #[error("No live prediction to attach feedback to")]
    NoLiveToken,

    /// The captured raster could not be normalized.
    #[error("Capture aborted: {0}")]
    Normalize(#[from] CoreError),
}
