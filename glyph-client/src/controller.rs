//! Async driver for a prediction cycle over a [`Transport`].

use std::sync::{Arc, PoisonError, RwLock};

use glyph_core::{
    CaptureId, InferenceResult, ModelKind, Session, SessionError, SessionState, Verdict,
};
use thiserror::Error;
use tracing::Instrument;

use crate::client::{ClientError, Transport};

/// Errors surfaced by [`SessionController`].
#[derive(Debug, Error)]
pub enum CycleError {
    /// The session did not allow the action.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The remote call failed; the session has already moved on.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// The capture was cancelled while its request was in flight, so the
    /// prediction that came back was dropped.
    #[error("prediction discarded: its capture was cancelled")]
    Discarded,
}

/// Shares a [`Session`] with the UI and performs its network calls.
///
/// The session lock is only held for synchronous transitions, never across a
/// network call, so the surface stays interactive while a request is
/// outstanding; what is allowed meanwhile is decided by the session's state.
///
/// Dropping a `capture` or `submit_feedback` future before it completes
/// settles the session as if the call had been cancelled: a capture returns
/// to `Ready` (any late response is never applied), a feedback call closes
/// the cycle.
pub struct SessionController<T> {
    session: Arc<RwLock<Session>>,
    transport: T,
}

impl<T: Transport> SessionController<T> {
    /// Create a controller around a session and transport.
    pub fn new(session: Session, transport: T) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            transport,
        }
    }

    /// Read the session.
    pub fn with_session<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        let session = self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&session)
    }

    /// Mutate the session, e.g. to feed drawing input.
    pub fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }

    /// The transport in use.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.with_session(Session::state)
    }

    /// Label of the prediction being confirmed.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.with_session(|s| s.label().map(str::to_string))
    }

    /// Live correlation token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.with_session(|s| s.token().map(str::to_string))
    }

    /// Normalize the drawing, request a prediction and enter `Confirming`.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError::Session`] if the session is not ready,
    /// [`CycleError::Client`] if the call fails (the session is back in
    /// `Ready` with no token), or [`CycleError::Discarded`] if the capture
    /// was cancelled before the prediction arrived.
    pub async fn capture(&self, model: ModelKind) -> Result<InferenceResult, CycleError> {
        let pending = self.update(|s| s.begin_capture(model))?;
        let id = pending.id;
        let span = tracing::info_span!("capture", capture = %id, %model);

        let mut guard = Settle::capture(&self.session, id);
        let outcome = self.transport.infer(&pending.request).instrument(span).await;
        guard.disarm();

        match outcome {
            Ok(result) => {
                if self.update(|s| s.resolve_capture(id, result.clone())) {
                    Ok(result)
                } else {
                    Err(CycleError::Discarded)
                }
            }
            Err(e) => {
                tracing::warn!(capture = %id, "Inference failed: {e}");
                self.update(|s| s.fail_capture(id));
                Err(e.into())
            }
        }
    }

    /// Send the verdict for the prediction being confirmed.
    ///
    /// The cycle closes whether or not the call succeeds. The token leaves
    /// the session when the call starts, so a verdict whose call fails is
    /// lost and cannot be resent.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError::Session`] if there is no live prediction, or
    /// [`CycleError::Client`] if the call fails.
    pub async fn submit_feedback(&self, verdict: Verdict) -> Result<(), CycleError> {
        let record = self.update(|s| s.begin_feedback(verdict))?;

        let mut guard = Settle::feedback(&self.session);
        let outcome = self.transport.submit_feedback(&record).await;
        guard.disarm();
        self.update(Session::finish_feedback);

        outcome.map_err(|e| {
            tracing::warn!(token = %record.correlation_token, "Feedback failed: {e}");
            e.into()
        })
    }

    /// Clear the surface.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CaptureInFlight`] while a capture is in flight.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.update(Session::clear)
    }
}

/// What to undo if a call is abandoned mid-flight.
enum Pending {
    Capture(CaptureId),
    Feedback,
}

/// Settles the session when a call future is dropped before completing.
struct Settle<'a> {
    session: &'a RwLock<Session>,
    pending: Option<Pending>,
}

impl<'a> Settle<'a> {
    fn capture(session: &'a RwLock<Session>, id: CaptureId) -> Self {
        Self {
            session,
            pending: Some(Pending::Capture(id)),
        }
    }

    fn feedback(session: &'a RwLock<Session>) -> Self {
        Self {
            session,
            pending: Some(Pending::Feedback),
        }
    }

    fn disarm(&mut self) {
        self.pending = None;
    }
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let mut session = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match pending {
            Pending::Capture(id) if session.in_flight() == Some(id) => {
                tracing::info!(capture = %id, "Capture abandoned");
                if let Err(e) = session.cancel_capture() {
                    tracing::warn!("Could not cancel abandoned capture: {e}");
                }
            }
            Pending::Feedback => session.finish_feedback(),
            Pending::Capture(_) => {}
        }
    }
}
