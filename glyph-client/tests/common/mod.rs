//! Mock classifier service for integration tests.
//!
//! Wraps a wiremock server with the service's routes and hands out a
//! controller wired to it.

use std::time::Duration;

use glyph_client::{ClientConfig, HttpClient, SessionController};
use glyph_core::{Point, Session};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// A mock classifier service.
pub struct MockService {
    server: MockServer,
}

impl MockService {
    /// Start a service with no routes mounted.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Answer `POST /{endpoint}` with a prediction.
    pub async fn predicts(&self, endpoint: &str, label: &str, token: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/{endpoint}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"label": label, "img_name": token})),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer the next `POST /{endpoint}` only; later calls fall through to
    /// mocks mounted after this one.
    pub async fn predicts_once(&self, endpoint: &str, label: &str, token: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/{endpoint}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"label": label, "img_name": token})),
            )
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    /// Answer `POST /{endpoint}` with a status and plain body.
    pub async fn fails(&self, endpoint: &str, status: u16) {
        Mock::given(method("POST"))
            .and(path(format!("/{endpoint}")))
            .respond_with(ResponseTemplate::new(status).set_body_string("Inference failed"))
            .mount(&self.server)
            .await;
    }

    /// Answer `POST /{endpoint}` only after `delay`.
    pub async fn stalls(&self, endpoint: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(format!("/{endpoint}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"label": "late", "img_name": "late-token"}))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Accept `POST /feedback`.
    pub async fn accepts_feedback(&self) {
        Mock::given(method("POST"))
            .and(path("/feedback"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "feedback recorded"})),
            )
            .mount(&self.server)
            .await;
    }

    /// JSON bodies received on `route`, in arrival order.
    pub async fn bodies(&self, route: &str) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r: &&Request| r.url.path() == route)
            .map(|r| serde_json::from_slice(&r.body).expect("json body"))
            .collect()
    }

    /// Client pointed at this service.
    pub fn client(&self, timeout: Duration) -> HttpClient {
        HttpClient::new(&ClientConfig {
            api_base: self.server.uri(),
            timeout: Some(timeout),
        })
        .expect("client")
    }

    /// Controller holding `session`, pointed at this service.
    pub fn controller(&self, session: Session) -> SessionController<HttpClient> {
        SessionController::new(session, self.client(Duration::from_secs(5)))
    }
}

/// A session with a horizontal stroke across the middle of the default
/// surface (y = 140, x 20..260).
pub fn drawn_session() -> Session {
    let mut session = Session::default();
    session
        .replay(&[vec![Point::new(20.0, 140.0), Point::new(260.0, 140.0)]])
        .expect("replay");
    session
}
