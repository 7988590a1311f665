//! HTTP client for the classifier service.
//!
//! Speaks the service's JSON protocol: `POST /{cnninfer,rnninfer,lrinfer}`
//! for predictions and `POST /feedback` for verdicts. Nothing is retried; a
//! failed call is reported to the caller, who decides whether to try again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use glyph_core::{FeedbackRecord, InferenceRequest, InferenceResult};
use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Default service address.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur when talking to the classifier service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured base URL is invalid.
    #[error("invalid service URL: {0}")]
    InvalidUrl(String),
    /// Transport failed (connection refused, host down, timeout, etc.).
    #[error("service unreachable: {0}")]
    Network(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
    /// The response body did not have the expected shape.
    #[error("malformed service response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The remote calls a prediction cycle needs.
///
/// Implemented over HTTP by [`HttpClient`]; tests substitute fakes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Classify a normalized drawing.
    async fn infer(&self, request: &InferenceRequest) -> ClientResult<InferenceResult>;

    /// Report the user's verdict on a prediction.
    async fn submit_feedback(&self, record: &FeedbackRecord) -> ClientResult<()>;
}

/// Configuration for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the service.
    pub api_base: String,
    /// Per-request timeout; `None` waits for the transport to give up.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: None,
        }
    }
}

/// Banner returned by the service root.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    /// Human readable status message.
    pub message: String,
}

/// Asynchronous classifier client.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<InnerClient>,
}

struct InnerClient {
    http: Client,
    base: Url,
}

impl HttpClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the base URL is malformed.
    /// Returns [`ClientError::Network`] if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut base =
            Url::parse(&config.api_base).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.api_base.clone()));
        }
        // Endpoints are joined relative to the base, so it must end in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = Client::builder()
            .user_agent(concat!("glyphpad/", env!("CARGO_PKG_VERSION")))
            // Disable proxy detection to avoid macOS system-configuration panic
            .no_proxy();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(InnerClient {
                http: builder.build()?,
                base,
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    /// Fetch the service banner from `GET /`.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable, rejects the request or
    /// answers with an unexpected body.
    pub async fn health(&self) -> ClientResult<HealthStatus> {
        let response = self
            .inner
            .http
            .get(self.inner.base.clone())
            .send()
            .await?;
        let body = Self::success_body(response).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.inner
            .base
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }

    async fn success_body(response: Response) -> ClientResult<Vec<u8>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn infer(&self, request: &InferenceRequest) -> ClientResult<InferenceResult> {
        let url = self.endpoint(request.model.endpoint())?;
        tracing::debug!(%url, values = request.pixels.len(), "Sending inference request");

        let response = self
            .inner
            .http
            .post(url)
            .json(&request.body())
            .send()
            .await?;
        let body = Self::success_body(response).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn submit_feedback(&self, record: &FeedbackRecord) -> ClientResult<()> {
        let url = self.endpoint("feedback")?;
        tracing::debug!(%url, token = %record.correlation_token, "Sending feedback");

        let response = self.inner.http.post(url).json(record).send().await?;
        Self::success_body(response).await?;
        Ok(())
    }
}
