//! Remote API access
//!
//! [`Backend`] is the raw transport seam (mocked in tests); [`ApiClient`]
//! sits on top of it and is the only place that attaches credentials and
//! reacts to authorization failures.

mod error;
mod http;
mod types;

pub use error::{ApiError, ApiErrorKind, SESSION_EXPIRED_TEXT};
pub use http::HttpBackend;
pub use types::*;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Transport for API requests
#[async_trait]
pub trait Backend: Send + Sync {
    /// Perform one request. Only transport-level failures are errors; any
    /// HTTP status, including 4xx/5xx, comes back as a response.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

#[async_trait]
impl<T: Backend + ?Sized> Backend for Arc<T> {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        (**self).execute(request).await
    }
}

/// Returns the current bearer token, or `None` when not signed in
pub type CredentialProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Called with the token a protected request presented when it came back 401
pub type UnauthorizedHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Logging wrapper for transports
pub struct LoggingBackend {
    inner: Arc<dyn Backend>,
}

impl LoggingBackend {
    pub fn new(inner: Arc<dyn Backend>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Backend for LoggingBackend {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let endpoint = request.endpoint;
        let start = Instant::now();
        let result = self.inner.execute(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) if response.is_success() => {
                tracing::debug!(
                    endpoint = %endpoint,
                    status = response.status,
                    duration_ms = %duration.as_millis(),
                    "API request completed"
                );
            }
            Ok(response) => {
                tracing::warn!(
                    endpoint = %endpoint,
                    status = response.status,
                    duration_ms = %duration.as_millis(),
                    "API request rejected"
                );
            }
            Err(e) => {
                tracing::warn!(
                    endpoint = %endpoint,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    "API request failed"
                );
            }
        }

        result
    }
}

/// Typed client for the assistant service
pub struct ApiClient {
    backend: LoggingBackend,
    credentials: CredentialProvider,
    on_unauthorized: UnauthorizedHook,
}

impl ApiClient {
    pub fn new(
        backend: Arc<dyn Backend>,
        credentials: CredentialProvider,
        on_unauthorized: UnauthorizedHook,
    ) -> Self {
        Self {
            backend: LoggingBackend::new(backend),
            credentials,
            on_unauthorized,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.public(Endpoint::Login, &request).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<RegisterResponse, ApiError> {
        self.public(Endpoint::Register, registration).await
    }

    pub async fn history(&self) -> Result<Authorized<Vec<HistoryRecord>>, ApiError> {
        self.protected(Endpoint::History, None).await
    }

    pub async fn send_message(&self, text: &str) -> Result<Authorized<ReplyResponse>, ApiError> {
        let body = to_body(&SendMessageRequest {
            message: text.to_string(),
        })?;
        self.protected(Endpoint::SendMessage, Some(body)).await
    }

    async fn public<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug_assert!(!endpoint.is_protected());
        let request = ApiRequest {
            endpoint,
            body: Some(to_body(body)?),
            bearer: None,
        };
        let response = self.backend.execute(request).await?;
        decode(endpoint, &response)
    }

    async fn protected<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        body: Option<serde_json::Value>,
    ) -> Result<Authorized<T>, ApiError> {
        debug_assert!(endpoint.is_protected());
        // Fail closed: a protected call never goes out without a credential
        let Some(token) = (self.credentials)() else {
            return Err(ApiError::session_expired("Not signed in"));
        };

        let request = ApiRequest {
            endpoint,
            body,
            bearer: Some(token.clone()),
        };
        let response = self.backend.execute(request).await?;

        if response.status == StatusCode::UNAUTHORIZED.as_u16() {
            (self.on_unauthorized)(&token);
        }

        let value = decode(endpoint, &response)?;
        Ok(Authorized { token, value })
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::unknown(format!("Failed to encode request: {e}")))
}

fn decode<T: DeserializeOwned>(endpoint: Endpoint, response: &ApiResponse) -> Result<T, ApiError> {
    if !response.is_success() {
        let status =
            StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Err(ApiError::from_status(endpoint, status, &response.body));
    }

    serde_json::from_str(&response.body).map_err(|e| {
        ApiError::unknown(format!("Malformed {endpoint} response: {e}")).with_status(response.status)
    })
}
