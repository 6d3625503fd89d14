//! API error types

use reqwest::StatusCode;
use thiserror::Error;

use super::Endpoint;

/// API error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    /// HTTP status, when the server answered at all
    pub status: Option<u16>,
    /// `message` came from the server's error body and is fit to show a user
    pub server_provided: bool,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            server_provided: false,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::SessionExpired, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NetworkFailure, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unknown, message)
    }

    /// Classify a non-success response from `endpoint`.
    ///
    /// The same status means different things depending on where it came
    /// from: a 401 from the login endpoint is a rejected password, a 401 from
    /// a protected endpoint is an expired session.
    pub fn from_status(endpoint: Endpoint, status: StatusCode, body: &str) -> Self {
        let detail = server_message(body);
        let server_provided = detail.is_some();
        let message = detail.unwrap_or_else(|| format!("HTTP {status}"));
        let kind = match (endpoint, status.as_u16()) {
            (Endpoint::Login, 400 | 401 | 403 | 404) => ApiErrorKind::InvalidCredentials,
            (Endpoint::Register, 400 | 409 | 422) => ApiErrorKind::ValidationError,
            (Endpoint::History | Endpoint::SendMessage, 401) => ApiErrorKind::SessionExpired,
            _ => ApiErrorKind::Unknown,
        };
        let mut err = Self::new(kind, message).with_status(status.as_u16());
        err.server_provided = server_provided;
        err
    }

    /// Text suitable for a notification
    pub fn user_text(&self) -> String {
        match self.kind {
            ApiErrorKind::NetworkFailure => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ApiErrorKind::SessionExpired => SESSION_EXPIRED_TEXT.to_string(),
            _ if self.server_provided => self.message.clone(),
            ApiErrorKind::InvalidCredentials => "Invalid email or password.".to_string(),
            ApiErrorKind::ValidationError => "The registration details were rejected.".to_string(),
            ApiErrorKind::Unknown => "Something went wrong. Please try again.".to_string(),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        self.kind == ApiErrorKind::SessionExpired
    }
}

/// Shown when a session ends involuntarily
pub const SESSION_EXPIRED_TEXT: &str = "Your session has expired. Please sign in again.";

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Login rejected - user-correctable
    InvalidCredentials,
    /// Registration input rejected server-side
    ValidationError,
    /// 401 on a protected call
    SessionExpired,
    /// Request could not complete
    NetworkFailure,
    /// Unclassified server error
    Unknown,
}

impl ApiErrorKind {
    /// Whether the session survives this failure. Everything except an
    /// expiry leaves the user free to retry.
    pub fn keeps_session(self) -> bool {
        !matches!(self, Self::SessionExpired)
    }
}

/// Pull the `{"message": "..."}` text out of an error body, if the server sent one
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value.get("message")?.as_str()?.trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}
