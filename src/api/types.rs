//! Wire types for the assistant service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Remote API operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    Register,
    History,
    SendMessage,
}

/// HTTP method used by an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Endpoint {
    /// Path relative to the API base URL
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Login => "auth/login",
            Endpoint::Register => "auth/register",
            Endpoint::History => "chat/history",
            Endpoint::SendMessage => "chat/message",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Endpoint::History => Method::Get,
            Endpoint::Login | Endpoint::Register | Endpoint::SendMessage => Method::Post,
        }
    }

    /// Whether the endpoint requires the bearer credential
    pub fn is_protected(self) -> bool {
        matches!(self, Endpoint::History | Endpoint::SendMessage)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = match self.method() {
            Method::Get => "GET",
            Method::Post => "POST",
        };
        write!(f, "{method} /{}", self.path())
    }
}

/// A request handed to the transport, credential already resolved
#[derive(Clone)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    pub body: Option<serde_json::Value>,
    pub bearer: Option<String>,
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("endpoint", &self.endpoint)
            .field("has_body", &self.body.is_some())
            .field("authorized", &self.bearer.is_some())
            .finish()
    }
}

/// Raw transport response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Value returned by a protected call, tagged with the token it was made under
#[derive(Debug, Clone)]
pub struct Authorized<T> {
    pub token: String,
    pub value: T,
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: String,
    pub user: RemoteUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteUser {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Account details submitted on registration
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// Chat
// ============================================================================

/// Who wrote a history record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRecord {
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyResponse {
    pub message: String,
}

/// Accept ids serialized either as strings or as integers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_response_accepts_numeric_ids() {
        let parsed: LoginResponse =
            serde_json::from_str(r#"{"token":"t","user":{"id":42,"name":"Ana","email":"a@b.com"}}"#)
                .unwrap();
        assert_eq!(parsed.user.id, "42");
    }

    #[test]
    fn login_response_accepts_mongo_ids() {
        let parsed: LoginResponse =
            serde_json::from_str(r#"{"token":"t","user":{"_id":"abc","name":"Ana"}}"#).unwrap();
        assert_eq!(parsed.user.id, "abc");
        assert_eq!(parsed.user.email, "");
    }

    #[test]
    fn history_record_sender_mapping() {
        let records: Vec<HistoryRecord> = serde_json::from_str(
            r#"[{"content":"hi","sender":"user","timestamp":"2024-05-01T10:00:00Z"},
                {"content":"hello","sender":"ai","timestamp":"2024-05-01T10:00:01.500Z"}]"#,
        )
        .unwrap();
        assert_eq!(records[0].sender, Sender::User);
        assert_eq!(records[1].sender, Sender::Ai);
        assert!(records[0].timestamp < records[1].timestamp);
    }

    #[test]
    fn unknown_sender_is_rejected() {
        let parsed: Result<Vec<HistoryRecord>, _> = serde_json::from_str(
            r#"[{"content":"hi","sender":"system","timestamp":"2024-05-01T10:00:00Z"}]"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn debug_output_hides_passwords() {
        let req = LoginRequest {
            email: "a@b.com".into(),
            password: "secret1".into(),
        };
        let rendered = format!("{req:?}");
        assert!(rendered.contains("a@b.com"));
        assert!(!rendered.contains("secret1"));
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::Login.to_string(), "POST /auth/login");
        assert_eq!(Endpoint::History.to_string(), "GET /chat/history");
        assert!(Endpoint::SendMessage.is_protected());
        assert!(!Endpoint::Register.is_protected());
    }
}
