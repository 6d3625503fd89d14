//! Session state types

use crate::api::LoginResponse;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// The authenticated identity held for one signed-in user.
///
/// A `Session` only exists fully populated; constructors refuse to build a
/// partial one.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a login response, or `None` if the response is
    /// missing the token or the user's identity.
    pub fn from_login(response: LoginResponse, issued_at: DateTime<Utc>) -> Option<Self> {
        let session = Self {
            user_id: response.user.id,
            display_name: response.user.name,
            email: response.user.email,
            token: response.token,
            issued_at,
        };
        session.is_well_formed().then_some(session)
    }

    pub fn is_well_formed(&self) -> bool {
        !self.token.trim().is_empty()
            && !self.user_id.trim().is_empty()
            && !self.display_name.trim().is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

/// Where a login attempt returns to if it fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOrigin {
    Anonymous,
    Expired,
}

/// Authentication state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No session
    #[default]
    Anonymous,

    /// Credential exchange in flight; only outcomes of `attempt` apply
    Authenticating { origin: LoginOrigin, attempt: Uuid },

    /// Signed in
    Authenticated(Session),

    /// Session ended by an authorization failure; settles into `Anonymous`
    Expired,
}

impl AuthState {
    pub fn status(&self) -> AuthStatus {
        match self {
            AuthState::Anonymous => AuthStatus::Anonymous,
            AuthState::Authenticating { .. } => AuthStatus::Authenticating,
            AuthState::Authenticated(_) => AuthStatus::Authenticated,
            AuthState::Expired => AuthStatus::Expired,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

impl From<LoginOrigin> for AuthState {
    fn from(origin: LoginOrigin) -> Self {
        match origin {
            LoginOrigin::Anonymous => AuthState::Anonymous,
            LoginOrigin::Expired => AuthState::Expired,
        }
    }
}

/// Data-free view of [`AuthState`], published to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Anonymous,
    Authenticating,
    Authenticated,
    Expired,
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthStatus::Anonymous => "anonymous",
            AuthStatus::Authenticating => "authenticating",
            AuthStatus::Authenticated => "authenticated",
            AuthStatus::Expired => "expired",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RemoteUser;

    fn response(token: &str, id: &str, name: &str) -> LoginResponse {
        LoginResponse {
            token: token.into(),
            user: RemoteUser {
                id: id.into(),
                name: name.into(),
                email: "a@b.com".into(),
            },
        }
    }

    #[test]
    fn complete_response_builds_session() {
        let session = Session::from_login(response("t1", "u1", "Ana"), Utc::now()).unwrap();
        assert_eq!(session.display_name, "Ana");
        assert_eq!(session.token, "t1");
    }

    #[test]
    fn missing_pieces_build_nothing() {
        assert!(Session::from_login(response("", "u1", "Ana"), Utc::now()).is_none());
        assert!(Session::from_login(response("t1", " ", "Ana"), Utc::now()).is_none());
        assert!(Session::from_login(response("t1", "u1", ""), Utc::now()).is_none());
    }

    #[test]
    fn debug_hides_token() {
        let session = Session::from_login(response("secret-token", "u1", "Ana"), Utc::now()).unwrap();
        assert!(!format!("{session:?}").contains("secret-token"));
    }
}
