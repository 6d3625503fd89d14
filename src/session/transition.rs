//! Pure state transition function
//!
//! Given the same state and event this always produces the same result and
//! performs no I/O. The manager applies the new state and runs the effects.

use super::{AuthState, AuthStatus, Effect, Event, LoginOrigin};
use crate::api::SESSION_EXPIRED_TEXT;
use thiserror::Error;
use uuid::Uuid;

pub const SIGNED_OUT_TEXT: &str = "You have signed out.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: AuthState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: AuthState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Stay in `state` and do nothing
    pub fn unchanged(state: &AuthState) -> Self {
        Self::new(state.clone())
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Already signed in (sign out first)")]
    AlreadyAuthenticated,
    #[error("Sign-in already in progress")]
    LoginInProgress,
    #[error("Discarded stale {0}")]
    Stale(&'static str),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(state: &AuthState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Login
        // ============================================================
        (AuthState::Anonymous, Event::LoginStarted { attempt }) => {
            Ok(begin_login(LoginOrigin::Anonymous, attempt))
        }
        (AuthState::Expired, Event::LoginStarted { attempt }) => {
            Ok(begin_login(LoginOrigin::Expired, attempt))
        }

        (AuthState::Authenticated(_), Event::LoginStarted { .. }) => {
            Err(TransitionError::AlreadyAuthenticated)
        }
        (AuthState::Authenticating { .. }, Event::LoginStarted { .. }) => {
            Err(TransitionError::LoginInProgress)
        }

        (
            AuthState::Authenticating { attempt, .. },
            Event::LoginSucceeded {
                attempt: answered,
                session,
            },
        ) if *attempt == answered => {
            let welcome = format!("Welcome back, {}!", session.display_name);
            Ok(TransitionResult::new(AuthState::Authenticated(session.clone()))
                .with_effect(Effect::PersistSession(session))
                .with_effect(Effect::StatusChanged(AuthStatus::Authenticated))
                .with_effect(Effect::notify_success(welcome)))
        }

        (
            AuthState::Authenticating { origin, attempt },
            Event::LoginFailed {
                attempt: answered,
                error,
            },
        ) if *attempt == answered => {
            let restored = AuthState::from(*origin);
            let status = restored.status();
            Ok(TransitionResult::new(restored)
                .with_effect(Effect::StatusChanged(status))
                .with_effect(Effect::notify_error(error.user_text())))
        }

        // Outcome of an attempt that was abandoned (logout mid-flight),
        // possibly after a newer attempt started
        (_, Event::LoginSucceeded { .. }) => Err(TransitionError::Stale("login response")),
        (_, Event::LoginFailed { .. }) => Err(TransitionError::Stale("login failure")),

        // ============================================================
        // Logout - valid everywhere, silent without a session
        // ============================================================
        (AuthState::Authenticated(_), Event::LogoutRequested) => {
            Ok(TransitionResult::new(AuthState::Anonymous)
                .with_effect(Effect::ClearCredentials)
                .with_effect(Effect::EndTranscript)
                .with_effect(Effect::StatusChanged(AuthStatus::Anonymous))
                .with_effect(Effect::notify_info(SIGNED_OUT_TEXT)))
        }

        (AuthState::Authenticating { .. } | AuthState::Expired, Event::LogoutRequested) => {
            Ok(TransitionResult::new(AuthState::Anonymous)
                .with_effect(Effect::ClearCredentials)
                .with_effect(Effect::StatusChanged(AuthStatus::Anonymous)))
        }

        (AuthState::Anonymous, Event::LogoutRequested) => Ok(TransitionResult::unchanged(state)),

        // ============================================================
        // Authorization failure
        // ============================================================

        // Only the session that presented the rejected token can expire.
        // Concurrent 401s after the first find the session already gone.
        (AuthState::Authenticated(session), Event::Unauthorized { token })
            if session.token == token =>
        {
            Ok(TransitionResult::new(AuthState::Expired)
                .with_effect(Effect::ClearCredentials)
                .with_effect(Effect::EndTranscript)
                .with_effect(Effect::StatusChanged(AuthStatus::Expired))
                .with_effect(Effect::notify_error(SESSION_EXPIRED_TEXT))
                .with_effect(Effect::NavigateToLogin)
                .with_effect(Effect::SettleExpiry))
        }

        (_, Event::Unauthorized { .. }) => Ok(TransitionResult::unchanged(state)),

        (AuthState::Expired, Event::ExpiryHandled) => Ok(TransitionResult::new(
            AuthState::Anonymous,
        )
        .with_effect(Effect::StatusChanged(AuthStatus::Anonymous))),

        // ============================================================
        // Persistence failure - roll the login back
        // ============================================================
        (AuthState::Authenticated(_), Event::PersistFailed { message }) => {
            Ok(TransitionResult::new(AuthState::Anonymous)
                .with_effect(Effect::ClearCredentials)
                .with_effect(Effect::EndTranscript)
                .with_effect(Effect::StatusChanged(AuthStatus::Anonymous))
                .with_effect(Effect::notify_error(format!(
                    "Could not save your session: {message}"
                ))))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}

fn begin_login(origin: LoginOrigin, attempt: Uuid) -> TransitionResult {
    TransitionResult::new(AuthState::Authenticating { origin, attempt })
        .with_effect(Effect::StatusChanged(AuthStatus::Authenticating))
}
