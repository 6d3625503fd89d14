//! Session manager
//!
//! Owns the live [`AuthState`] behind a single lock. Every event is applied
//! and its effects executed before the lock is released, so the in-memory
//! state and the credential store agree whenever anyone else can look.

use super::{transition, AuthState, AuthStatus, Effect, Event, Session, TransitionError};
use crate::api::{ApiClient, ApiError, Backend, Registration};
use crate::notify::{NotificationBridge, NotificationEvent, UiEvent};
use crate::store::{CredentialStore, SessionMirror};
use chrono::Utc;
use std::sync::{Arc, Mutex, Weak};
use thiserror::Error;
use uuid::Uuid;

const REGISTERED_TEXT: &str = "Account created. You can sign in now.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("The session could not be saved")]
    NotPersisted,
}

/// Notified when a session ends (logout, expiry, failed persist).
///
/// Runs while the session lock is held: implementations must not call back
/// into the [`SessionManager`].
pub trait SessionObserver: Send + Sync {
    fn session_ended(&self);
}

pub struct SessionManager {
    state: Mutex<AuthState>,
    mirror: SessionMirror,
    bridge: NotificationBridge,
    api: Arc<ApiClient>,
    observers: Mutex<Vec<Weak<dyn SessionObserver>>>,
}

impl SessionManager {
    /// Build a manager and the API client it feeds credentials to.
    ///
    /// The initial state comes from the credential store: a complete
    /// persisted session starts `Authenticated`, anything else `Anonymous`.
    pub fn new(
        backend: Arc<dyn Backend>,
        store: Arc<dyn CredentialStore>,
        bridge: NotificationBridge,
    ) -> Arc<Self> {
        let mirror = SessionMirror::new(store);
        let initial = match mirror.load() {
            Ok(Some(session)) => {
                tracing::info!(user_id = %session.user_id, "Restored persisted session");
                AuthState::Authenticated(session)
            }
            Ok(None) => AuthState::Anonymous,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read credential store, starting signed out");
                if let Err(e) = mirror.clear() {
                    tracing::error!(error = %e, "Failed to clear credential store");
                }
                AuthState::Anonymous
            }
        };

        Arc::new_cyclic(|weak: &Weak<Self>| {
            let provider = weak.clone();
            let hook = weak.clone();
            let api = ApiClient::new(
                backend,
                Arc::new(move || provider.upgrade().and_then(|m| m.bearer_token())),
                Arc::new(move |token: &str| {
                    if let Some(manager) = hook.upgrade() {
                        manager.on_unauthorized(token);
                    }
                }),
            );

            Self {
                state: Mutex::new(initial),
                mirror,
                bridge,
                api: Arc::new(api),
                observers: Mutex::new(Vec::new()),
            }
        })
    }

    /// The API client whose protected calls carry this manager's credential
    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn bridge(&self) -> &NotificationBridge {
        &self.bridge
    }

    pub fn status(&self) -> AuthStatus {
        self.state.lock().unwrap().status()
    }

    pub fn current_user(&self) -> Option<Session> {
        self.state.lock().unwrap().session().cloned()
    }

    /// Token to attach to protected requests; present iff `Authenticated`
    pub fn bearer_token(&self) -> Option<String> {
        self.state.lock().unwrap().session().map(|s| s.token.clone())
    }

    /// Run `f` against the live session while holding the session lock.
    ///
    /// Lets other components make a check-and-mutate atomic with respect to
    /// session changes. `f` must not call back into the manager.
    pub fn with_session<R>(&self, f: impl FnOnce(&Session) -> R) -> Option<R> {
        let state = self.state.lock().unwrap();
        state.session().map(f)
    }

    pub fn register_observer(&self, observer: Weak<dyn SessionObserver>) {
        self.observers.lock().unwrap().push(observer);
    }

    /// Exchange credentials for a session.
    ///
    /// Only valid while signed out. Failures are announced through the bridge
    /// and returned; nothing is persisted unless the whole exchange succeeds.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        let attempt = Uuid::new_v4();
        self.dispatch(Event::LoginStarted { attempt })?;
        tracing::info!(email = %email, %attempt, "Signing in");

        let outcome = self.api.login(email, password).await.and_then(|response| {
            Session::from_login(response, Utc::now()).ok_or_else(|| {
                ApiError::unknown("Login response was missing the token or user profile")
            })
        });

        match outcome {
            Ok(session) => {
                self.dispatch(Event::LoginSucceeded {
                    attempt,
                    session: session.clone(),
                })?;
                let live = self.with_session(|s| s.token == session.token).unwrap_or(false);
                if !live {
                    return Err(SessionError::NotPersisted);
                }
                tracing::info!(user_id = %session.user_id, "Signed in");
                Ok(session)
            }
            Err(error) => {
                tracing::warn!(kind = ?error.kind, error = %error, "Sign-in failed");
                self.dispatch(Event::LoginFailed {
                    attempt,
                    error: error.clone(),
                })?;
                Err(SessionError::Api(error))
            }
        }
    }

    /// Create an account. Leaves the session untouched and does not sign in.
    pub async fn register(&self, registration: &Registration) -> Result<String, SessionError> {
        match self.api.register(registration).await {
            Ok(response) => {
                let text = response
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| REGISTERED_TEXT.to_string());
                tracing::info!(email = %registration.email, "Account registered");
                self.bridge.notify(NotificationEvent::success(text.clone()));
                Ok(text)
            }
            Err(error) => {
                tracing::warn!(kind = ?error.kind, error = %error, "Registration failed");
                self.bridge.notify(NotificationEvent::error(error.user_text()));
                Err(SessionError::Api(error))
            }
        }
    }

    /// Sign out. A no-op when there is no session.
    pub fn logout(&self) {
        if let Err(e) = self.dispatch(Event::LogoutRequested) {
            tracing::error!(error = %e, "Logout rejected");
        }
    }

    /// Called by the HTTP layer when a protected request presenting `token`
    /// was rejected.
    pub fn on_unauthorized(&self, token: &str) {
        if let Err(e) = self.dispatch(Event::Unauthorized {
            token: token.to_string(),
        }) {
            tracing::error!(error = %e, "Failed to handle authorization failure");
        }
    }

    pub(super) fn dispatch(&self, event: Event) -> Result<(), TransitionError> {
        let mut state = self.state.lock().unwrap();

        // Effects can feed follow-up events back in
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let result = transition(&state, current_event)?;

            let old_status = state.status();
            *state = result.new_state;
            if old_status != state.status() {
                tracing::info!(from = %old_status, to = %state.status(), "Session state changed");
            }

            for effect in result.effects {
                if let Some(next) = self.execute_effect(effect) {
                    // A failed write aborts the rest of this batch
                    let abort = matches!(next, Event::PersistFailed { .. });
                    events_to_process.push(next);
                    if abort {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    fn execute_effect(&self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::PersistSession(session) => {
                if let Err(e) = self.mirror.save(&session) {
                    tracing::error!(error = %e, "Failed to persist session");
                    // Never leave half a session behind
                    if let Err(e) = self.mirror.clear() {
                        tracing::error!(error = %e, "Failed to clear credential store");
                    }
                    return Some(Event::PersistFailed {
                        message: e.to_string(),
                    });
                }
            }
            Effect::ClearCredentials => {
                if let Err(e) = self.mirror.clear() {
                    tracing::error!(error = %e, "Failed to clear credential store");
                }
            }
            Effect::EndTranscript => {
                let mut observers = self.observers.lock().unwrap();
                observers.retain(|observer| match observer.upgrade() {
                    Some(observer) => {
                        observer.session_ended();
                        true
                    }
                    None => false,
                });
            }
            Effect::Notify(notification) => self.bridge.notify(notification),
            Effect::NavigateToLogin => self.bridge.publish(UiEvent::NavigateToLogin),
            Effect::StatusChanged(status) => self.bridge.publish(UiEvent::SessionChanged(status)),
            Effect::SettleExpiry => return Some(Event::ExpiryHandled),
        }
        None
    }
}
