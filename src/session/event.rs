//! Events that drive the session state machine

use super::state::Session;
use crate::api::ApiError;
use uuid::Uuid;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    /// A sign-in attempt identified by `attempt` is starting
    LoginStarted { attempt: Uuid },
    LogoutRequested,

    // Credential exchange outcomes, tagged with the attempt they answer
    LoginSucceeded { attempt: Uuid, session: Session },
    LoginFailed { attempt: Uuid, error: ApiError },

    // HTTP layer events
    /// A protected request presenting `token` came back 401
    Unauthorized { token: String },

    // Internal follow-ups
    /// The expiry has been announced; settle into `Anonymous`
    ExpiryHandled,
    /// Writing the session to the credential store failed
    PersistFailed { message: String },
}
