//! Effects produced by state transitions

use super::state::{AuthStatus, Session};
use crate::notify::NotificationEvent;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Mirror the session into the credential store
    PersistSession(Session),

    /// Remove the persisted session
    ClearCredentials,

    /// Drop the transcript of the session that just ended
    EndTranscript,

    /// Publish a notification
    Notify(NotificationEvent),

    /// Tell the UI to show the login entry point
    NavigateToLogin,

    /// Publish the new session status
    StatusChanged(AuthStatus),

    /// Feed `ExpiryHandled` back into the machine
    SettleExpiry,
}

impl Effect {
    pub fn notify_info(text: impl Into<String>) -> Self {
        Effect::Notify(NotificationEvent::info(text))
    }

    pub fn notify_success(text: impl Into<String>) -> Self {
        Effect::Notify(NotificationEvent::success(text))
    }

    pub fn notify_error(text: impl Into<String>) -> Self {
        Effect::Notify(NotificationEvent::error(text))
    }
}
