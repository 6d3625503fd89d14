//! Notification bridge
//!
//! The session manager and message pipeline publish here; the UI layer
//! subscribes. Events are ephemeral: a subscriber that is not listening when
//! an event is published never sees it.

use crate::session::AuthStatus;
use std::fmt;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Error => "error",
        })
    }
}

/// A user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub text: String,
    pub severity: Severity,
}

impl NotificationEvent {
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            severity,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Info)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Success)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Error)
    }
}

/// Everything the core tells the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Notification(NotificationEvent),
    /// Session status moved; drives route guarding
    SessionChanged(AuthStatus),
    /// The session ended involuntarily; show the login entry point
    NavigateToLogin,
    /// The transcript was mutated and now holds `len` messages
    TranscriptChanged { len: usize },
}

/// Fan-out point between the core and the UI
#[derive(Clone)]
pub struct NotificationBridge {
    tx: broadcast::Sender<UiEvent>,
}

impl NotificationBridge {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: UiEvent) {
        // No subscribers is fine; nobody is rendering yet
        let _ = self.tx.send(event);
    }

    pub fn notify(&self, notification: NotificationEvent) {
        tracing::debug!(severity = %notification.severity, text = %notification.text, "Notification");
        self.publish(UiEvent::Notification(notification));
    }
}

impl Default for NotificationBridge {
    fn default() -> Self {
        Self::new()
    }
}
