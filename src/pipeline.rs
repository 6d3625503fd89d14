//! Message pipeline
//!
//! Owns the transcript of the current session. Every operation checks for a
//! live session first and fails closed without one.
//!
//! Lock order is session then transcript. Checks that must agree with the
//! session (admission, reconciling a reply) run inside
//! [`SessionManager::with_session`] so a logout cannot interleave with them.

mod transcript;

pub use transcript::{Author, DeliveryState, Message, Transcript};

use crate::api::ApiError;
use crate::notify::{NotificationBridge, NotificationEvent, UiEvent};
use crate::session::{SessionManager, SessionObserver};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Message is empty")]
    Empty,
    #[error("A message is already being sent")]
    Busy,
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("The session changed before the response arrived")]
    Stale,
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct MessagePipeline {
    session: Arc<SessionManager>,
    bridge: NotificationBridge,
    transcript: Mutex<Transcript>,
}

impl MessagePipeline {
    /// Create a pipeline bound to `session`; its transcript ends with the
    /// session.
    pub fn new(session: Arc<SessionManager>) -> Arc<Self> {
        let pipeline = Arc::new(Self {
            bridge: session.bridge().clone(),
            session: session.clone(),
            transcript: Mutex::new(Transcript::default()),
        });
        let observer = Arc::downgrade(&pipeline);
        session.register_observer(observer);
        pipeline
    }

    /// Snapshot of the transcript
    pub fn messages(&self) -> Vec<Message> {
        self.transcript.lock().unwrap().messages().to_vec()
    }

    pub fn draft(&self) -> String {
        self.transcript.lock().unwrap().draft().to_string()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.transcript.lock().unwrap().set_draft(text);
    }

    /// Send whatever is in the draft
    pub async fn send_draft(&self) -> Result<Message, PipelineError> {
        let text = self.draft();
        self.send_message(&text).await
    }

    /// Replace the transcript with the server's copy.
    ///
    /// Returns the number of messages loaded.
    pub async fn load_history(&self) -> Result<usize, PipelineError> {
        if self.session.bearer_token().is_none() {
            return Err(PipelineError::NotAuthenticated);
        }

        match self.session.api().history().await {
            Ok(history) => {
                let messages: Vec<Message> = history.value.into_iter().map(Message::from).collect();
                let applied = self.session.with_session(|session| {
                    if session.token != history.token {
                        return None;
                    }
                    let mut transcript = self.transcript.lock().unwrap();
                    transcript.replace(messages);
                    Some(transcript.len())
                });

                match applied.flatten() {
                    Some(len) => {
                        tracing::info!(messages = len, "Loaded history");
                        self.publish_len(len);
                        Ok(len)
                    }
                    None => {
                        tracing::debug!("Discarding history for an ended session");
                        Err(PipelineError::Stale)
                    }
                }
            }
            Err(error) => {
                tracing::warn!(kind = ?error.kind, error = %error, "Failed to load history");
                // Expiry is announced by the session manager, which has
                // already ended this transcript
                if error.kind.keeps_session() {
                    self.bridge.notify(NotificationEvent::error(error.user_text()));
                }
                Err(PipelineError::Api(error))
            }
        }
    }

    /// Send `text` as the next user message.
    ///
    /// The message is appended as pending before the request goes out.
    /// Returns the assistant's reply.
    pub async fn send_message(&self, text: &str) -> Result<Message, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::Empty);
        }

        let issued_at = Utc::now();
        let admitted = self.session.with_session(|session| {
            let mut transcript = self.transcript.lock().unwrap();
            if transcript.pending().is_some() {
                return Err(PipelineError::Busy);
            }
            let message = Message::pending_user(text, issued_at);
            let id = message.id;
            transcript.push(message);
            transcript.clear_draft();
            Ok((id, session.token.clone(), transcript.len()))
        });

        let (id, token, len) = admitted.ok_or(PipelineError::NotAuthenticated)??;
        self.publish_len(len);
        tracing::debug!(message_id = %id, "Sending message");

        match self.session.api().send_message(text).await {
            Ok(reply) => self.reconcile_reply(id, &reply.token, reply.value.message),
            Err(error) => {
                self.mark_failed(id, &token, &error);
                Err(PipelineError::Api(error))
            }
        }
    }

    fn reconcile_reply(
        &self,
        id: Uuid,
        token: &str,
        content: String,
    ) -> Result<Message, PipelineError> {
        let applied = self.session.with_session(|session| {
            let mut transcript = self.transcript.lock().unwrap();
            if session.token != token || !transcript.contains(id) {
                return None;
            }
            // Replies never sort before the message they answer
            let sent_at = transcript.timestamp_of(id).unwrap_or_else(Utc::now);
            let reply = Message::assistant_reply(content, Utc::now().max(sent_at));
            transcript.set_delivery(id, DeliveryState::Confirmed);
            transcript.push(reply.clone());
            Some((reply, transcript.len()))
        });

        match applied.flatten() {
            Some((reply, len)) => {
                self.publish_len(len);
                Ok(reply)
            }
            None => {
                tracing::debug!(message_id = %id, "Discarding reply for an ended session");
                Err(PipelineError::Stale)
            }
        }
    }

    /// Record that message `id`, sent under `token`, was not delivered.
    ///
    /// The failure is announced while `token` is still the live session,
    /// whether or not the message is still in the transcript.
    fn mark_failed(&self, id: Uuid, token: &str, error: &ApiError) {
        tracing::warn!(message_id = %id, kind = ?error.kind, error = %error, "Message failed");

        let outcome = self.session.with_session(|session| {
            if session.token != token {
                return None;
            }
            let mut transcript = self.transcript.lock().unwrap();
            Some(
                transcript
                    .set_delivery(id, DeliveryState::Failed)
                    .then(|| transcript.len()),
            )
        });

        let Some(marked) = outcome.flatten() else {
            tracing::debug!(message_id = %id, "Failure belongs to an ended session");
            return;
        };
        if let Some(len) = marked {
            self.publish_len(len);
        }
        // Expiry is announced by the session manager
        if error.kind.keeps_session() {
            self.bridge.notify(NotificationEvent::error(error.user_text()));
        }
    }

    fn publish_len(&self, len: usize) {
        self.bridge.publish(UiEvent::TranscriptChanged { len });
    }
}

impl SessionObserver for MessagePipeline {
    fn session_ended(&self) {
        let mut transcript = self.transcript.lock().unwrap();
        transcript.clear();
        self.bridge.publish(UiEvent::TranscriptChanged { len: 0 });
    }
}
