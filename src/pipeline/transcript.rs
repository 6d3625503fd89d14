//! Transcript model
//!
//! Append-only; messages are only ever added at the end, replaced wholesale,
//! or have their delivery state updated in place.

use crate::api::{HistoryRecord, Sender};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

impl From<Sender> for Author {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => Author::User,
            Sender::Ai => Author::Assistant,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Local identifier; never sent to the server
    pub id: Uuid,
    pub content: String,
    pub origin: Author,
    pub timestamp: DateTime<Utc>,
    pub delivery: DeliveryState,
}

impl Message {
    pub fn pending_user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            origin: Author::User,
            timestamp,
            delivery: DeliveryState::Pending,
        }
    }

    pub fn assistant_reply(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            origin: Author::Assistant,
            timestamp,
            delivery: DeliveryState::Confirmed,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.delivery == DeliveryState::Pending
    }
}

impl From<HistoryRecord> for Message {
    fn from(record: HistoryRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: record.content,
            origin: record.sender.into(),
            timestamp: record.timestamp,
            delivery: DeliveryState::Confirmed,
        }
    }
}

/// Conversation of the current session plus the unsent input draft
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    draft: String,
}

impl Transcript {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn clear_draft(&mut self) {
        self.draft.clear();
    }

    pub fn pending(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_pending())
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the confirmed conversation with `history`, ordered by
    /// timestamp.
    ///
    /// The sort is stable so records sharing a timestamp keep server order.
    /// A message still awaiting its reply stays at the end so the reply can
    /// find it.
    pub fn replace(&mut self, history: Vec<Message>) {
        let in_flight: Vec<Message> = self
            .messages
            .drain(..)
            .filter(Message::is_pending)
            .collect();
        self.messages = history;
        self.messages.sort_by_key(|m| m.timestamp);
        self.messages.extend(in_flight);
    }

    /// Move message `id` to `delivery`. Returns false if it is gone.
    pub fn set_delivery(&mut self, id: Uuid, delivery: DeliveryState) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.delivery = delivery;
                true
            }
            None => false,
        }
    }

    pub fn timestamp_of(&self, id: Uuid) -> Option<DateTime<Utc>> {
        self.messages.iter().find(|m| m.id == id).map(|m| m.timestamp)
    }

    /// Drop the conversation and the draft
    pub fn clear(&mut self) {
        self.messages.clear();
        self.draft.clear();
    }
}
