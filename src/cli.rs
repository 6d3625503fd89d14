//! Line-oriented front end
//!
//! Each input line is either a slash command or a chat message.

use crate::api::Registration;
use crate::notify::{Severity, UiEvent};
use crate::pipeline::{Author, DeliveryState, Message};
use crate::session::SessionError;

pub const HELP: &str = "\
Commands:
  /login <email> <password>
  /register <name> <email> <password>
  /logout
  /history
  /whoami
  /help
  /quit
Anything else is sent to the assistant.";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Login { email: String, password: String },
    Register(Registration),
    Logout,
    History,
    WhoAmI,
    Help,
    Quit,
    Send(String),
    Empty,
    /// Malformed command; carries usage text
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }
        // Chat text is sent untouched; only commands are tokenized
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Send(line.to_string());
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match (name, args.as_slice()) {
            ("login", [email, password]) => Command::Login {
                email: (*email).to_string(),
                password: (*password).to_string(),
            },
            ("login", _) => Command::Invalid("usage: /login <email> <password>".into()),
            ("register", [name @ .., email, password]) if !name.is_empty() => {
                Command::Register(Registration {
                    name: name.join(" "),
                    email: (*email).to_string(),
                    password: (*password).to_string(),
                })
            }
            ("register", _) => {
                Command::Invalid("usage: /register <name> <email> <password>".into())
            }
            ("logout", []) => Command::Logout,
            ("history", []) => Command::History,
            ("whoami", []) => Command::WhoAmI,
            ("help", _) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            _ => Command::Invalid(format!("unknown command /{name}, try /help")),
        }
    }
}

/// Render one transcript entry
pub fn format_message(message: &Message) -> String {
    let who = match message.origin {
        Author::User => "you",
        Author::Assistant => "vet",
    };
    let mut line = format!(
        "[{}] {who}> {}",
        message.timestamp.format("%H:%M"),
        message.content
    );
    match message.delivery {
        DeliveryState::Pending => line.push_str("  (sending)"),
        DeliveryState::Failed => line.push_str("  (not delivered)"),
        DeliveryState::Confirmed => {}
    }
    line
}

/// Render a UI event, if it is meant to be shown
pub fn format_event(event: &UiEvent) -> Option<String> {
    match event {
        UiEvent::Notification(n) => {
            let marker = match n.severity {
                Severity::Info => "i",
                Severity::Success => "+",
                Severity::Error => "!",
            };
            Some(format!("[{marker}] {}", n.text))
        }
        UiEvent::NavigateToLogin => Some("Sign in with /login <email> <password>".to_string()),
        UiEvent::SessionChanged(_) | UiEvent::TranscriptChanged { .. } => None,
    }
}

/// Explain a failed `/login`, unless the bridge already did
pub fn format_login_error(error: &SessionError) -> Option<String> {
    match error {
        // Refused before any request went out
        SessionError::Transition(refused) => Some(refused.to_string()),
        SessionError::Api(_) | SessionError::NotPersisted => None,
    }
}
