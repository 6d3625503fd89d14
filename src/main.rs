//! vetchat - veterinary assistant chat client
//!
//! Terminal front end over the session manager and message pipeline.

mod api;
mod cli;
mod config;
mod notify;
mod pipeline;
mod session;
mod store;

#[cfg(test)]
mod testing;

use api::HttpBackend;
use cli::Command;
use config::ClientConfig;
use notify::NotificationBridge;
use pipeline::{MessagePipeline, PipelineError};
use session::SessionManager;
use std::sync::Arc;
use store::SqliteStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;

    // Initialize logging; stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vetchat=info".into()),
        )
        .with(config.log_json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr)
        }))
        .with(
            (!config.log_json)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    // Ensure store directory exists
    if let Some(parent) = config.store_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.store_path.display(), "Opening credential store");
    let store = SqliteStore::open(&config.store_path)?;

    tracing::info!(api = %config.api_url, "Using API");
    let backend = HttpBackend::new(config.api_url.clone())?;

    let bridge = NotificationBridge::new();
    let render = spawn_renderer(&bridge);

    let session = SessionManager::new(Arc::new(backend), Arc::new(store), bridge);
    let pipeline = MessagePipeline::new(session.clone());

    // Opening the chat with a restored session shows where it left off
    match session.current_user() {
        Some(user) => {
            println!("Signed in as {}.", user.display_name);
            show_history(&pipeline).await;
        }
        None => println!("Not signed in. {}", cli::HELP),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Login { email, password } => match session.login(&email, &password).await {
                Ok(_) => show_history(&pipeline).await,
                Err(error) => {
                    if let Some(line) = cli::format_login_error(&error) {
                        println!("{line}");
                    }
                }
            },
            Command::Register(registration) => {
                // Outcome is reported through the notification bridge
                let _ = session.register(&registration).await;
            }
            Command::Logout => session.logout(),
            Command::History => show_history(&pipeline).await,
            Command::WhoAmI => match session.current_user() {
                Some(user) => println!("{} <{}>", user.display_name, user.email),
                None => println!("Not signed in."),
            },
            Command::Help => println!("{}", cli::HELP),
            Command::Quit => break,
            Command::Send(text) => spawn_send(&pipeline, text),
            Command::Invalid(usage) => println!("{usage}"),
            Command::Empty => {}
        }
    }

    render.abort();
    Ok(())
}

/// Print notifications and navigation signals as they arrive
fn spawn_renderer(bridge: &NotificationBridge) -> tokio::task::JoinHandle<()> {
    let mut events = bridge.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = cli::format_event(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Renderer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Send in the background so the prompt stays responsive while a reply is
/// outstanding
fn spawn_send(pipeline: &Arc<MessagePipeline>, text: String) {
    let pipeline = pipeline.clone();
    pipeline.set_draft(text);
    tokio::spawn(async move {
        match pipeline.send_draft().await {
            Ok(reply) => println!("{}", cli::format_message(&reply)),
            Err(PipelineError::Busy) => println!("Still waiting for the previous reply."),
            Err(PipelineError::NotAuthenticated) => {
                println!("Sign in first with /login <email> <password>");
            }
            // Notified already, or nothing left to show
            Err(PipelineError::Api(_) | PipelineError::Stale | PipelineError::Empty) => {}
        }
    });
}

async fn show_history(pipeline: &MessagePipeline) {
    if pipeline.load_history().await.is_ok() {
        for message in pipeline.messages() {
            println!("{}", cli::format_message(&message));
        }
    }
}
