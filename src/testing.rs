//! Mock implementations for testing
//!
//! These mocks let the session and pipeline run end to end without a server
//! or a disk.

use crate::api::{ApiError, ApiRequest, ApiResponse, Backend};
use crate::notify::UiEvent;
use crate::store::{CredentialStore, StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

// ============================================================================
// Mock Backend
// ============================================================================

enum Scripted {
    Ready(Result<ApiResponse, ApiError>),
    Gated(Arc<Notify>, Result<ApiResponse, ApiError>),
}

/// Releases a response queued with [`MockBackend::queue_gated_json`]
#[derive(Clone)]
pub struct Gate(Arc<Notify>);

impl Gate {
    pub fn open(&self) {
        self.0.notify_one();
    }
}

/// Backend that answers from a queue and records every request
#[allow(dead_code)]
pub struct MockBackend {
    responses: Mutex<VecDeque<Scripted>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<ApiRequest>>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response with a JSON body
    pub fn queue_json(&self, status: u16, body: Value) {
        self.queue_response(status, &body.to_string());
    }

    /// Queue a response with a raw body
    pub fn queue_response(&self, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Scripted::Ready(Ok(ApiResponse::new(status, body))));
    }

    /// Queue a transport error
    pub fn queue_error(&self, error: ApiError) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Scripted::Ready(Err(error)));
    }

    /// Queue a JSON response that is held back until the gate opens
    pub fn queue_gated_json(&self, status: u16, body: Value) -> Gate {
        let gate = Arc::new(Notify::new());
        self.responses.lock().unwrap().push_back(Scripted::Gated(
            gate.clone(),
            Ok(ApiResponse::new(status, body.to_string())),
        ));
        Gate(gate)
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait until at least `count` requests have reached the backend
    pub async fn wait_for_requests(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.requests.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("requests never arrived");
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests.lock().unwrap().push(request);
        let scripted = self.responses.lock().unwrap().pop_front();
        match scripted {
            Some(Scripted::Ready(result)) => result,
            Some(Scripted::Gated(gate, result)) => {
                gate.notified().await;
                result
            }
            None => Err(ApiError::network("No mock response queued")),
        }
    }
}

// ============================================================================
// Failing Store
// ============================================================================

/// Store that reads as empty and fails every write like a full disk
pub struct FailingStore;

impl CredentialStore for FailingStore {
    fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Ok(None)
    }

    fn put(&self, _entries: &[(&str, &str)]) -> StoreResult<()> {
        // SQLITE_FULL
        Err(StoreError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(13),
            Some("database or disk is full".into()),
        )))
    }

    fn delete(&self, _keys: &[&str]) -> StoreResult<()> {
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Body of a successful `POST /auth/login`
pub fn login_body(token: &str, user_id: &str, name: &str) -> Value {
    json!({
        "token": token,
        "user": { "id": user_id, "name": name, "email": "a@b.com" }
    })
}

/// Everything published so far
pub fn drain(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
