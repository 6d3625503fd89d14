//! Property-based tests for the session state machine
//!
//! The pure transition function is checked on its own, then the manager is
//! driven with random event sequences to check that memory and the
//! credential store never disagree.

use super::manager::SessionManager;
use super::*;
use crate::api::{ApiError, ApiErrorKind};
use crate::notify::{NotificationBridge, Severity, UiEvent};
use crate::store::{MemoryStore, SessionMirror};
use crate::testing::{drain, MockBackend};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_token() -> impl Strategy<Value = String> {
    prop_oneof![Just("t1".to_string()), Just("t2".to_string())]
}

fn arb_session() -> impl Strategy<Value = Session> {
    (arb_token(), "[a-z0-9]{1,8}", "[A-Za-zÁé ]{1,12}[a-z]", 0i64..2_000_000_000).prop_map(
        |(token, user_id, display_name, secs)| Session {
            user_id,
            display_name,
            email: "a@b.com".into(),
            token,
            issued_at: Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now),
        },
    )
}

fn arb_api_error() -> impl Strategy<Value = ApiError> {
    (
        prop_oneof![
            Just(ApiErrorKind::InvalidCredentials),
            Just(ApiErrorKind::ValidationError),
            Just(ApiErrorKind::NetworkFailure),
            Just(ApiErrorKind::Unknown),
        ],
        "[a-zA-Z ]{1,30}",
    )
        .prop_map(|(kind, message)| ApiError::new(kind, message))
}

/// Two fixed attempt ids so matching and mismatched outcomes both occur
fn arb_attempt() -> impl Strategy<Value = Uuid> {
    prop_oneof![Just(Uuid::from_u128(1)), Just(Uuid::from_u128(2))]
}

fn arb_origin() -> impl Strategy<Value = LoginOrigin> {
    prop_oneof![Just(LoginOrigin::Anonymous), Just(LoginOrigin::Expired)]
}

fn arb_state() -> impl Strategy<Value = AuthState> {
    prop_oneof![
        Just(AuthState::Anonymous),
        (arb_origin(), arb_attempt())
            .prop_map(|(origin, attempt)| AuthState::Authenticating { origin, attempt }),
        arb_session().prop_map(AuthState::Authenticated),
        Just(AuthState::Expired),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_attempt().prop_map(|attempt| Event::LoginStarted { attempt }),
        Just(Event::LogoutRequested),
        (arb_attempt(), arb_session())
            .prop_map(|(attempt, session)| Event::LoginSucceeded { attempt, session }),
        (arb_attempt(), arb_api_error())
            .prop_map(|(attempt, error)| Event::LoginFailed { attempt, error }),
        arb_token().prop_map(|token| Event::Unauthorized { token }),
    ]
}

// ============================================================================
// Helpers
// ============================================================================

fn manager_with_store() -> (Arc<SessionManager>, Arc<MemoryStore>, NotificationBridge) {
    let store = Arc::new(MemoryStore::new());
    let bridge = NotificationBridge::new();
    let manager = SessionManager::new(Arc::new(MockBackend::new()), store.clone(), bridge.clone());
    (manager, store, bridge)
}

fn error_notifications(events: &[UiEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, UiEvent::Notification(n) if n.severity == Severity::Error))
        .count()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Same state and event always give the same outcome
    #[test]
    fn prop_transition_is_deterministic(state in arb_state(), event in arb_event()) {
        let first = transition(&state, event.clone());
        let second = transition(&state, event);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.new_state, b.new_state);
                prop_assert_eq!(a.effects, b.effects);
            }
            (Err(a), Err(b)) => prop_assert_eq!(a, b),
            _ => prop_assert!(false, "outcomes diverged"),
        }
    }

    /// Every transition announces at most one notification
    #[test]
    fn prop_at_most_one_notification(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, event) {
            let notes = result
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::Notify(_)))
                .count();
            prop_assert!(notes <= 1);
        }
    }

    /// Persisting a session only ever happens on entry to Authenticated
    #[test]
    fn prop_persist_only_when_authenticated(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, event) {
            for effect in &result.effects {
                if let Effect::PersistSession(session) = effect {
                    prop_assert_eq!(result.new_state.session(), Some(session));
                }
            }
        }
    }

    /// Logging out twice is the same as logging out once
    #[test]
    fn prop_logout_is_idempotent(state in arb_state()) {
        let once = transition(&state, Event::LogoutRequested).unwrap();
        prop_assert_eq!(&once.new_state, &AuthState::Anonymous);

        let twice = transition(&once.new_state, Event::LogoutRequested).unwrap();
        prop_assert_eq!(twice.new_state, AuthState::Anonymous);
        prop_assert!(twice.effects.is_empty());
    }

    /// A 401 for a token that is not the live one changes nothing
    #[test]
    fn prop_foreign_unauthorized_is_noop(session in arb_session()) {
        let state = AuthState::Authenticated(session.clone());
        let foreign = format!("{}-old", session.token);
        let result = transition(&state, Event::Unauthorized { token: foreign }).unwrap();
        prop_assert_eq!(result.new_state, state);
        prop_assert!(result.effects.is_empty());
    }

    /// After every event the store holds a session iff memory does, and
    /// a bearer token is available iff the state is Authenticated
    #[test]
    fn prop_store_mirrors_state(events in proptest::collection::vec(arb_event(), 0..30)) {
        let (manager, store, _bridge) = manager_with_store();
        let mirror = SessionMirror::new(store);

        for event in events {
            let _ = manager.dispatch(event);

            let authenticated = manager.status() == AuthStatus::Authenticated;
            prop_assert_eq!(manager.bearer_token().is_some(), authenticated);
            prop_assert_eq!(mirror.is_present().unwrap(), authenticated);
            if authenticated {
                prop_assert_eq!(mirror.load().unwrap(), manager.current_user());
            }
            // Expired is transient and never observable from outside
            prop_assert_ne!(manager.status(), AuthStatus::Expired);
        }
    }

    /// Any burst of 401s for the live token ends the session exactly once
    #[test]
    fn prop_unauthorized_burst_notifies_once(session in arb_session(), burst in 1usize..8) {
        let (manager, _store, bridge) = manager_with_store();
        let mut rx = bridge.subscribe();
        let attempt = Uuid::new_v4();
        manager.dispatch(Event::LoginStarted { attempt }).unwrap();
        manager
            .dispatch(Event::LoginSucceeded { attempt, session: session.clone() })
            .unwrap();
        drain(&mut rx);

        for _ in 0..burst {
            manager.on_unauthorized(&session.token);
        }

        let events = drain(&mut rx);
        prop_assert_eq!(error_notifications(&events), 1);
        prop_assert_eq!(events.iter().filter(|e| **e == UiEvent::NavigateToLogin).count(), 1);
        prop_assert_eq!(manager.status(), AuthStatus::Anonymous);
    }
}
