//! Session lifecycle
//!
//! A pure state machine (`transition`) plus the [`SessionManager`] that owns
//! the live state, mirrors it into the credential store, and hands the bearer
//! token to the API client.

mod effect;
pub mod event;
mod manager;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use manager::{SessionError, SessionManager, SessionObserver};
pub use state::{AuthState, AuthStatus, LoginOrigin, Session};
pub use transition::{transition, TransitionError};
