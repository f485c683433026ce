//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionState`: the session state machine and its transition function
//! - `SessionStore`: the single owner of the current session, persisting it
//!   through a `KeyValueStore` and keeping the API client's token in step
//! - `credentials`: the three persisted entries a session is restored from
//!
//! Sessions are restored once at startup and changed only by login,
//! register and logout.

pub mod credentials;
pub mod session;
pub mod store;

pub use session::{InvalidSession, Session, SessionEvent, SessionState, TransitionError};
pub use store::{AuthBackend, SessionError, SessionStore};
