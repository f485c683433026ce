//! Client core for a library-management REST API.
//!
//! The crate is built around two pieces:
//!
//! - [`auth::SessionStore`] owns the signed-in session. It is restored once
//!   from a [`storage::KeyValueStore`] at startup and changed only by login,
//!   register and logout.
//! - [`api::ApiClient`] issues the HTTP calls, attaching the session's access
//!   token to everything except the login and register endpoints, and turns
//!   every failure into a classified [`api::ApiError`].
//!
//! Everything else (models, configuration, formatting helpers) supports
//! those two.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod storage;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiErrorKind};
pub use auth::{SessionError, SessionState, SessionStore};
pub use config::Config;
