//! REST API client module for the library service.
//!
//! This module provides the `ApiClient` for the books, loans, users and
//! categories endpoints, the query filters those endpoints accept, and
//! `ApiError`, which classifies every failure the client can return.
//!
//! Requests carry a bearer token taken from a slot shared by all clones of
//! the client. The session store is the only writer of that slot.

pub mod client;
pub mod error;
pub mod query;

pub use client::ApiClient;
pub use error::{ApiError, ApiErrorKind};
pub use query::{BookFilters, LoanFilters, QueryFilters};
