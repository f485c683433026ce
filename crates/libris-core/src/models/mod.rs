//! Data models for the library API.
//!
//! This module contains the wire types for every resource the client
//! touches:
//!
//! - `Identity`, `Credential`, `Role`: who is signed in and with what token
//! - `Book`, `Category`, `User`: catalogue and account records
//! - `Loan` and its due-date rules
//! - `LoanOverview`, `ActiveLoanCount`: dashboard statistics
//! - `Paginated`, `Ref`: list envelopes and id-or-document references

pub mod auth;
pub mod book;
pub mod category;
pub mod common;
pub mod loan;
pub mod stats;
pub mod user;

pub use auth::{AuthResponse, Credential, Identity, LoginRequest, RegisterRequest, Role};
pub use book::{Book, BookSummary, BookUpdate, NewBook};
pub use category::{Category, CategoryInput};
pub use common::{Identified, Paginated, Ref};
pub use loan::{
    due_date_for, ExtensionError, Loan, LoanStatus, LoanStatusFilter, NewLoan,
    DEFAULT_EXTENSION_DAYS, DEFAULT_LOAN_DAYS, MAX_EXTENSIONS,
};
pub use stats::{ActiveLoanCount, LoanOverview};
pub use user::{NewUser, User, UserSummary, UserUpdate};
