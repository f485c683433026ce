//! Loans and the due-date rules shared by every screen that shows them.
//!
//! The backend owns the authoritative due date; the helpers here let a
//! consumer preview an extension and refuse one the backend would reject.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::book::BookSummary;
use super::common::Ref;
use super::user::UserSummary;

/// Loan period used when a new loan does not specify one.
pub const DEFAULT_LOAN_DAYS: i64 = 14;

/// Days added by an extension when the caller does not choose.
pub const DEFAULT_EXTENSION_DAYS: i64 = 7;

/// Extensions allowed per loan.
pub const MAX_EXTENSIONS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Returned,
    Overdue,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanStatus::Active => write!(f, "Active"),
            LoanStatus::Returned => write!(f, "Returned"),
            LoanStatus::Overdue => write!(f, "Overdue"),
        }
    }
}

/// `status` filter accepted by `GET /loans` and `GET /loans/user/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoanStatusFilter {
    Active,
    Returned,
    #[default]
    All,
}

impl LoanStatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatusFilter::Active => "active",
            LoanStatusFilter::Returned => "returned",
            LoanStatusFilter::All => "all",
        }
    }
}

impl FromStr for LoanStatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(LoanStatusFilter::Active),
            "returned" => Ok(LoanStatusFilter::Returned),
            "all" => Ok(LoanStatusFilter::All),
            other => Err(format!(
                "unknown loan status '{}' (expected active, returned or all)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    #[error("Loan has already been extended the maximum of {max} times")]
    LimitReached { max: u32 },

    #[error("Only active loans can be extended")]
    NotActive,

    #[error("Extension must add at least one day (got {0})")]
    InvalidDays(i64),

    #[error("Extending by {0} days puts the due date out of range")]
    OutOfRange(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// `None` when the account was deleted after the loan was made.
    #[serde(default)]
    pub user: Option<Ref<UserSummary>>,
    /// `None` when the book was deleted after the loan was made.
    #[serde(default)]
    pub book: Option<Ref<BookSummary>>,
    #[serde(alias = "loanDate")]
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    #[serde(default, alias = "extensions")]
    pub extension_count: u32,
}

impl Loan {
    /// Not yet returned, whether or not it is past due.
    pub fn is_active(&self) -> bool {
        self.return_date.is_none() && self.status != LoanStatus::Returned
    }

    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && (self.status == LoanStatus::Overdue || self.due_date < now)
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }

    /// Whole days until the due date; negative once overdue.
    pub fn days_until_due_at(&self, now: DateTime<Utc>) -> i64 {
        (self.due_date - now).num_days()
    }

    pub fn extensions_remaining(&self) -> u32 {
        MAX_EXTENSIONS.saturating_sub(self.extension_count)
    }

    pub fn can_extend(&self) -> bool {
        self.check_extendable().is_ok()
    }

    fn check_extendable(&self) -> Result<(), ExtensionError> {
        if !self.is_active() {
            return Err(ExtensionError::NotActive);
        }
        if self.extension_count >= MAX_EXTENSIONS {
            return Err(ExtensionError::LimitReached { max: MAX_EXTENSIONS });
        }
        Ok(())
    }

    /// Due date after extending by `additional_days`, or why it is refused.
    pub fn extended_due_date(&self, additional_days: i64) -> Result<DateTime<Utc>, ExtensionError> {
        if additional_days <= 0 {
            return Err(ExtensionError::InvalidDays(additional_days));
        }
        self.check_extendable()?;
        due_date_for(self.due_date, additional_days).ok_or(ExtensionError::OutOfRange(additional_days))
    }

    pub fn book_id(&self) -> Option<&str> {
        self.book.as_ref().map(Ref::id)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(Ref::id)
    }

    pub fn book_title(&self) -> Option<&str> {
        self.book
            .as_ref()
            .and_then(Ref::populated)
            .map(|b| b.title.as_str())
    }

    pub fn borrower_name(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(Ref::populated)
            .map(|u| u.username.as_str())
    }
}

/// Due date of a loan taken out at `borrowed` for `loan_days`, or `None`
/// when that falls outside the representable range.
pub fn due_date_for(borrowed: DateTime<Utc>, loan_days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(loan_days).and_then(|days| borrowed.checked_add_signed(days))
}

/// `POST /loans` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLoan {
    pub user_id: String,
    pub book_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_days: Option<u32>,
}

impl NewLoan {
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.user_id.trim().is_empty() {
            Some("userId")
        } else if self.book_id.trim().is_empty() {
            Some("bookId")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn loan_at(borrowed: DateTime<Utc>, loan_days: i64, extension_count: u32) -> Loan {
        Loan {
            id: "l1".to_string(),
            user: Some(Ref::Id("u1".to_string())),
            book: Some(Ref::Id("b1".to_string())),
            borrow_date: borrowed,
            due_date: due_date_for(borrowed, loan_days).unwrap(),
            return_date: None,
            status: LoanStatus::Active,
            extension_count,
        }
    }

    fn baseline() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_extension_adds_days_to_due_date() {
        let borrowed = baseline();
        let loan = loan_at(borrowed, 7, 0);

        let extended = loan.extended_due_date(7).unwrap();
        assert_eq!(extended, borrowed + Duration::days(14));
    }

    #[test]
    fn test_extension_refused_at_limit() {
        let loan = loan_at(baseline(), 7, 1);
        assert!(loan.can_extend());
        assert_eq!(loan.extensions_remaining(), 1);

        let loan = loan_at(baseline(), 7, 2);
        assert!(!loan.can_extend());
        assert_eq!(loan.extensions_remaining(), 0);
        assert_eq!(
            loan.extended_due_date(7),
            Err(ExtensionError::LimitReached { max: MAX_EXTENSIONS })
        );
    }

    #[test]
    fn test_extension_refused_when_returned() {
        let mut loan = loan_at(baseline(), 7, 0);
        loan.status = LoanStatus::Returned;
        loan.return_date = Some(baseline() + Duration::days(3));
        assert_eq!(loan.extended_due_date(7), Err(ExtensionError::NotActive));
    }

    #[test]
    fn test_extension_requires_positive_days() {
        let loan = loan_at(baseline(), 7, 0);
        assert_eq!(loan.extended_due_date(0), Err(ExtensionError::InvalidDays(0)));
    }

    #[test]
    fn test_extension_out_of_range_is_refused() {
        let loan = loan_at(baseline(), 7, 0);
        let days = i64::from(u32::MAX);
        assert_eq!(
            loan.extended_due_date(days),
            Err(ExtensionError::OutOfRange(days))
        );
        assert_eq!(
            loan.extended_due_date(i64::MAX),
            Err(ExtensionError::OutOfRange(i64::MAX))
        );
        assert_eq!(due_date_for(baseline(), i64::from(u32::MAX)), None);
    }

    #[test]
    fn test_overdue_flag() {
        let loan = loan_at(baseline(), 7, 0);
        assert!(!loan.is_overdue_at(baseline() + Duration::days(6)));
        assert!(loan.is_overdue_at(baseline() + Duration::days(8)));
        assert_eq!(loan.days_until_due_at(baseline() + Duration::days(2)), 5);
        assert_eq!(loan.days_until_due_at(baseline() + Duration::days(9)), -2);
    }

    #[test]
    fn test_returned_loan_never_overdue() {
        let mut loan = loan_at(baseline(), 7, 0);
        loan.status = LoanStatus::Returned;
        loan.return_date = Some(baseline() + Duration::days(10));
        assert!(!loan.is_overdue_at(baseline() + Duration::days(30)));
    }

    #[test]
    fn test_parse_loan_with_populated_refs() {
        let json = r#"{
            "_id": "l9",
            "user": {"_id": "u1", "username": "ada", "email": "ada@example.com"},
            "book": {"_id": "b1", "title": "Dune", "author": "Frank Herbert"},
            "borrowDate": "2024-05-01T12:00:00.000Z",
            "dueDate": "2024-05-15T12:00:00.000Z",
            "returnDate": null,
            "status": "active",
            "extensionCount": 1
        }"#;
        let loan: Loan = serde_json::from_str(json).unwrap();
        assert_eq!(loan.book_title(), Some("Dune"));
        assert_eq!(loan.borrower_name(), Some("ada"));
        assert_eq!(loan.user_id(), Some("u1"));
        assert_eq!(loan.book_id(), Some("b1"));
        assert_eq!(loan.extension_count, 1);
        assert!(loan.is_active());
    }

    #[test]
    fn test_parse_loan_with_deleted_refs() {
        let json = r#"[
            {"_id": "l1", "user": null, "book": null,
             "borrowDate": "2024-05-01T12:00:00.000Z", "dueDate": "2024-05-15T12:00:00.000Z",
             "status": "active"},
            {"_id": "l2", "user": "u2", "book": "b2",
             "borrowDate": "2024-05-01T12:00:00.000Z", "dueDate": "2024-05-15T12:00:00.000Z",
             "status": "returned", "returnDate": "2024-05-10T12:00:00.000Z"}
        ]"#;
        let loans: Vec<Loan> = serde_json::from_str(json).unwrap();
        assert_eq!(loans.len(), 2);
        assert_eq!(loans[0].book_id(), None);
        assert_eq!(loans[0].book_title(), None);
        assert_eq!(loans[0].user_id(), None);
        assert_eq!(loans[1].book_id(), Some("b2"));
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!("Returned".parse::<LoanStatusFilter>(), Ok(LoanStatusFilter::Returned));
        assert!("lost".parse::<LoanStatusFilter>().is_err());
        assert_eq!(LoanStatusFilter::default().as_str(), "all");
    }
}
