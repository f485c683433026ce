use serde::{Deserialize, Serialize};

/// `GET /loans/stats/active-count`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ActiveLoanCount {
    #[serde(alias = "activeCount", alias = "activeLoans", alias = "total")]
    pub count: u64,
}

/// `GET /loans/stats/overview`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase", default)]
pub struct LoanOverview {
    pub total_loans: u64,
    pub active_loans: u64,
    pub overdue_loans: u64,
    pub returned_loans: u64,
}
