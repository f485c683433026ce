//! Query-string filters for list endpoints.
//!
//! Only fields that are set and non-empty reach the query string; reqwest
//! handles the encoding.

use crate::models::LoanStatusFilter;

pub trait QueryFilters {
    /// Every filter field with its current value, set or not.
    fn fields(&self) -> Vec<(&'static str, Option<String>)>;

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        self.fields()
            .into_iter()
            .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v)))
            .collect()
    }
}

/// Filters for `GET /books`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilters {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl QueryFilters for BookFilters {
    fn fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("title", self.title.clone()),
            ("author", self.author.clone()),
            ("genre", self.genre.clone()),
            ("page", self.page.map(|p| p.to_string())),
            ("limit", self.limit.map(|l| l.to_string())),
        ]
    }
}

/// Filters for `GET /loans` and `GET /loans/user/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanFilters {
    pub status: Option<LoanStatusFilter>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl LoanFilters {
    pub fn with_status(status: LoanStatusFilter) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

impl QueryFilters for LoanFilters {
    fn fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("status", self.status.map(|s| s.as_str().to_string())),
            ("page", self.page.map(|p| p.to_string())),
            ("limit", self.limit.map(|l| l.to_string())),
        ]
    }
}

/// No filters.
impl QueryFilters for () {
    fn fields(&self) -> Vec<(&'static str, Option<String>)> {
        Vec::new()
    }
}
