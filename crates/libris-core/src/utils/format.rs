use chrono::{DateTime, Utc};

use crate::models::Loan;

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp as e.g. "May 01, 2024"
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %d, %Y").to_string()
}

/// Short due-date description for a loan relative to `now`.
pub fn due_status(loan: &Loan, now: DateTime<Utc>) -> String {
    if !loan.is_active() {
        return match loan.return_date {
            Some(returned) => format!("returned {}", format_date(&returned)),
            None => "returned".to_string(),
        };
    }

    let days = loan.days_until_due_at(now);
    if loan.is_overdue_at(now) {
        // The server may flag a loan overdue before its due date passes here
        match days {
            0.. => "overdue".to_string(),
            -1 => "overdue by 1 day".to_string(),
            n => format!("overdue by {} days", n.unsigned_abs()),
        }
    } else {
        match days {
            0 => "due today".to_string(),
            1 => "due tomorrow".to_string(),
            n => format!("due in {} days", n),
        }
    }
}
