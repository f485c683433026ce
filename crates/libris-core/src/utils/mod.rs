//! Utility functions for display formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{due_status, format_date, truncate};
