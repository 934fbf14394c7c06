//! Utility functions for display formatting.

pub mod format;

pub use format::{capitalize, format_date, format_datetime, format_long_date, initials, truncate};
