//! Formatting helpers for operator-facing output.

pub mod format;

pub use format::{age_display, format_timestamp, truncate_string};
