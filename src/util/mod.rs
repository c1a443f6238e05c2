//! Utility functions module
//!
//! Contains helpers for rendering timestamps and durations.

pub mod units;

// Re-export commonly used functions
pub use units::{format_millis, format_span, format_timestamp, millis};
