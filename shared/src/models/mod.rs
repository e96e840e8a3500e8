//! Data models
//!
//! Shared between queue-engine and frontend.
//! All IDs are `i64` snowflake ids, all timestamps Unix millis.

pub mod customer;
pub mod dining_table;

// Re-exports
pub use customer::*;
pub use dining_table::*;
