//! Shared types for the queue kiosk
//!
//! Data models, queue read models, broadcast events and error codes used
//! by the queue engine and the surfaces built on it (kiosk, staff
//! dashboard, public display).

pub mod error;
pub mod models;
pub mod queue;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
