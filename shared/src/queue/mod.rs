//! Queue read models and broadcast events
//!
//! Shared between the queue engine and the surfaces that consume it
//! (kiosk, staff dashboard, public display).

pub mod event;
pub mod types;

pub use event::*;
pub use types::*;
