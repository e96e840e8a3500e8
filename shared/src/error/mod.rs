//! Unified error codes
//!
//! [`ErrorCode`] values travel to the front end as plain numbers; the
//! front end owns localisation.

pub mod codes;

pub use codes::*;
