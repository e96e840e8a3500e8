//! Unified error codes for the queue kiosk
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 7xxx: Table errors
//! - 10xxx: Queue / customer errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 values so the kiosk front end can localise messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    AlreadyExists = 4,

    // ==================== 7xxx: Table ====================
    TableRequired = 7005,

    // ==================== 10xxx: Queue ====================
    CustomerNotFound = 10001,
    InvalidStatusTransition = 10002,
    InvalidPartySize = 10003,

    // ==================== 9xxx: System ====================
    DatabaseError = 9002,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(ErrorCode::AlreadyExists),
            7005 => Ok(ErrorCode::TableRequired),
            10001 => Ok(ErrorCode::CustomerNotFound),
            10002 => Ok(ErrorCode::InvalidStatusTransition),
            10003 => Ok(ErrorCode::InvalidPartySize),
            9002 => Ok(ErrorCode::DatabaseError),
            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(10001), Ok(ErrorCode::CustomerNotFound));
        assert_eq!(ErrorCode::try_from(7005), Ok(ErrorCode::TableRequired));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(12345), Err(InvalidErrorCode(12345)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::InvalidStatusTransition).unwrap();
        assert_eq!(json, "10002");
        let code: ErrorCode = serde_json::from_str("10003").unwrap();
        assert_eq!(code, ErrorCode::InvalidPartySize);
        assert!(serde_json::from_str::<ErrorCode>("65000").is_err());
    }
}
