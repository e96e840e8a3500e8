use crate::store::StoreError;
use shared::error::ErrorCode;
use shared::models::CustomerStatus;
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Customer not found: {0}")]
    CustomerNotFound(i64),

    #[error("Customer {id} cannot go from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: CustomerStatus,
        to: CustomerStatus,
    },

    #[error("Invalid party size: {0}")]
    InvalidPartySize(u32),

    #[error("A table is required to seat customer {0}")]
    TableRequired(i64),
}

impl ManagerError {
    /// 错误码（前端负责本地化）
    pub fn code(&self) -> ErrorCode {
        match self {
            ManagerError::Store(StoreError::NotFound(_)) => ErrorCode::CustomerNotFound,
            ManagerError::Store(StoreError::Duplicate(_)) => ErrorCode::AlreadyExists,
            ManagerError::Store(e) => {
                tracing::error!(error = %e, "Store error occurred");
                ErrorCode::DatabaseError
            }
            ManagerError::CustomerNotFound(_) => ErrorCode::CustomerNotFound,
            ManagerError::InvalidTransition { .. } => ErrorCode::InvalidStatusTransition,
            ManagerError::InvalidPartySize(_) => ErrorCode::InvalidPartySize,
            ManagerError::TableRequired(_) => ErrorCode::TableRequired,
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
