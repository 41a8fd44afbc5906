//! Payout-specific error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, PayoutId};
use crate::domain::ledger::LedgerError;

use super::PayoutStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayoutError {
    #[error("Payout {0} not found")]
    NotFound(PayoutId),

    #[error("Payout of {amount} is below the minimum of {minimum}")]
    BelowMinimum { amount: i64, minimum: i64 },

    #[error("Payout of {amount} is above the maximum of {maximum}")]
    AboveMaximum { amount: i64, maximum: i64 },

    #[error("Cannot {attempted} a payout in status {current}")]
    InvalidState {
        current: PayoutStatus,
        attempted: String,
    },

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl PayoutError {
    pub fn invalid_state(current: PayoutStatus, attempted: impl Into<String>) -> Self {
        PayoutError::InvalidState {
            current,
            attempted: attempted.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PayoutError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PayoutError::NotFound(_) => ErrorCode::PayoutNotFound,
            PayoutError::BelowMinimum { .. }
            | PayoutError::AboveMaximum { .. }
            | PayoutError::Validation { .. } => ErrorCode::ValidationFailed,
            PayoutError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            PayoutError::Ledger(inner) => inner.code(),
            PayoutError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<DomainError> for PayoutError {
    fn from(err: DomainError) -> Self {
        PayoutError::Infrastructure(err.to_string())
    }
}
