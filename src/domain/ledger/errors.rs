//! Ledger-specific error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, MentorId, SessionId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("No balance opened for mentor {0}")]
    BalanceNotFound(MentorId),

    #[error("Insufficient balance for mentor {mentor_id}: requested {requested}, available {available}")]
    InsufficientBalance {
        mentor_id: MentorId,
        requested: i64,
        available: i64,
    },

    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    #[error("Session {0} has no settled payment to credit")]
    PaymentNotSettled(SessionId),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Balance for mentor {0} kept changing underneath; gave up after retries")]
    Contended(MentorId),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl LedgerError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::BalanceNotFound(_) => ErrorCode::BalanceNotFound,
            LedgerError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            LedgerError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            LedgerError::PaymentNotSettled(_) | LedgerError::Validation { .. } => {
                ErrorCode::ValidationFailed
            }
            LedgerError::InvariantViolation(_) => ErrorCode::InvariantViolation,
            LedgerError::Contended(_) => ErrorCode::Conflict,
            LedgerError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Contended(_) | LedgerError::Infrastructure(_))
    }
}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        LedgerError::Infrastructure(err.to_string())
    }
}
