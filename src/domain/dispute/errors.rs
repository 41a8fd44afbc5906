//! Dispute-specific error types.

use thiserror::Error;

use crate::domain::foundation::{DisputeId, DomainError, ErrorCode, SessionId};
use crate::domain::ledger::LedgerError;
use crate::domain::payment::PaymentError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisputeError {
    #[error("Dispute {0} not found")]
    NotFound(DisputeId),

    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    #[error("Session {0} already has an open dispute")]
    ActiveDisputeExists(SessionId),

    #[error("Session {0} is not completed")]
    SessionNotCompleted(SessionId),

    #[error("Only the session's mentee may dispute it")]
    NotSessionMentee,

    #[error("A description is required when the reason is 'other'")]
    DescriptionRequired,

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Refund of {amount} exceeds the session price of {price}")]
    RefundExceedsPrice { amount: i64, price: i64 },

    #[error("Dispute {0} is already resolved")]
    AlreadyResolved(DisputeId),

    #[error("Session {0} has no settled payment to refund")]
    NoPaymentForSession(SessionId),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl DisputeError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DisputeError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DisputeError::NotFound(_) => ErrorCode::DisputeNotFound,
            DisputeError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            DisputeError::ActiveDisputeExists(_) => ErrorCode::Conflict,
            DisputeError::AlreadyResolved(_) => ErrorCode::InvalidStateTransition,
            DisputeError::NotSessionMentee => ErrorCode::Forbidden,
            DisputeError::SessionNotCompleted(_)
            | DisputeError::DescriptionRequired
            | DisputeError::Validation { .. }
            | DisputeError::RefundExceedsPrice { .. }
            | DisputeError::NoPaymentForSession(_) => ErrorCode::ValidationFailed,
            DisputeError::Payment(inner) => inner.code(),
            DisputeError::Ledger(inner) => inner.code(),
            DisputeError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<DomainError> for DisputeError {
    fn from(err: DomainError) -> Self {
        DisputeError::Infrastructure(err.to_string())
    }
}
