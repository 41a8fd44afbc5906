//! Payment-specific error types.
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound / NotFoundForProvider / SessionNotFound | 404 |
//! | SessionNotPayable / Validation / InvalidAmount | 422 |
//! | InvalidState | 409 |
//! | InvariantViolation | 409 |
//! | ProviderRejected | 402 |
//! | ProviderUnavailable | 503 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, SessionId, ValidationError};

use super::PaymentStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("Payment {0} not found")]
    NotFound(PaymentId),

    #[error("No payment for provider reference '{0}'")]
    NotFoundForProvider(String),

    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    #[error("Session {session_id} cannot be paid: {reason}")]
    SessionNotPayable { session_id: SessionId, reason: String },

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Cannot {attempted} a payment in status {current}")]
    InvalidState {
        current: PaymentStatus,
        attempted: String,
    },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Provider rejected the request: {0}")]
    ProviderRejected(String),

    #[error("Payment provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl PaymentError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn session_not_payable(session_id: SessionId, reason: impl Into<String>) -> Self {
        PaymentError::SessionNotPayable {
            session_id,
            reason: reason.into(),
        }
    }

    pub fn invalid_state(current: PaymentStatus, attempted: impl Into<String>) -> Self {
        PaymentError::InvalidState {
            current,
            attempted: attempted.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        PaymentError::InvariantViolation(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::NotFound(_) | PaymentError::NotFoundForProvider(_) => {
                ErrorCode::PaymentNotFound
            }
            PaymentError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            PaymentError::SessionNotPayable { .. } | PaymentError::Validation { .. } => {
                ErrorCode::ValidationFailed
            }
            PaymentError::InvalidAmount(_) => ErrorCode::InvalidAmount,
            PaymentError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            PaymentError::InvariantViolation(_) => ErrorCode::InvariantViolation,
            PaymentError::ProviderRejected(_) => ErrorCode::ProviderRejected,
            PaymentError::ProviderUnavailable(_) => ErrorCode::ProviderUnavailable,
            PaymentError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Transient failures that a caller may retry unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::ProviderUnavailable(_) | PaymentError::Infrastructure(_)
        )
    }
}

impl From<DomainError> for PaymentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => PaymentError::Validation {
                field: err.field.unwrap_or_default(),
                message: err.message,
            },
            _ => PaymentError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for PaymentError {
    fn from(err: ValidationError) -> Self {
        PaymentError::validation(err.field().to_string(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_unavailable_is_retryable() {
        assert!(PaymentError::ProviderUnavailable("timeout".into()).is_retryable());
        assert!(!PaymentError::invariant("refund too large").is_retryable());
    }

    #[test]
    fn codes_follow_taxonomy() {
        assert_eq!(
            PaymentError::invariant("x").code(),
            ErrorCode::InvariantViolation
        );
        assert_eq!(
            PaymentError::InvalidAmount("below minimum".into()).code(),
            ErrorCode::InvalidAmount
        );
        assert_eq!(
            PaymentError::invalid_state(PaymentStatus::Failed, "refund").code(),
            ErrorCode::InvalidStateTransition
        );
    }

    #[test]
    fn invalid_state_displays_status() {
        let err = PaymentError::invalid_state(PaymentStatus::Failed, "refund");
        assert_eq!(err.to_string(), "Cannot refund a payment in status failed");
    }

    #[test]
    fn database_domain_error_maps_to_infrastructure() {
        let err: PaymentError = DomainError::database("connection reset").into();
        assert!(matches!(err, PaymentError::Infrastructure(_)));
    }
}
