//! HTTP error mapping.
//!
//! Every module error funnels through `ApiError`, which owns the one table
//! from `ErrorCode` to HTTP status.
//!
//! | Code | HTTP Status |
//! |------|-------------|
//! | VALIDATION_FAILED / INVALID_AMOUNT | 422 |
//! | *_NOT_FOUND | 404 |
//! | INVALID_STATE_TRANSITION / CONFLICT / INSUFFICIENT_BALANCE / INVARIANT_VIOLATION | 409 |
//! | PROVIDER_REJECTED | 402 |
//! | UNAUTHORIZED / INVALID_SIGNATURE | 401 |
//! | FORBIDDEN | 403 |
//! | PROVIDER_UNAVAILABLE | 503 |
//! | DATABASE_ERROR / INTERNAL_ERROR | 500 |
//!
//! Webhook errors keep their own status codes because the provider reads
//! them as redelivery instructions.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::dispute::DisputeError;
use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};
use crate::domain::ledger::LedgerError;
use crate::domain::payment::PaymentError;
use crate::domain::payout::PayoutError;
use crate::domain::webhook::WebhookError;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable code for programmatic handling.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: String,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    fn from_code(code: ErrorCode, message: String) -> Self {
        Self::new(status_for(code), code.to_string(), message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::Unauthorized, message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::Forbidden, message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::ValidationFailed, message.into())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationFailed | ErrorCode::InvalidAmount => StatusCode::UNPROCESSABLE_ENTITY,

        ErrorCode::PaymentNotFound
        | ErrorCode::SessionNotFound
        | ErrorCode::BalanceNotFound
        | ErrorCode::PayoutNotFound
        | ErrorCode::DisputeNotFound => StatusCode::NOT_FOUND,

        ErrorCode::InvalidStateTransition
        | ErrorCode::Conflict
        | ErrorCode::InsufficientBalance
        | ErrorCode::InvariantViolation => StatusCode::CONFLICT,

        ErrorCode::DuplicateEvent => StatusCode::OK,

        ErrorCode::InvalidSignature | ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,

        ErrorCode::ProviderRejected => StatusCode::PAYMENT_REQUIRED,
        ErrorCode::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,

        ErrorCode::DatabaseError | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self::from_code(err.code(), err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::from_code(err.code(), err.to_string())
    }
}

impl From<PayoutError> for ApiError {
    fn from(err: PayoutError) -> Self {
        Self::from_code(err.code(), err.to_string())
    }
}

impl From<DisputeError> for ApiError {
    fn from(err: DisputeError) -> Self {
        Self::from_code(err.code(), err.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::from_code(err.code, err.message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        Self::new(err.status_code(), err.code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() || self.code == "INVARIANT_VIOLATION" {
            tracing::error!(code = %self.code, status = %self.status, message = %self.message, "Request failed");
        } else {
            tracing::debug!(code = %self.code, status = %self.status, message = %self.message, "Request rejected");
        }

        let body = ErrorResponse::new(self.code, self.message);
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{MentorId, PayoutId};

    #[test]
    fn insufficient_balance_is_conflict() {
        let err: ApiError = PayoutError::from(LedgerError::InsufficientBalance {
            mentor_id: MentorId::new(),
            requested: 10_000,
            available: 0,
        })
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "INSUFFICIENT_BALANCE");
    }

    #[test]
    fn provider_errors_map_to_gateway_statuses() {
        let unavailable: ApiError = PaymentError::ProviderUnavailable("timeout".into()).into();
        let rejected: ApiError = PaymentError::ProviderRejected("declined".into()).into();
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(rejected.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn validation_is_unprocessable() {
        let err: ApiError = PaymentError::validation("provider", "unknown").into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn webhook_errors_keep_their_status() {
        let err: ApiError = WebhookError::InvalidSignature.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "INVALID_SIGNATURE");

        let err: ApiError = WebhookError::PaymentNotFound("ord_1".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_payout_is_not_found() {
        let err: ApiError = PayoutError::NotFound(PayoutId::new()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
