//! Webhook error types for provider callback handling.
//!
//! Every variant maps to a status code that tells the provider whether to
//! redeliver: 2xx acknowledged, 4xx never retried, 5xx retried.

use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// Signature or HMAC did not match.
    #[error("Invalid signature")]
    InvalidSignature,

    /// No signature header or query parameter was supplied.
    #[error("Missing signature")]
    MissingSignature,

    /// Signed timestamp is older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signed timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Payload or signature header could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from the payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The `{provider}` path segment names no known provider.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// No payment matches the provider reference yet.
    #[error("Payment not found for provider reference {0}")]
    PaymentNotFound(String),

    /// Callback contradicts recorded state (amount mismatch, success after failure).
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// The provider could not be reached while handling the callback.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Storage failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the provider should redeliver this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_)
                | WebhookError::ProviderUnavailable(_)
                | WebhookError::PaymentNotFound(_)
        )
    }

    /// Security rejections are logged and never retried.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature
                | WebhookError::MissingSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::MissingSignature
            | WebhookError::TimestampOutOfRange => StatusCode::UNAUTHORIZED,

            WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            WebhookError::UnknownProvider(_) => StatusCode::NOT_FOUND,

            WebhookError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,

            WebhookError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            WebhookError::PaymentNotFound(_) | WebhookError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::TimestampOutOfRange => "TIMESTAMP_OUT_OF_RANGE",
            WebhookError::InvalidTimestamp => "INVALID_TIMESTAMP",
            WebhookError::ParseError(_) => "PARSE_ERROR",
            WebhookError::MissingField(_) => "MISSING_FIELD",
            WebhookError::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            WebhookError::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            WebhookError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            WebhookError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            WebhookError::Database(_) => "DATABASE_ERROR",
        }
    }
}
