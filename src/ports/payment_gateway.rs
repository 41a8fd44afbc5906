//! Payment gateway port for external payment providers.
//!
//! Each provider adapter implements this once. Adapters hold no mutable
//! state and are shared across concurrent requests.
//!
//! # Design
//!
//! - **Provider-neutral**: callers see `CallbackResult` and `ProviderStatus`,
//!   never provider JSON
//! - **Verify first**: `parse_callback` authenticates before reading business fields
//! - **Idempotent**: intent creation and refunds carry idempotency references

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Money, PaymentId, SessionId};
use crate::domain::payment::{CallbackStatus, PaymentMethod, PaymentProvider};
use crate::domain::webhook::WebhookError;

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Which provider this adapter talks to.
    fn provider(&self) -> PaymentProvider;

    /// Smallest chargeable amount, in the provider's charge currency.
    fn minimum_charge(&self) -> Money;

    /// Creates a provider-side intent for `request.charge`.
    async fn create_intent(&self, request: IntentRequest) -> Result<CreatedIntent, GatewayError>;

    /// Authenticates and maps a raw callback.
    ///
    /// `signature` is the header value or query parameter the provider signs with.
    fn parse_callback(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<CallbackResult, WebhookError>;

    /// Returns `request.amount` of a settled charge to the payer.
    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, GatewayError>;

    /// Polls the provider for the current settlement state.
    async fn get_status(&self, provider_payment_id: &str) -> Result<ProviderStatus, GatewayError>;
}

/// Who is paying, for the provider's billing data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: Option<SessionId>,
    pub description: String,
    pub payer_email: Option<String>,
    pub payer_name: Option<String>,
    /// Required by mobile wallets.
    pub payer_phone: Option<String>,
}

/// Request to open an intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRequest {
    /// Our payment id; used as merchant reference and idempotency key.
    pub payment_id: PaymentId,
    /// Amount in the provider's charge currency.
    pub charge: Money,
    pub method: Option<PaymentMethod>,
    pub context: SessionContext,
}

/// The provider accepted the intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIntent {
    pub provider_payment_id: String,
    /// Client secret or redirect URL.
    pub checkout: Option<String>,
}

/// Provider-neutral view of a verified callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackResult {
    /// Provider's delivery id, used to record the callback as processed.
    pub event_id: String,
    /// Provider event type, for audit.
    pub event_type: String,
    pub success: bool,
    pub provider_payment_id: String,
    pub transaction_id: Option<String>,
    /// `None` when the event does not concern payment settlement.
    pub status: Option<CallbackStatus>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub provider_payment_id: String,
    /// Settled transaction to refund against (required by some providers).
    pub transaction_id: Option<String>,
    /// Amount in the provider's charge currency.
    pub amount: Money,
    /// Stable key so a retried refund is not executed twice.
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResult {
    pub success: bool,
    pub refund_transaction_id: Option<String>,
    pub refunded_amount: i64,
}

/// Result of a status poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub status: CallbackStatus,
    pub transaction_id: Option<String>,
    pub amount: Option<i64>,
}

/// Gateway error with code and retryability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
    /// Provider's own error code, when it sent one.
    pub provider_code: Option<String>,
    pub retryable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorCode {
    /// Transport failure or 5xx from the provider.
    Unavailable,
    /// Credentials rejected.
    Authentication,
    /// Below the provider minimum or otherwise unacceptable.
    InvalidAmount,
    /// The provider refused the operation.
    Declined,
    NotFound,
    /// Response did not have the expected shape.
    InvalidResponse,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        let retryable = matches!(code, GatewayErrorCode::Unavailable);
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Unavailable, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Authentication, message)
    }

    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidAmount, message)
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Declined, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NotFound, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidResponse, message)
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Transport and credential failures both surface as "provider unavailable".
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self.code,
            GatewayErrorCode::Unavailable | GatewayErrorCode::Authentication
        )
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provider_code {
            Some(code) => write!(f, "{:?} ({}): {}", self.code, code, self.message),
            None => write!(f, "{:?}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for GatewayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn accepts_dyn(_: &dyn PaymentGateway) {}

    #[test]
    fn only_transport_failures_are_retryable() {
        assert!(GatewayError::unavailable("timeout").retryable);
        assert!(!GatewayError::declined("card declined").retryable);
        assert!(!GatewayError::invalid_amount("too small").retryable);
    }

    #[test]
    fn authentication_counts_as_unavailable() {
        assert!(GatewayError::authentication("bad key").is_unavailable());
        assert!(!GatewayError::not_found("pi_x").is_unavailable());
    }

    #[test]
    fn display_includes_provider_code() {
        let err = GatewayError::declined("insufficient funds").with_provider_code("card_declined");
        assert_eq!(err.to_string(), "Declined (card_declined): insufficient funds");
    }
}
