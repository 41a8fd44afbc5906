//! Request and response DTOs for payment endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::payments::{RefundOutcome, WebhookOutcome};
use crate::domain::foundation::Timestamp;
use crate::domain::payment::{Payment, PaymentMethod, PaymentProvider, PaymentStatus, Refund};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub session_id: Uuid,
    pub provider: PaymentProvider,
    #[serde(default)]
    pub method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub session_id: Uuid,
    pub provider_payment_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundPaymentRequest {
    /// Minor units in the ledger currency.
    pub amount: i64,
    pub reference: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Paymob signs its callbacks through the `hmac` query parameter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookQuery {
    #[serde(default)]
    pub hmac: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub mentee_id: Uuid,
    pub mentor_id: Uuid,
    pub provider: PaymentProvider,
    pub method: Option<PaymentMethod>,
    pub status: PaymentStatus,
    pub amount: i64,
    pub currency: String,
    pub charge_amount: i64,
    pub charge_currency: String,
    pub platform_commission: i64,
    pub mentor_payout_amount: i64,
    pub refunded_amount: i64,
    pub provider_payment_id: Option<String>,
    /// Client secret (Stripe) or iframe URL (Paymob).
    pub checkout: Option<String>,
    pub failure_reason: Option<String>,
    pub paid_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<&Payment> for PaymentResponse {
    fn from(p: &Payment) -> Self {
        Self {
            id: *p.id.as_uuid(),
            session_id: *p.session_id.as_uuid(),
            mentee_id: *p.mentee_id.as_uuid(),
            mentor_id: *p.mentor_id.as_uuid(),
            provider: p.provider,
            method: p.method,
            status: p.status,
            amount: p.amount.amount(),
            currency: p.amount.currency().code().to_string(),
            charge_amount: p.charge.amount(),
            charge_currency: p.charge.currency().code().to_string(),
            platform_commission: p.platform_commission,
            mentor_payout_amount: p.mentor_payout_amount,
            refunded_amount: p.refund_amount.unwrap_or(0),
            provider_payment_id: p.provider_payment_id.clone(),
            checkout: p.checkout.clone(),
            failure_reason: p.failure_reason.clone(),
            paid_at: p.paid_at,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundView {
    pub reference: String,
    pub amount: i64,
    pub refund_transaction_id: Option<String>,
    pub refunded_at: Timestamp,
}

impl From<&Refund> for RefundView {
    fn from(r: &Refund) -> Self {
        Self {
            reference: r.reference.clone(),
            amount: r.amount,
            refund_transaction_id: r.refund_transaction_id.clone(),
            refunded_at: r.refunded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResponse {
    pub payment: PaymentResponse,
    pub refund: RefundView,
    pub already_refunded: bool,
}

impl From<RefundOutcome> for RefundResponse {
    fn from(outcome: RefundOutcome) -> Self {
        Self {
            payment: PaymentResponse::from(&outcome.payment),
            refund: RefundView::from(&outcome.refund),
            already_refunded: outcome.already_refunded,
        }
    }
}

/// Acknowledgement returned to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAckResponse {
    /// `processed`, `duplicate` or `ignored`.
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<WebhookOutcome> for WebhookAckResponse {
    fn from(outcome: WebhookOutcome) -> Self {
        match outcome {
            WebhookOutcome::Processed { payment_id, status } => Self {
                result: "processed".to_string(),
                payment_id: Some(*payment_id.as_uuid()),
                status: Some(status),
                reason: None,
            },
            WebhookOutcome::Duplicate => Self {
                result: "duplicate".to_string(),
                payment_id: None,
                status: None,
                reason: None,
            },
            WebhookOutcome::Ignored { reason } => Self {
                result: "ignored".to_string(),
                payment_id: None,
                status: None,
                reason: Some(reason),
            },
        }
    }
}
