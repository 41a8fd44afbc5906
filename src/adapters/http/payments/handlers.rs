//! HTTP handlers for payment endpoints.

use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::adapters::http::auth::{AuthenticatedUser, Role};
use crate::adapters::http::error::ApiError;
use crate::adapters::http::state::AppState;
use crate::application::payments::{
    ConfirmPaymentCommand, CreatePaymentIntentCommand, RefundPaymentCommand, WebhookCommand,
};
use crate::domain::foundation::{PaymentId, SessionId};
use crate::domain::payment::{Payment, PaymentProvider};
use crate::domain::webhook::WebhookError;

use super::dto::{
    ConfirmPaymentRequest, CreatePaymentIntentRequest, PaymentResponse, RefundPaymentRequest,
    RefundResponse, WebhookAckResponse, WebhookQuery,
};

pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

fn can_view(user: &AuthenticatedUser, payment: &Payment) -> bool {
    user.is_admin()
        || *payment.mentee_id.as_uuid() == user.id
        || *payment.mentor_id.as_uuid() == user.id
}

/// POST /payments/intents - Open the payment for a booked session
pub async fn create_payment_intent(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(Role::Mentee)?;

    let payment = state
        .orchestrator()
        .create_payment_intent(CreatePaymentIntentCommand {
            session_id: SessionId::from_uuid(request.session_id),
            mentee_id: user.user_id(),
            provider: request.provider,
            method: request.method,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentResponse::from(&payment))))
}

/// POST /payments/confirm - Confirm after the client finished checkout
pub async fn confirm_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = SessionId::from_uuid(request.session_id);
    if let Some(live) = state.payments.find_live_by_session(session_id).await? {
        if !can_view(&user, &live) {
            return Err(ApiError::forbidden("Not allowed to confirm this payment"));
        }
    }

    let payment = state
        .orchestrator()
        .confirm(ConfirmPaymentCommand {
            provider_payment_id: request.provider_payment_id,
            session_id,
        })
        .await?;

    Ok(Json(PaymentResponse::from(&payment)))
}

/// GET /payments/:id - Current payment status
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = state
        .orchestrator()
        .get_payment_status(PaymentId::from_uuid(payment_id))
        .await?;

    if !can_view(&user, &payment) {
        return Err(ApiError::forbidden("Not allowed to view this payment"));
    }

    Ok(Json(PaymentResponse::from(&payment)))
}

/// POST /payments/:id/refunds - Refund part or all of a settled payment (admin)
pub async fn refund_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(payment_id): Path<Uuid>,
    Json(request): Json<RefundPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;

    let outcome = state
        .orchestrator()
        .refund_with_clawback(RefundPaymentCommand {
            payment_id: PaymentId::from_uuid(payment_id),
            amount: request.amount,
            reference: request.reference,
            triggering_transaction_id: request.transaction_id,
        })
        .await?;

    let status = if outcome.already_refunded {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(RefundResponse::from(outcome))))
}

/// POST /payments/webhooks/:provider - Provider settlement callbacks
///
/// The status code tells the provider whether to redeliver: 2xx for
/// processed, duplicate or ignored events, 4xx for deliveries that will
/// never succeed, 5xx for transient failures.
pub async fn handle_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let provider = PaymentProvider::from_str(&provider)
        .map_err(|_| WebhookError::UnknownProvider(provider.clone()))?;

    let signature = match provider {
        PaymentProvider::Stripe => headers
            .get(STRIPE_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        PaymentProvider::Paymob => query.hmac,
    };

    let outcome = state
        .webhook_reconciler()
        .handle(WebhookCommand {
            provider,
            payload: body.to_vec(),
            signature,
        })
        .await?;

    Ok((StatusCode::OK, Json(WebhookAckResponse::from(outcome))))
}
