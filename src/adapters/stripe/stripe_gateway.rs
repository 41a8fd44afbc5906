//! Stripe payment gateway adapter.
//!
//! Implements `PaymentGateway` over the PaymentIntents and Refunds APIs and
//! verifies `Stripe-Signature` webhook headers.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{Currency, Money};
use crate::domain::payment::{CallbackStatus, PaymentProvider};
use crate::domain::webhook::WebhookError;
use crate::ports::{
    CallbackResult, CreatedIntent, GatewayError, IntentRequest, PaymentGateway, ProviderStatus,
    RefundRequest, RefundResult,
};

use super::webhook_types::{
    SignatureHeader, SignatureParseError, StripeApiError, StripePaymentIntent,
    StripeRefund, StripeWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Stripe refuses charges below 50 cents.
const MINIMUM_CHARGE: Money = Money::from_minor(50, Currency::Usd);

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Whether to require livemode events in production.
    require_livemode: bool,
}

impl StripeConfig {
    pub fn new(api_key: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            api_key,
            webhook_secret,
            api_base_url: "https://api.stripe.com".to_string(),
            require_livemode: false,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Require livemode events in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe payment gateway.
pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Verify webhook signature using HMAC-SHA256 against the given clock.
    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
        now: i64,
    ) -> Result<(), WebhookError> {
        // 1. Validate timestamp (prevent replay attacks)
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Stripe webhook too old - possible replay"
            );
            return Err(WebhookError::TimestampOutOfRange);
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Stripe webhook from the future - clock skew or manipulation"
            );
            return Err(WebhookError::InvalidTimestamp);
        }

        // 2. Compute expected signature over "t.payload"
        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        // 3. Constant-time comparison against every v1 entry
        let expected_bytes: &[u8] = expected.as_slice();
        let matched = header
            .v1_signatures
            .iter()
            .fold(0u8, |acc, provided| acc | expected_bytes.ct_eq(provided).unwrap_u8());

        if matched != 1 {
            tracing::warn!(
                timestamp = header.timestamp,
                candidates = header.v1_signatures.len(),
                "Invalid Stripe webhook signature"
            );
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }

    /// Parse a verified Stripe event into a provider-neutral callback.
    fn parse_event(&self, payload: &[u8]) -> Result<CallbackResult, WebhookError> {
        let raw: serde_json::Value = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe webhook payload");
            WebhookError::ParseError(format!("Invalid JSON: {}", e))
        })?;
        let event: StripeWebhookEvent = serde_json::from_value(raw.clone())
            .map_err(|e| WebhookError::ParseError(format!("Invalid event: {}", e)))?;

        if self.config.require_livemode && !event.livemode {
            tracing::warn!(event_id = %event.id, "Rejected Stripe test mode event");
            return Err(WebhookError::ParseError(
                "Test mode events not accepted".to_string(),
            ));
        }

        let status = match event.event_type.as_str() {
            "payment_intent.succeeded" => Some(CallbackStatus::Succeeded),
            "payment_intent.payment_failed" | "payment_intent.canceled" => {
                Some(CallbackStatus::Failed)
            }
            "payment_intent.processing" | "payment_intent.requires_action" => {
                Some(CallbackStatus::Pending)
            }
            _ => None,
        };

        let mut result = CallbackResult {
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            success: false,
            provider_payment_id: event
                .data
                .object
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            transaction_id: None,
            status,
            amount: None,
            currency: None,
            raw,
        };

        if status.is_some() {
            let intent: StripePaymentIntent = serde_json::from_value(event.data.object.clone())
                .map_err(|e| WebhookError::ParseError(format!("Invalid payment intent: {}", e)))?;
            let success = status == Some(CallbackStatus::Succeeded);
            result.success = success;
            result.transaction_id = intent
                .latest_charge
                .clone()
                .or_else(|| success.then(|| intent.id.clone()));
            result.amount = Some(if success {
                intent.amount_received
            } else {
                intent.amount
            });
            result.currency = Some(intent.currency.to_uppercase());
            result.provider_payment_id = intent.id;
        }

        Ok(result)
    }

    async fn post_form(
        &self,
        path: &str,
        params: &[(&str, String)],
        idempotency_key: &str,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}{}", self.config.api_base_url, path);
        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", idempotency_key)
            .form(params)
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(format!("Stripe request failed: {}", e)))?;
        check_response(response).await
    }
}

/// Turns a non-2xx Stripe response into a gateway error.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!(status = %status, body = %body, "Stripe API error");
    let detail = serde_json::from_str::<StripeApiError>(&body).ok().map(|e| e.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("Stripe returned {}", status));

    let err = classify_status(status.as_u16(), message);
    Err(match detail.and_then(|d| d.code) {
        Some(code) => err.with_provider_code(code),
        None => err,
    })
}

fn classify_status(status: u16, message: String) -> GatewayError {
    match status {
        401 | 403 => GatewayError::authentication(message),
        402 => GatewayError::declined(message),
        404 => GatewayError::not_found(message),
        429 | 500..=599 => GatewayError::unavailable(message),
        _ => GatewayError::declined(message),
    }
}

/// Maps a PaymentIntent status string to a settlement state.
fn intent_status(intent: &StripePaymentIntent) -> CallbackStatus {
    match intent.status.as_str() {
        "succeeded" => CallbackStatus::Succeeded,
        "canceled" => CallbackStatus::Failed,
        "requires_payment_method" if intent.last_payment_error.is_some() => CallbackStatus::Failed,
        _ => CallbackStatus::Pending,
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Stripe
    }

    fn minimum_charge(&self) -> Money {
        MINIMUM_CHARGE
    }

    async fn create_intent(&self, request: IntentRequest) -> Result<CreatedIntent, GatewayError> {
        if request.charge.currency() != Currency::Usd {
            return Err(GatewayError::invalid_amount(format!(
                "Stripe charges in USD, got {}",
                request.charge.currency()
            )));
        }
        if request.charge.amount() < MINIMUM_CHARGE.amount() {
            return Err(GatewayError::invalid_amount(format!(
                "{} is below the Stripe minimum of {}",
                request.charge, MINIMUM_CHARGE
            )));
        }

        let mut params = vec![
            ("amount", request.charge.amount().to_string()),
            ("currency", "usd".to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[payment_id]", request.payment_id.to_string()),
            ("description", request.context.description.clone()),
        ];
        if let Some(session_id) = request.context.session_id {
            params.push(("metadata[session_id]", session_id.to_string()));
        }
        if let Some(email) = &request.context.payer_email {
            params.push(("receipt_email", email.clone()));
        }

        let idempotency_key = format!("intent:{}", request.payment_id);
        let response = self
            .post_form("/v1/payment_intents", &params, &idempotency_key)
            .await?;
        let intent: StripePaymentIntent = response.json().await.map_err(|e| {
            GatewayError::invalid_response(format!("Failed to parse Stripe response: {}", e))
        })?;

        tracing::info!(
            payment_id = %request.payment_id,
            provider_payment_id = %intent.id,
            "Stripe payment intent created"
        );

        Ok(CreatedIntent {
            provider_payment_id: intent.id,
            checkout: intent.client_secret,
        })
    }

    fn parse_callback(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<CallbackResult, WebhookError> {
        // 1. Parse signature header
        let signature = signature.ok_or(WebhookError::MissingSignature)?;
        let header = SignatureHeader::parse(signature).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            match e {
                SignatureParseError::MissingHeader => WebhookError::MissingSignature,
                other => WebhookError::ParseError(other.to_string()),
            }
        })?;

        // 2. Verify signature (includes timestamp validation)
        self.verify_signature(payload, &header, chrono::Utc::now().timestamp())?;

        // 3. Parse and convert event
        let result = self.parse_event(payload)?;

        tracing::debug!(
            event_id = %result.event_id,
            event_type = %result.event_type,
            "Stripe webhook signature verified"
        );

        Ok(result)
    }

    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, GatewayError> {
        let params = vec![
            ("payment_intent", request.provider_payment_id.clone()),
            ("amount", request.amount.amount().to_string()),
            ("metadata[reference]", request.idempotency_key.clone()),
        ];

        let response = self
            .post_form("/v1/refunds", &params, &request.idempotency_key)
            .await?;
        let refund: StripeRefund = response.json().await.map_err(|e| {
            GatewayError::invalid_response(format!("Failed to parse Stripe refund: {}", e))
        })?;

        Ok(RefundResult {
            success: matches!(refund.status.as_str(), "succeeded" | "pending"),
            refund_transaction_id: Some(refund.id),
            refunded_amount: refund.amount,
        })
    }

    async fn get_status(&self, provider_payment_id: &str) -> Result<ProviderStatus, GatewayError> {
        let url = format!(
            "{}/v1/payment_intents/{}",
            self.config.api_base_url, provider_payment_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(format!("Stripe request failed: {}", e)))?;
        let response = check_response(response).await?;

        let intent: StripePaymentIntent = response.json().await.map_err(|e| {
            GatewayError::invalid_response(format!("Failed to parse Stripe response: {}", e))
        })?;

        let status = intent_status(&intent);
        Ok(ProviderStatus {
            status,
            transaction_id: match status {
                CallbackStatus::Succeeded => intent.latest_charge.or(Some(intent.id)),
                _ => None,
            },
            amount: Some(intent.amount_received),
        })
    }
}
