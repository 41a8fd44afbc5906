//! Paymob Accept gateway adapter.
//!
//! Implements `PaymentGateway` for the regional card/wallet gateway. An intent
//! takes three calls (auth token, order, payment key) plus a fourth for
//! wallets. The Paymob order id is the provider payment id.
//!
//! # Security
//!
//! - Callback HMAC-SHA512 verified with constant-time comparison
//! - Secrets handled via `secrecy::SecretString`

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::adapters::hex;
use crate::domain::foundation::{Currency, Money};
use crate::domain::payment::{CallbackStatus, PaymentMethod, PaymentProvider};
use crate::domain::webhook::WebhookError;
use crate::ports::{
    CallbackResult, CreatedIntent, GatewayError, IntentRequest, PaymentGateway, ProviderStatus,
    RefundRequest, RefundResult,
};

use super::callback_types::{
    hmac_message, AuthTokenResponse, BillingData, OrderResponse, PaymentKeyResponse,
    PaymobCallback, PaymobTransaction, WalletPayResponse,
};

type HmacSha512 = Hmac<Sha512>;

/// Paymob refuses charges below 1 EGP.
const MINIMUM_CHARGE: Money = Money::from_minor(100, Currency::Egp);

/// Payment keys expire after an hour.
const PAYMENT_KEY_EXPIRATION_SECS: u32 = 3_600;

/// Paymob Accept configuration.
#[derive(Clone)]
pub struct PaymobConfig {
    api_key: SecretString,
    hmac_secret: SecretString,
    card_integration_id: i64,
    wallet_integration_id: i64,
    iframe_id: String,
    api_base_url: String,
}

impl PaymobConfig {
    pub fn new(
        api_key: SecretString,
        hmac_secret: SecretString,
        card_integration_id: i64,
        wallet_integration_id: i64,
        iframe_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key,
            hmac_secret,
            card_integration_id,
            wallet_integration_id,
            iframe_id: iframe_id.into(),
            api_base_url: "https://accept.paymob.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    fn integration_id(&self, method: PaymentMethod) -> i64 {
        match method {
            PaymentMethod::Card => self.card_integration_id,
            PaymentMethod::Wallet => self.wallet_integration_id,
        }
    }
}

/// Paymob payment gateway.
pub struct PaymobGateway {
    config: PaymobConfig,
    http_client: reqwest::Client,
}

impl PaymobGateway {
    pub fn new(config: PaymobConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Checks the `hmac` query value against the transaction object.
    fn verify_hmac(&self, obj: &serde_json::Value, provided: &str) -> Result<(), WebhookError> {
        let provided = hex::decode(provided).ok_or_else(|| {
            WebhookError::ParseError("hmac is not valid hex".to_string())
        })?;

        let mut mac = HmacSha512::new_from_slice(self.config.hmac_secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(hmac_message(obj).as_bytes());
        let expected = mac.finalize().into_bytes();

        if expected.as_slice().ct_eq(&provided).unwrap_u8() != 1 {
            tracing::warn!(
                transaction_id = obj.get("id").map(|v| v.to_string()).unwrap_or_default(),
                "Invalid Paymob callback HMAC"
            );
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.config.api_base_url, path);
        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(format!("Paymob request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(path, status = %status, body = %text, "Paymob API error");
            return Err(classify_status(status.as_u16(), text));
        }

        response.json().await.map_err(|e| {
            GatewayError::invalid_response(format!("Failed to parse Paymob response: {}", e))
        })
    }

    async fn auth_token(&self) -> Result<String, GatewayError> {
        let response: AuthTokenResponse = self
            .post_json(
                "/api/auth/tokens",
                json!({ "api_key": self.config.api_key.expose_secret() }),
            )
            .await?;
        Ok(response.token)
    }

    fn iframe_url(&self, payment_token: &str) -> String {
        format!(
            "{}/api/acceptance/iframes/{}?payment_token={}",
            self.config.api_base_url, self.config.iframe_id, payment_token
        )
    }
}

fn classify_status(status: u16, body: String) -> GatewayError {
    let message = format!("Paymob returned {}: {}", status, body);
    match status {
        401 | 403 => GatewayError::authentication(message),
        404 => GatewayError::not_found(message),
        429 | 500..=599 => GatewayError::unavailable(message),
        _ => GatewayError::declined(message),
    }
}

fn parse_transaction_id(transaction_id: &str) -> Result<i64, GatewayError> {
    transaction_id.parse().map_err(|_| {
        GatewayError::invalid_response(format!(
            "Paymob transaction id '{}' is not numeric",
            transaction_id
        ))
    })
}

#[async_trait]
impl PaymentGateway for PaymobGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Paymob
    }

    fn minimum_charge(&self) -> Money {
        MINIMUM_CHARGE
    }

    async fn create_intent(&self, request: IntentRequest) -> Result<CreatedIntent, GatewayError> {
        if request.charge.currency() != Currency::Egp {
            return Err(GatewayError::invalid_amount(format!(
                "Paymob charges in EGP, got {}",
                request.charge.currency()
            )));
        }
        if request.charge.amount() < MINIMUM_CHARGE.amount() {
            return Err(GatewayError::invalid_amount(format!(
                "{} is below the Paymob minimum of {}",
                request.charge, MINIMUM_CHARGE
            )));
        }

        let method = request.method.unwrap_or(PaymentMethod::Card);
        let phone = request.context.payer_phone.as_deref();
        if method == PaymentMethod::Wallet && phone.is_none() {
            return Err(GatewayError::declined(
                "wallet payments need the payer's phone number",
            ));
        }

        // 1. Auth token
        let token = self.auth_token().await?;

        // 2. Order
        let order: OrderResponse = self
            .post_json(
                "/api/ecommerce/orders",
                json!({
                    "auth_token": token,
                    "delivery_needed": false,
                    "amount_cents": request.charge.amount(),
                    "currency": "EGP",
                    "merchant_order_id": request.payment_id.to_string(),
                    "items": [],
                }),
            )
            .await?;

        // 3. Payment key
        let billing = BillingData::new(
            request.context.payer_name.as_deref(),
            request.context.payer_email.as_deref(),
            phone,
        );
        let key: PaymentKeyResponse = self
            .post_json(
                "/api/acceptance/payment_keys",
                json!({
                    "auth_token": token,
                    "amount_cents": request.charge.amount(),
                    "expiration": PAYMENT_KEY_EXPIRATION_SECS,
                    "order_id": order.id,
                    "billing_data": billing,
                    "currency": "EGP",
                    "integration_id": self.config.integration_id(method),
                }),
            )
            .await?;

        // 4. Checkout handle
        let checkout = match method {
            PaymentMethod::Card => self.iframe_url(&key.token),
            PaymentMethod::Wallet => {
                let pay: WalletPayResponse = self
                    .post_json(
                        "/api/acceptance/payments/pay",
                        json!({
                            "source": { "identifier": phone, "subtype": "WALLET" },
                            "payment_token": key.token,
                        }),
                    )
                    .await?;
                pay.redirect_url
                    .filter(|u| !u.is_empty())
                    .or(pay.iframe_redirection_url)
                    .ok_or_else(|| {
                        GatewayError::invalid_response("Paymob wallet pay returned no redirect URL")
                    })?
            }
        };

        tracing::info!(
            payment_id = %request.payment_id,
            order_id = order.id,
            method = method.as_str(),
            "Paymob order created"
        );

        Ok(CreatedIntent {
            provider_payment_id: order.id.to_string(),
            checkout: Some(checkout),
        })
    }

    fn parse_callback(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<CallbackResult, WebhookError> {
        let signature = signature
            .filter(|s| !s.trim().is_empty())
            .ok_or(WebhookError::MissingSignature)?;

        // The HMAC covers fields of `obj`, so the envelope has to be read
        // before verification; nothing else is interpreted until it passes.
        let raw: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(format!("Invalid JSON: {}", e)))?;
        let callback: PaymobCallback = serde_json::from_value(raw.clone())
            .map_err(|e| WebhookError::ParseError(format!("Invalid callback: {}", e)))?;

        self.verify_hmac(&callback.obj, signature)?;

        if callback.callback_type != "TRANSACTION" {
            return Ok(CallbackResult {
                event_id: format!(
                    "{}:{}",
                    callback.callback_type.to_lowercase(),
                    callback.obj.get("id").map(|v| v.to_string()).unwrap_or_default()
                ),
                event_type: callback.callback_type,
                success: false,
                provider_payment_id: String::new(),
                transaction_id: None,
                status: None,
                amount: None,
                currency: None,
                raw,
            });
        }

        let txn: PaymobTransaction = serde_json::from_value(callback.obj)
            .map_err(|e| WebhookError::ParseError(format!("Invalid transaction: {}", e)))?;

        let status = txn.callback_status();
        // Refund/void transactions are our own refunds echoing back.
        let settlement = (!txn.is_adjustment()).then_some(status);
        let state = match status {
            CallbackStatus::Pending => "pending",
            CallbackStatus::Succeeded => "succeeded",
            CallbackStatus::Failed => "failed",
        };

        Ok(CallbackResult {
            event_id: format!("{}:{}", txn.id, state),
            event_type: callback.callback_type,
            success: status == CallbackStatus::Succeeded,
            provider_payment_id: txn.order.id.to_string(),
            transaction_id: Some(txn.id.to_string()),
            status: settlement,
            amount: Some(txn.amount_cents),
            currency: txn.currency,
            raw,
        })
    }

    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, GatewayError> {
        let transaction_id = request.transaction_id.as_deref().ok_or_else(|| {
            GatewayError::declined("Paymob refunds need the settled transaction id")
        })?;
        let transaction_id = parse_transaction_id(transaction_id)?;

        let token = self.auth_token().await?;
        let txn: PaymobTransaction = self
            .post_json(
                "/api/acceptance/void_refund/refund",
                json!({
                    "auth_token": token,
                    "transaction_id": transaction_id,
                    "amount_cents": request.amount.amount(),
                }),
            )
            .await?;

        tracing::info!(
            order_id = %request.provider_payment_id,
            refund_transaction_id = txn.id,
            reference = %request.idempotency_key,
            success = txn.success,
            "Paymob refund submitted"
        );

        Ok(RefundResult {
            success: txn.success || txn.pending,
            refund_transaction_id: Some(txn.id.to_string()),
            refunded_amount: txn.amount_cents,
        })
    }

    async fn get_status(&self, provider_payment_id: &str) -> Result<ProviderStatus, GatewayError> {
        let order_id: i64 = provider_payment_id.parse().map_err(|_| {
            GatewayError::not_found(format!("'{}' is not a Paymob order id", provider_payment_id))
        })?;

        let token = self.auth_token().await?;
        let txn: PaymobTransaction = self
            .post_json(
                "/api/ecommerce/orders/transaction_inquiry",
                json!({ "auth_token": token, "order_id": order_id }),
            )
            .await?;

        let status = txn.callback_status();
        Ok(ProviderStatus {
            status,
            transaction_id: (status == CallbackStatus::Succeeded).then(|| txn.id.to_string()),
            amount: Some(txn.amount_cents),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::PaymentId;
    use crate::ports::{GatewayErrorCode, SessionContext};

    const HMAC_SECRET: &str = "paymob_hmac_secret";

    fn gateway() -> PaymobGateway {
        PaymobGateway::new(PaymobConfig::new(
            SecretString::new("api_key".to_string()),
            SecretString::new(HMAC_SECRET.to_string()),
            111,
            222,
            "9001",
        ))
    }

    fn transaction(success: bool, pending: bool, refunded: bool) -> serde_json::Value {
        json!({
            "id": 192036465,
            "pending": pending,
            "amount_cents": 50000,
            "success": success,
            "is_auth": false,
            "is_capture": false,
            "is_standalone_payment": true,
            "is_voided": false,
            "is_refunded": refunded,
            "is_3d_secure": true,
            "integration_id": 111,
            "has_parent_transaction": refunded,
            "order": {"id": 217503754},
            "created_at": "2024-06-13T11:32:09.628623",
            "currency": "EGP",
            "source_data": {"pan": "2346", "type": "card", "sub_type": "MasterCard"},
            "error_occured": false,
            "owner": 302852
        })
    }

    fn signed(obj: serde_json::Value) -> (Vec<u8>, String) {
        let mut mac = HmacSha512::new_from_slice(HMAC_SECRET.as_bytes()).unwrap();
        mac.update(hmac_message(&obj).as_bytes());
        let hmac = hex::encode(&mac.finalize().into_bytes());
        let body = serde_json::to_vec(&json!({"type": "TRANSACTION", "obj": obj})).unwrap();
        (body, hmac)
    }

    #[test]
    fn successful_transaction_maps_to_order() {
        let (body, hmac) = signed(transaction(true, false, false));

        let result = gateway().parse_callback(&body, Some(&hmac)).unwrap();

        assert!(result.success);
        assert_eq!(result.status, Some(CallbackStatus::Succeeded));
        assert_eq!(result.provider_payment_id, "217503754");
        assert_eq!(result.transaction_id.as_deref(), Some("192036465"));
        assert_eq!(result.event_id, "192036465:succeeded");
        assert_eq!(result.amount, Some(50_000));
        assert_eq!(result.currency.as_deref(), Some("EGP"));
    }

    #[test]
    fn pending_and_final_callbacks_have_distinct_event_ids() {
        let (pending_body, pending_hmac) = signed(transaction(false, true, false));
        let (final_body, final_hmac) = signed(transaction(true, false, false));
        let gw = gateway();

        let pending = gw.parse_callback(&pending_body, Some(&pending_hmac)).unwrap();
        let settled = gw.parse_callback(&final_body, Some(&final_hmac)).unwrap();

        assert_eq!(pending.status, Some(CallbackStatus::Pending));
        assert_ne!(pending.event_id, settled.event_id);
    }

    #[test]
    fn refund_echo_carries_no_settlement() {
        let (body, hmac) = signed(transaction(true, false, true));
        let result = gateway().parse_callback(&body, Some(&hmac)).unwrap();
        assert_eq!(result.status, None);
    }

    #[test]
    fn tampered_amount_fails_hmac() {
        let (_, hmac) = signed(transaction(true, false, false));
        let mut obj = transaction(true, false, false);
        obj["amount_cents"] = json!(1);
        let body = serde_json::to_vec(&json!({"type": "TRANSACTION", "obj": obj})).unwrap();

        assert_eq!(
            gateway().parse_callback(&body, Some(&hmac)),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn uppercase_hmac_is_accepted() {
        let (body, hmac) = signed(transaction(true, false, false));
        assert!(gateway()
            .parse_callback(&body, Some(&hmac.to_uppercase()))
            .is_ok());
    }

    #[test]
    fn missing_hmac_is_rejected() {
        let (body, _) = signed(transaction(true, false, false));
        assert_eq!(
            gateway().parse_callback(&body, None),
            Err(WebhookError::MissingSignature)
        );
        assert_eq!(
            gateway().parse_callback(&body, Some("")),
            Err(WebhookError::MissingSignature)
        );
    }

    #[test]
    fn non_hex_hmac_is_parse_error() {
        let (body, _) = signed(transaction(true, false, false));
        assert!(matches!(
            gateway().parse_callback(&body, Some("not-hex")),
            Err(WebhookError::ParseError(_))
        ));
    }

    #[test]
    fn iframe_url_uses_configured_iframe() {
        assert_eq!(
            gateway().iframe_url("tok"),
            "https://accept.paymob.com/api/acceptance/iframes/9001?payment_token=tok"
        );
    }

    fn intent_request(charge: Money, method: Option<PaymentMethod>) -> IntentRequest {
        IntentRequest {
            payment_id: PaymentId::new(),
            charge,
            method,
            context: SessionContext::default(),
        }
    }

    #[tokio::test]
    async fn create_intent_rejects_below_minimum() {
        let err = gateway()
            .create_intent(intent_request(Money::new(99, Currency::Egp).unwrap(), None))
            .await
            .unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::InvalidAmount);
    }

    #[tokio::test]
    async fn create_intent_rejects_usd() {
        let err = gateway()
            .create_intent(intent_request(Money::new(1_000, Currency::Usd).unwrap(), None))
            .await
            .unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::InvalidAmount);
    }

    #[tokio::test]
    async fn wallet_without_phone_is_declined() {
        let err = gateway()
            .create_intent(intent_request(
                Money::new(50_000, Currency::Egp).unwrap(),
                Some(PaymentMethod::Wallet),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::Declined);
    }

    #[tokio::test]
    async fn refund_without_transaction_id_is_declined() {
        let err = gateway()
            .refund(RefundRequest {
                provider_payment_id: "217503754".into(),
                transaction_id: None,
                amount: Money::new(100, Currency::Egp).unwrap(),
                idempotency_key: "dispute:1".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::Declined);
    }
}
