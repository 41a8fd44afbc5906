//! Mock payment gateway for testing.
//!
//! Provides a configurable implementation of `PaymentGateway` for unit and
//! integration tests. Supports:
//! - Scripted provider statuses for `get_status`
//! - Error injection, one-shot or per method
//! - Call tracking
//! - A simple signed callback format for webhook tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Currency, Money};
use crate::domain::payment::{CallbackStatus, PaymentProvider};
use crate::domain::webhook::WebhookError;
use crate::ports::{
    CallbackResult, CreatedIntent, GatewayError, IntentRequest, PaymentGateway, ProviderStatus,
    RefundRequest, RefundResult,
};

/// Mock gateway for one provider.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentGateway::new(PaymentProvider::Stripe);
/// mock.set_method_error("refund", GatewayError::unavailable("down"));
/// let payload = MockPaymentGateway::callback_payload("evt_1", "mock_stripe_1", CallbackStatus::Succeeded, 1000, "USD");
/// mock.parse_callback(&payload, Some(MockPaymentGateway::SIGNATURE))?;
/// ```
#[derive(Clone)]
pub struct MockPaymentGateway {
    provider: PaymentProvider,
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Counter for generated provider ids.
    sequence: u32,

    /// Id to hand out on the next `create_intent`.
    next_intent_id: Option<String>,

    /// Scripted answers for `get_status`, by provider payment id.
    statuses: HashMap<String, ProviderStatus>,

    /// Error to return on next call.
    next_error: Option<GatewayError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, GatewayError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

/// Callback body understood by the mock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockCallback {
    pub event_id: String,
    pub provider_payment_id: String,
    pub status: CallbackStatus,
    pub transaction_id: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

impl MockPaymentGateway {
    /// The only signature `parse_callback` accepts.
    pub const SIGNATURE: &'static str = "mock-valid-signature";

    pub fn new(provider: PaymentProvider) -> Self {
        Self {
            provider,
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Builds a callback body; succeeded callbacks get a transaction id.
    pub fn callback_payload(
        event_id: &str,
        provider_payment_id: &str,
        status: CallbackStatus,
        amount: i64,
        currency: &str,
    ) -> Vec<u8> {
        let callback = MockCallback {
            event_id: event_id.to_string(),
            provider_payment_id: provider_payment_id.to_string(),
            status,
            transaction_id: (status == CallbackStatus::Succeeded)
                .then(|| format!("txn_{}", provider_payment_id)),
            amount: Some(amount),
            currency: Some(currency.to_string()),
        };
        serde_json::to_vec(&callback).unwrap_or_default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Set the provider payment id returned by the next `create_intent`.
    pub fn set_next_intent_id(&self, id: impl Into<String>) {
        self.state().next_intent_id = Some(id.into());
    }

    /// Script what `get_status` reports for a provider payment id.
    pub fn set_status(&self, provider_payment_id: &str, status: CallbackStatus, amount: Option<i64>) {
        let transaction_id =
            (status == CallbackStatus::Succeeded).then(|| format!("txn_{}", provider_payment_id));
        self.state().statuses.insert(
            provider_payment_id.to_string(),
            ProviderStatus {
                status,
                transaction_id,
                amount,
            },
        );
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: GatewayError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method until cleared.
    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().call_log.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), GatewayError> {
        let mut state = self.state();

        // Method-specific errors persist
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        // Global error is consumed
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state();
        state.sequence += 1;
        format!("{}_{}_{}", prefix, self.provider, state.sequence)
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn provider(&self) -> PaymentProvider {
        self.provider
    }

    fn minimum_charge(&self) -> Money {
        match self.provider {
            PaymentProvider::Stripe => Money::from_minor(50, Currency::Usd),
            PaymentProvider::Paymob => Money::from_minor(100, Currency::Egp),
        }
    }

    async fn create_intent(&self, request: IntentRequest) -> Result<CreatedIntent, GatewayError> {
        self.record_call(
            "create_intent",
            vec![request.payment_id.to_string(), request.charge.to_string()],
        );
        self.check_error("create_intent")?;

        let minimum = self.minimum_charge();
        if request.charge.currency() != minimum.currency() {
            return Err(GatewayError::invalid_amount(format!(
                "{} charges in {}",
                self.provider,
                minimum.currency()
            )));
        }
        if request.charge.amount() < minimum.amount() {
            return Err(GatewayError::invalid_amount(format!(
                "{} is below the minimum of {}",
                request.charge, minimum
            )));
        }

        let scripted = self.state().next_intent_id.take();
        let id = match scripted {
            Some(id) => id,
            None => self.next_id("mock"),
        };
        Ok(CreatedIntent {
            checkout: Some(format!("https://checkout.mock/{}", id)),
            provider_payment_id: id,
        })
    }

    fn parse_callback(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<CallbackResult, WebhookError> {
        self.record_call("parse_callback", vec![signature.unwrap_or_default().to_string()]);

        match signature {
            None => return Err(WebhookError::MissingSignature),
            Some(sig) if sig != Self::SIGNATURE => return Err(WebhookError::InvalidSignature),
            Some(_) => {}
        }

        let raw: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(format!("Invalid JSON: {}", e)))?;
        let callback: MockCallback = serde_json::from_value(raw.clone())
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        Ok(CallbackResult {
            event_id: callback.event_id,
            event_type: "mock.callback".to_string(),
            success: callback.status == CallbackStatus::Succeeded,
            provider_payment_id: callback.provider_payment_id,
            transaction_id: callback.transaction_id,
            status: Some(callback.status),
            amount: callback.amount,
            currency: callback.currency,
            raw,
        })
    }

    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, GatewayError> {
        self.record_call(
            "refund",
            vec![
                request.provider_payment_id.clone(),
                request.amount.amount().to_string(),
                request.idempotency_key.clone(),
            ],
        );
        self.check_error("refund")?;

        Ok(RefundResult {
            success: true,
            refund_transaction_id: Some(self.next_id("refund")),
            refunded_amount: request.amount.amount(),
        })
    }

    async fn get_status(&self, provider_payment_id: &str) -> Result<ProviderStatus, GatewayError> {
        self.record_call("get_status", vec![provider_payment_id.to_string()]);
        self.check_error("get_status")?;

        Ok(self
            .state()
            .statuses
            .get(provider_payment_id)
            .cloned()
            .unwrap_or(ProviderStatus {
                status: CallbackStatus::Pending,
                transaction_id: None,
                amount: None,
            }))
    }
}
