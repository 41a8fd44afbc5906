//! Paymob Accept API payloads.
//!
//! The processed-transaction callback carries the transaction under `obj`.
//! Paymob signs it by concatenating a fixed list of `obj` fields in
//! lexicographic key order and appending an HMAC-SHA512 hex digest as the
//! `hmac` query parameter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::payment::CallbackStatus;

/// Transaction fields covered by the callback HMAC, in signing order.
pub const HMAC_FIELDS: [&str; 20] = [
    "amount_cents",
    "created_at",
    "currency",
    "error_occured",
    "has_parent_transaction",
    "id",
    "integration_id",
    "is_3d_secure",
    "is_auth",
    "is_capture",
    "is_refunded",
    "is_standalone_payment",
    "is_voided",
    "order.id",
    "owner",
    "pending",
    "source_data.pan",
    "source_data.sub_type",
    "source_data.type",
    "success",
];

/// Builds the string Paymob signs from a transaction object.
///
/// Missing fields contribute nothing; booleans render as `true`/`false`.
pub fn hmac_message(obj: &Value) -> String {
    HMAC_FIELDS
        .iter()
        .map(|path| {
            let value = path
                .split('.')
                .try_fold(obj, |node, key| node.get(key));
            match value {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        })
        .collect()
}

/// Outer callback envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymobCallback {
    /// "TRANSACTION", "TOKEN", "DELIVERY_STATUS".
    #[serde(rename = "type")]
    pub callback_type: String,

    pub obj: Value,
}

/// Transaction object as sent in callbacks and inquiry responses.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymobTransaction {
    pub id: i64,

    #[serde(default)]
    pub pending: bool,

    #[serde(default)]
    pub success: bool,

    pub amount_cents: i64,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub is_refunded: bool,

    #[serde(default)]
    pub is_voided: bool,

    #[serde(default)]
    pub has_parent_transaction: bool,

    #[serde(default)]
    pub error_occured: bool,

    pub order: PaymobOrderRef,
}

impl PaymobTransaction {
    /// Settlement state of this transaction.
    pub fn callback_status(&self) -> CallbackStatus {
        if self.pending {
            CallbackStatus::Pending
        } else if self.success && !self.is_voided {
            CallbackStatus::Succeeded
        } else {
            CallbackStatus::Failed
        }
    }

    /// Refund and void transactions point at a parent charge.
    pub fn is_adjustment(&self) -> bool {
        self.has_parent_transaction || self.is_refunded
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymobOrderRef {
    pub id: i64,
}

// ════════════════════════════════════════════════════════════════════════════════
// Accept API responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentKeyResponse {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletPayResponse {
    #[serde(default)]
    pub redirect_url: Option<String>,

    #[serde(default)]
    pub iframe_redirection_url: Option<String>,
}

/// Billing block Paymob requires on payment keys; unknown values are "NA".
#[derive(Debug, Clone, Serialize)]
pub struct BillingData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub apartment: &'static str,
    pub floor: &'static str,
    pub street: &'static str,
    pub building: &'static str,
    pub shipping_method: &'static str,
    pub postal_code: &'static str,
    pub city: &'static str,
    pub country: &'static str,
    pub state: &'static str,
}

impl BillingData {
    pub fn new(name: Option<&str>, email: Option<&str>, phone: Option<&str>) -> Self {
        let (first, last) = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(full) => match full.split_once(' ') {
                Some((first, last)) => (first.to_string(), last.trim().to_string()),
                None => (full.to_string(), "NA".to_string()),
            },
            None => ("NA".to_string(), "NA".to_string()),
        };
        Self {
            first_name: first,
            last_name: last,
            email: email.unwrap_or("NA").to_string(),
            phone_number: phone.unwrap_or("NA").to_string(),
            apartment: "NA",
            floor: "NA",
            street: "NA",
            building: "NA",
            shipping_method: "NA",
            postal_code: "NA",
            city: "NA",
            country: "EG",
            state: "NA",
        }
    }
}
