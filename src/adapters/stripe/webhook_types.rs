//! Stripe-specific types for webhook handling and API responses.
//!
//! These types represent Stripe API objects as they arrive in webhook
//! payloads and PaymentIntents/Refunds responses.

use serde::{Deserialize, Serialize};

use crate::adapters::hex;

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureParseError {
    /// Header is empty or missing.
    MissingHeader,
    /// Missing timestamp component (t=...).
    MissingTimestamp,
    /// Missing v1 signature component.
    MissingV1Signature,
    /// Invalid timestamp format.
    InvalidTimestamp,
    /// Invalid signature format (not valid hex).
    InvalidSignatureFormat,
}

impl std::fmt::Display for SignatureParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "Missing Stripe-Signature header"),
            Self::MissingTimestamp => write!(f, "Missing timestamp (t=) in signature"),
            Self::MissingV1Signature => write!(f, "Missing v1 signature in header"),
            Self::InvalidTimestamp => write!(f, "Invalid timestamp format"),
            Self::InvalidSignatureFormat => write!(f, "Invalid signature format (not valid hex)"),
        }
    }
}

impl std::error::Error for SignatureParseError {}

/// Parsed Stripe-Signature header components.
///
/// The header format is: `t=timestamp,v1=signature[,v1=signature...]`.
/// Stripe sends several v1 entries while a signing secret is being rolled.
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    /// Unix timestamp when Stripe signed the delivery.
    pub timestamp: i64,

    /// v1 signatures (HMAC-SHA256, hex-decoded).
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parse a Stripe-Signature header into components.
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.trim().is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or(SignatureParseError::MissingTimestamp)?;

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    v1_signatures.push(
                        hex::decode(value.trim()).ok_or(SignatureParseError::InvalidSignatureFormat)?,
                    );
                }
                // v0 and unknown schemes are ignored
                _ => {}
            }
        }

        if v1_signatures.is_empty() {
            return Err(SignatureParseError::MissingV1Signature);
        }

        Ok(Self {
            timestamp: timestamp.ok_or(SignatureParseError::MissingTimestamp)?,
            v1_signatures,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Event Types
// ════════════════════════════════════════════════════════════════════════════════

/// Raw Stripe webhook event as received from the API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeWebhookEvent {
    /// Unique event identifier (evt_...).
    pub id: String,

    /// Event type (e.g., "payment_intent.succeeded").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp when the event was created.
    pub created: i64,

    /// Event payload containing the affected object.
    pub data: StripeEventData,

    /// Whether this is a live or test event.
    #[serde(default)]
    pub livemode: bool,
}

/// Event data container.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object affected by this event.
    pub object: serde_json::Value,
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Object Types
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe PaymentIntent object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePaymentIntent {
    /// Intent identifier (pi_...).
    pub id: String,

    /// Amount in the smallest currency unit.
    pub amount: i64,

    /// Amount actually collected.
    #[serde(default)]
    pub amount_received: i64,

    /// Three-letter ISO currency code, lowercase.
    pub currency: String,

    /// requires_payment_method, requires_confirmation, requires_action,
    /// processing, requires_capture, canceled, succeeded.
    pub status: String,

    /// Secret handed to the browser to confirm the intent.
    pub client_secret: Option<String>,

    /// Charge that settled the intent (ch_...).
    pub latest_charge: Option<String>,

    /// Populated on payment_intent.payment_failed.
    pub last_payment_error: Option<StripeApiErrorDetail>,

    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
}

/// Stripe Refund object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeRefund {
    /// Refund identifier (re_...).
    pub id: String,

    pub amount: i64,

    /// pending, requires_action, succeeded, failed, canceled.
    pub status: String,
}

/// Error envelope returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeApiError {
    pub error: StripeApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeApiErrorDetail {
    /// card_error, invalid_request_error, api_error, ...
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,

    pub code: Option<String>,

    pub message: Option<String>,
}
