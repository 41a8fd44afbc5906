//! Stripe payment gateway adapter.
//!
//! Card-network provider. Charges in USD through the PaymentIntents API and
//! signs webhooks with a `Stripe-Signature` header.
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`

mod stripe_gateway;
mod webhook_types;

pub use stripe_gateway::{StripeConfig, StripeGateway};
pub use webhook_types::{
    SignatureHeader, SignatureParseError, StripePaymentIntent, StripeRefund, StripeWebhookEvent,
};
