//! Webhook domain module.
//!
//! Provider-neutral error vocabulary for inbound settlement callbacks.
//! Signature rules live with each provider adapter.

mod errors;

pub use errors::WebhookError;
