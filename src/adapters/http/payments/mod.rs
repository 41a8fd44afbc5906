//! HTTP adapter for payment endpoints.
//!
//! - `POST /payments/intents` - Open (or fetch) the payment for a session
//! - `POST /payments/confirm` - Client-side confirmation after checkout
//! - `GET /payments/:id` - Payment status, read through when stale
//! - `POST /payments/:id/refunds` - Refund a settled payment (admin)
//! - `POST /payments/webhooks/:provider` - Provider callbacks (signature verified)

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::payment_routes;
