//! Axum router configuration for payment endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::adapters::http::state::AppState;

use super::handlers::{
    confirm_payment, create_payment_intent, get_payment, handle_webhook, refund_payment,
};

/// Payment routes, mounted at `/payments`.
///
/// Webhook routes skip user authentication; the provider's signature is
/// verified by its gateway instead.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/intents", post(create_payment_intent))
        .route("/confirm", post(confirm_payment))
        .route("/:id", get(get_payment))
        .route("/:id/refunds", post(refund_payment))
        .route("/webhooks/:provider", post(handle_webhook))
}
