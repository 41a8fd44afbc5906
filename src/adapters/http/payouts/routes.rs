//! Axum router configuration for payout endpoints.

use axum::{routing::post, Router};

use crate::adapters::http::state::AppState;

use super::handlers::{
    cancel_payout, complete_payout, fail_payout, list_payouts, process_payout, request_payout,
};

/// Payout routes, mounted at `/payouts`.
pub fn payout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(request_payout).get(list_payouts))
        .route("/:id/process", post(process_payout))
        .route("/:id/complete", post(complete_payout))
        .route("/:id/fail", post(fail_payout))
        .route("/:id/cancel", post(cancel_payout))
}
