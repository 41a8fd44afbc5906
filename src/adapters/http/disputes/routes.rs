//! Axum router configuration for dispute endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::adapters::http::state::AppState;

use super::handlers::{create_dispute, get_dispute, list_disputes, resolve_dispute};

/// Dispute routes, mounted at `/disputes`.
pub fn dispute_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_dispute).get(list_disputes))
        .route("/:id", get(get_dispute))
        .route("/:id/resolve", post(resolve_dispute))
}
