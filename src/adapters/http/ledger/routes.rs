//! Axum router configuration for ledger endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::adapters::http::state::AppState;

use super::handlers::{get_balance, list_entries, open_balance, session_completed};

/// Mentor ledger routes, mounted at `/ledger`.
pub fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route("/mentors/:id/balance", get(get_balance))
        .route("/mentors/:id/entries", get(list_entries))
        .route("/mentors/:id/open", post(open_balance))
}

/// Session lifecycle notifications, mounted at `/sessions`.
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/:id/completed", post(session_completed))
}
