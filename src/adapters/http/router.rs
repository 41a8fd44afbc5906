//! Router assembly and middleware stack.

use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::disputes::dispute_routes;
use super::ledger::{ledger_routes, session_routes};
use super::payments::payment_routes;
use super::payouts::payout_routes;
use super::state::AppState;

/// Middleware settings for the public router.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub request_timeout: Duration,
    /// Allowed CORS origins; `*` allows any, empty allows none.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    if origins.len() == 1 && origins[0] == "*" {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(parsed)
}

/// Builds the complete API router with its state and middleware.
pub fn api_router(state: AppState, options: &HttpOptions) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/payments", payment_routes())
        .nest("/ledger", ledger_routes())
        .nest("/sessions", session_routes())
        .nest("/payouts", payout_routes())
        .nest("/disputes", dispute_routes())
        .with_state(state)
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(build_cors_layer(&options.cors_allowed_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
