//! HTTP handlers for payout endpoints.

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::adapters::http::auth::{AuthenticatedUser, Role};
use crate::adapters::http::error::ApiError;
use crate::adapters::http::state::AppState;
use crate::application::payouts::RequestPayoutCommand;
use crate::domain::foundation::{MentorId, PayoutId};
use crate::ports::PayoutFilter;

use super::dto::{
    CancelPayoutRequest, FailPayoutRequest, PayoutListQuery, PayoutListResponse, PayoutResponse,
    RequestPayoutRequest,
};

/// POST /payouts - Reserve funds and request a withdrawal
pub async fn request_payout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<RequestPayoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(Role::Mentor)?;

    let payout = state
        .payout_manager()
        .request_payout(RequestPayoutCommand {
            mentor_id: user.mentor_id(),
            amount: request.amount,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(PayoutResponse::from(&payout))))
}

/// GET /payouts?mentor_id=&status=&limit=
pub async fn list_payouts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<PayoutListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mentor_id = match user.role {
        Role::Admin => query.mentor_id.map(MentorId::from_uuid),
        Role::Mentor => Some(user.mentor_id()),
        Role::Mentee => return Err(ApiError::forbidden("Mentees have no payouts")),
    };

    let payouts = state
        .payout_manager()
        .list(PayoutFilter {
            mentor_id,
            status: query.status,
            limit: query.limit,
        })
        .await?;

    Ok(Json(PayoutListResponse {
        payouts: payouts.iter().map(PayoutResponse::from).collect(),
    }))
}

/// POST /payouts/:id/process (admin)
pub async fn process_payout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(payout_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;
    let payout = state
        .payout_manager()
        .process(PayoutId::from_uuid(payout_id))
        .await?;
    Ok(Json(PayoutResponse::from(&payout)))
}

/// POST /payouts/:id/complete (admin)
pub async fn complete_payout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(payout_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;
    let payout = state
        .payout_manager()
        .complete(PayoutId::from_uuid(payout_id))
        .await?;
    Ok(Json(PayoutResponse::from(&payout)))
}

/// POST /payouts/:id/fail (admin) - Returns the reserved funds
pub async fn fail_payout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(payout_id): Path<Uuid>,
    Json(request): Json<FailPayoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;
    let payout = state
        .payout_manager()
        .fail(PayoutId::from_uuid(payout_id), request.reason)
        .await?;
    Ok(Json(PayoutResponse::from(&payout)))
}

/// POST /payouts/:id/cancel (admin) - Returns the reserved funds
pub async fn cancel_payout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(payout_id): Path<Uuid>,
    request: Option<Json<CancelPayoutRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;
    let reason = request.and_then(|Json(r)| r.reason);
    let payout = state
        .payout_manager()
        .cancel(PayoutId::from_uuid(payout_id), reason)
        .await?;
    Ok(Json(PayoutResponse::from(&payout)))
}
