//! HTTP handlers for dispute endpoints.

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::adapters::http::auth::{AuthenticatedUser, Role};
use crate::adapters::http::error::ApiError;
use crate::adapters::http::state::AppState;
use crate::application::disputes::{CreateDisputeCommand, ResolveDisputeCommand};
use crate::domain::foundation::{DisputeId, SessionId};
use crate::ports::DisputeFilter;

use super::dto::{
    CreateDisputeRequest, DisputeListQuery, DisputeListResponse, DisputeResponse,
    ResolveDisputeRequest,
};

/// POST /disputes - Open a dispute on a completed session
pub async fn create_dispute(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateDisputeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_role(Role::Mentee)?;

    let dispute = state
        .dispute_resolver()
        .create(CreateDisputeCommand {
            session_id: SessionId::from_uuid(request.session_id),
            mentee_id: user.user_id(),
            reason: request.reason,
            description: request.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DisputeResponse::from(&dispute))))
}

/// GET /disputes?status=&session_id=&limit= (admin)
pub async fn list_disputes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<DisputeListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;

    let disputes = state
        .dispute_resolver()
        .list(DisputeFilter {
            status: query.status,
            session_id: query.session_id.map(SessionId::from_uuid),
            limit: query.limit,
        })
        .await?;

    Ok(Json(DisputeListResponse {
        disputes: disputes.iter().map(DisputeResponse::from).collect(),
    }))
}

/// GET /disputes/:id
pub async fn get_dispute(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(dispute_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let dispute = state
        .dispute_resolver()
        .get(DisputeId::from_uuid(dispute_id))
        .await?;

    if !user.is_admin() && *dispute.mentee_id.as_uuid() != user.id {
        return Err(ApiError::forbidden("Not allowed to view this dispute"));
    }

    Ok(Json(DisputeResponse::from(&dispute)))
}

/// POST /disputes/:id/resolve (admin)
pub async fn resolve_dispute(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(dispute_id): Path<Uuid>,
    Json(request): Json<ResolveDisputeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;

    let dispute = state
        .dispute_resolver()
        .resolve(ResolveDisputeCommand {
            dispute_id: DisputeId::from_uuid(dispute_id),
            resolution: request.resolution,
            refund_amount: request.refund_amount,
            admin_notes: request.admin_notes,
        })
        .await?;

    Ok(Json(DisputeResponse::from(&dispute)))
}
