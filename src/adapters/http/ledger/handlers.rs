//! HTTP handlers for ledger endpoints.

use axum::extract::{Json, Path, Query, State};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::adapters::http::auth::AuthenticatedUser;
use crate::adapters::http::error::ApiError;
use crate::adapters::http::state::AppState;
use crate::domain::foundation::{MentorId, SessionId};

use super::dto::{
    BalanceResponse, CreditResponse, EntriesQuery, EntriesResponse, LedgerEntryResponse,
};

/// GET /ledger/mentors/:id/balance
pub async fn get_balance(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(mentor_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mentor_id = MentorId::from_uuid(mentor_id);
    user.require_admin_or_mentor(mentor_id)?;

    let balance = state.ledger().get_balance(mentor_id).await?;
    Ok(Json(BalanceResponse::from(&balance)))
}

/// GET /ledger/mentors/:id/entries?limit=N
pub async fn list_entries(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(mentor_id): Path<Uuid>,
    Query(query): Query<EntriesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mentor_id = MentorId::from_uuid(mentor_id);
    user.require_admin_or_mentor(mentor_id)?;

    let entries = state.ledger().list_entries(mentor_id, query.limit()).await?;
    Ok(Json(EntriesResponse {
        entries: entries.iter().map(LedgerEntryResponse::from).collect(),
    }))
}

/// POST /ledger/mentors/:id/open (admin)
pub async fn open_balance(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(mentor_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;

    let balance = state
        .ledger()
        .open_balance(MentorId::from_uuid(mentor_id))
        .await?;
    Ok(Json(BalanceResponse::from(&balance)))
}

/// POST /sessions/:id/completed (admin)
///
/// Booking reports a finished session; the mentor's share of its settled
/// payment is credited once.
pub async fn session_completed(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_admin()?;

    let posting = state
        .ledger()
        .credit_on_session_completion(SessionId::from_uuid(session_id))
        .await?;
    Ok(Json(CreditResponse::from(&posting)))
}
