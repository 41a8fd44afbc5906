//! DTOs for dispute endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::dispute::{DisputeReason, DisputeResolution, DisputeStatus, SessionDispute};
use crate::domain::foundation::Timestamp;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDisputeRequest {
    pub session_id: Uuid,
    pub reason: DisputeReason,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveDisputeRequest {
    pub resolution: DisputeResolution,
    /// Minor units; required for partial and full refunds.
    #[serde(default)]
    pub refund_amount: Option<i64>,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisputeListQuery {
    #[serde(default)]
    pub status: Option<DisputeStatus>,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub mentee_id: Uuid,
    pub mentor_id: Uuid,
    pub reason: DisputeReason,
    pub description: Option<String>,
    pub status: DisputeStatus,
    pub resolution: Option<DisputeResolution>,
    pub refund_amount: Option<i64>,
    pub admin_notes: Option<String>,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

impl From<&SessionDispute> for DisputeResponse {
    fn from(d: &SessionDispute) -> Self {
        Self {
            id: *d.id.as_uuid(),
            session_id: *d.session_id.as_uuid(),
            mentee_id: *d.mentee_id.as_uuid(),
            mentor_id: *d.mentor_id.as_uuid(),
            reason: d.reason,
            description: d.description.clone(),
            status: d.status,
            resolution: d.resolution,
            refund_amount: d.refund_amount,
            admin_notes: d.admin_notes.clone(),
            created_at: d.created_at,
            resolved_at: d.resolved_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeListResponse {
    pub disputes: Vec<DisputeResponse>,
}
