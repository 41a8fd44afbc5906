//! DTOs for payout endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::Timestamp;
use crate::domain::payout::{Payout, PayoutStatus};

#[derive(Debug, Clone, Deserialize)]
pub struct RequestPayoutRequest {
    /// Minor units in the ledger currency.
    pub amount: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FailPayoutRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelPayoutRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayoutListQuery {
    #[serde(default)]
    pub mentor_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<PayoutStatus>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutResponse {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub status: PayoutStatus,
    pub failure_reason: Option<String>,
    pub requested_at: Timestamp,
    pub processed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl From<&Payout> for PayoutResponse {
    fn from(p: &Payout) -> Self {
        Self {
            id: *p.id.as_uuid(),
            mentor_id: *p.mentor_id.as_uuid(),
            amount: p.amount.amount(),
            currency: p.amount.currency().code().to_string(),
            status: p.status,
            failure_reason: p.failure_reason.clone(),
            requested_at: p.requested_at,
            processed_at: p.processed_at,
            completed_at: p.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutListResponse {
    pub payouts: Vec<PayoutResponse>,
}
