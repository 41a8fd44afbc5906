//! DTOs for ledger endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::ledger::LedgerPosting;
use crate::domain::foundation::Timestamp;
use crate::domain::ledger::{EntryKind, LedgerEntry, MentorBalance};

/// Default number of entries returned when no limit is given.
pub const DEFAULT_ENTRY_LIMIT: u32 = 50;
pub const MAX_ENTRY_LIMIT: u32 = 500;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntriesQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

impl EntriesQuery {
    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_ENTRY_LIMIT)
            .clamp(1, MAX_ENTRY_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub mentor_id: Uuid,
    pub currency: String,
    pub available_balance: i64,
    pub pending_balance: i64,
    pub total_earnings: i64,
    pub last_updated: Timestamp,
}

impl From<&MentorBalance> for BalanceResponse {
    fn from(b: &MentorBalance) -> Self {
        Self {
            mentor_id: *b.mentor_id.as_uuid(),
            currency: b.currency.code().to_string(),
            available_balance: b.available_balance,
            pending_balance: b.pending_balance,
            total_earnings: b.total_earnings,
            last_updated: b.last_updated,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntryResponse {
    pub id: Uuid,
    pub kind: EntryKind,
    pub reference: String,
    pub requested: i64,
    pub applied: i64,
    pub shortfall: i64,
    pub available_after: i64,
    pub total_earnings_after: i64,
    pub created_at: Timestamp,
}

impl From<&LedgerEntry> for LedgerEntryResponse {
    fn from(e: &LedgerEntry) -> Self {
        Self {
            id: *e.id.as_uuid(),
            kind: e.kind,
            reference: e.reference.clone(),
            requested: e.requested,
            applied: e.applied,
            shortfall: e.shortfall,
            available_after: e.available_after,
            total_earnings_after: e.total_earnings_after,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntriesResponse {
    pub entries: Vec<LedgerEntryResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditResponse {
    pub entry: LedgerEntryResponse,
    /// False when the session had already been credited.
    pub newly_posted: bool,
}

impl From<&LedgerPosting> for CreditResponse {
    fn from(p: &LedgerPosting) -> Self {
        Self {
            entry: LedgerEntryResponse::from(&p.entry),
            newly_posted: p.newly_posted,
        }
    }
}
