//! Payout repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, MentorId, PayoutId};
use crate::domain::payout::{Payout, PayoutStatus};

/// Filter for admin listings.
#[derive(Debug, Clone, Default)]
pub struct PayoutFilter {
    pub mentor_id: Option<MentorId>,
    pub status: Option<PayoutStatus>,
    pub limit: Option<u32>,
}

/// Port for persisting payouts. `update` uses the same optimistic versioning
/// as payments and reports `ErrorCode::Conflict` on a stale write.
#[async_trait]
pub trait PayoutRepository: Send + Sync {
    async fn insert(&self, payout: &Payout) -> Result<(), DomainError>;

    async fn update(&self, payout: &Payout) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: PayoutId) -> Result<Option<Payout>, DomainError>;

    /// Newest first.
    async fn list(&self, filter: PayoutFilter) -> Result<Vec<Payout>, DomainError>;
}
