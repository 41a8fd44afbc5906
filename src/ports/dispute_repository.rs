//! Dispute repository port.

use async_trait::async_trait;

use crate::domain::dispute::{DisputeStatus, SessionDispute};
use crate::domain::foundation::{DisputeId, DomainError, SessionId};

#[derive(Debug, Clone, Default)]
pub struct DisputeFilter {
    pub status: Option<DisputeStatus>,
    pub session_id: Option<SessionId>,
    pub limit: Option<u32>,
}

/// Port for persisting disputes.
///
/// Implementations enforce one Pending dispute per session: `insert` fails
/// with `ErrorCode::Conflict` when another is open.
#[async_trait]
pub trait DisputeRepository: Send + Sync {
    async fn insert(&self, dispute: &SessionDispute) -> Result<(), DomainError>;

    /// Saves a resolution. Fails with `ErrorCode::Conflict` if the stored
    /// dispute is no longer Pending.
    async fn resolve(&self, dispute: &SessionDispute) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: DisputeId) -> Result<Option<SessionDispute>, DomainError>;

    async fn find_active_by_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<SessionDispute>, DomainError>;

    /// Newest first.
    async fn list(&self, filter: DisputeFilter) -> Result<Vec<SessionDispute>, DomainError>;
}
