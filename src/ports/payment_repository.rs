//! Payment repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentId, SessionId, Timestamp};
use crate::domain::payment::{Payment, PaymentProvider};

/// Port for persisting payments.
///
/// Implementations must enforce:
/// - at most one non-Failed payment per session (insert reports `Conflict`)
/// - optimistic versioning on `update`: the write succeeds only if the stored
///   version equals `payment.version`, and bumps it by one; otherwise `Conflict`
/// - refunds are append-only
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Inserts a new payment.
    ///
    /// Fails with `ErrorCode::Conflict` if the session already has a live payment.
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Saves a changed payment.
    ///
    /// Fails with `ErrorCode::Conflict` on a stale version and
    /// `ErrorCode::PaymentNotFound` if the row does not exist.
    async fn update(&self, payment: &Payment) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, DomainError>;

    /// The session's payment that is not `Failed`, if any.
    async fn find_live_by_session(&self, session_id: SessionId)
        -> Result<Option<Payment>, DomainError>;

    async fn find_by_provider_reference(
        &self,
        provider: PaymentProvider,
        provider_payment_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Open payments (Created/PendingConfirmation) created before `cutoff`, oldest first.
    async fn list_open_before(
        &self,
        cutoff: Timestamp,
        limit: u32,
    ) -> Result<Vec<Payment>, DomainError>;
}
