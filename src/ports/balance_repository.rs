//! Mentor balance repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, MentorId, Timestamp};
use crate::domain::ledger::{EntryKind, LedgerEntry, MentorBalance};

/// Outcome of committing a balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Balance row and entry written together.
    Committed,
    /// Someone else changed the balance since it was read; reload and retry.
    VersionConflict,
    /// An entry with the same reference already exists; nothing written.
    DuplicateReference,
}

/// Port for mentor balances and their ledger entries.
///
/// `commit` must write the balance row and the entry atomically: either
/// both land or neither does.
#[async_trait]
pub trait MentorBalanceRepository: Send + Sync {
    async fn find(&self, mentor_id: MentorId) -> Result<Option<MentorBalance>, DomainError>;

    /// Creates a zero balance. Returns false if one already exists.
    async fn create(&self, balance: &MentorBalance) -> Result<bool, DomainError>;

    /// Persists `balance` if its stored version still equals `balance.version`
    /// (bumping it by one) and appends `entry`.
    async fn commit(
        &self,
        balance: &MentorBalance,
        entry: &LedgerEntry,
    ) -> Result<CommitOutcome, DomainError>;

    async fn find_entry(&self, reference: &str) -> Result<Option<LedgerEntry>, DomainError>;

    /// Most recent entries first.
    async fn list_entries(
        &self,
        mentor_id: MentorId,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, DomainError>;

    /// Entries of `kind` created in `[from, to)`, oldest first, across mentors.
    async fn list_entries_of_kind(
        &self,
        kind: EntryKind,
        from: Timestamp,
        to: Timestamp,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn accepts_dyn(_: &dyn MentorBalanceRepository) {}
}
