//! In-memory mentor balance repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, MentorId, Timestamp};
use crate::domain::ledger::{EntryKind, LedgerEntry, MentorBalance};
use crate::ports::{CommitOutcome, MentorBalanceRepository};

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<MentorId, MentorBalance>,
    entries: Vec<LedgerEntry>,
}

/// Balances and entries live behind one lock so a commit is atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBalanceRepository {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryBalanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all mentors.
    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }
}

#[async_trait]
impl MentorBalanceRepository for InMemoryBalanceRepository {
    async fn find(&self, mentor_id: MentorId) -> Result<Option<MentorBalance>, DomainError> {
        Ok(self.state.read().await.balances.get(&mentor_id).cloned())
    }

    async fn create(&self, balance: &MentorBalance) -> Result<bool, DomainError> {
        let mut state = self.state.write().await;
        if state.balances.contains_key(&balance.mentor_id) {
            return Ok(false);
        }
        state.balances.insert(balance.mentor_id, balance.clone());
        Ok(true)
    }

    async fn commit(
        &self,
        balance: &MentorBalance,
        entry: &LedgerEntry,
    ) -> Result<CommitOutcome, DomainError> {
        let mut state = self.state.write().await;

        if state.entries.iter().any(|e| e.reference == entry.reference) {
            return Ok(CommitOutcome::DuplicateReference);
        }

        let stored = state.balances.get_mut(&balance.mentor_id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::BalanceNotFound,
                format!("No balance for mentor {}", balance.mentor_id),
            )
        })?;
        if stored.version != balance.version {
            return Ok(CommitOutcome::VersionConflict);
        }

        let mut next = balance.clone();
        next.version = balance.version + 1;
        *stored = next;
        state.entries.push(entry.clone());
        Ok(CommitOutcome::Committed)
    }

    async fn find_entry(&self, reference: &str) -> Result<Option<LedgerEntry>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .entries
            .iter()
            .find(|e| e.reference == reference)
            .cloned())
    }

    async fn list_entries(
        &self,
        mentor_id: MentorId,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .entries
            .iter()
            .rev()
            .filter(|e| e.mentor_id == mentor_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_entries_of_kind(
        &self,
        kind: EntryKind,
        from: Timestamp,
        to: Timestamp,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .entries
            .iter()
            .filter(|e| e.kind == kind && !e.created_at.is_before(&from) && e.created_at.is_before(&to))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Currency, SessionId};
    use crate::domain::ledger::LedgerOperation;

    fn credit(balance: &mut MentorBalance, amount: i64) -> LedgerEntry {
        balance
            .apply(&LedgerOperation::SessionCredit {
                session_id: SessionId::new(),
                amount,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn entries_of_kind_respect_the_window() {
        let repo = InMemoryBalanceRepository::new();
        let mut balance = MentorBalance::open(MentorId::new(), Currency::Egp);
        repo.create(&balance).await.unwrap();
        let entry = credit(&mut balance, 1_000);
        repo.commit(&balance, &entry).await.unwrap();

        let now = Timestamp::now();
        let hour_ago = now.minus_secs(3_600);
        let found = repo
            .list_entries_of_kind(EntryKind::SessionCredit, hour_ago, now.plus_secs(1), 10)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let none = repo
            .list_entries_of_kind(EntryKind::PayoutReservation, hour_ago, now.plus_secs(1), 10)
            .await
            .unwrap();
        assert!(none.is_empty());

        let earlier = repo
            .list_entries_of_kind(EntryKind::SessionCredit, hour_ago, hour_ago.plus_secs(1), 10)
            .await
            .unwrap();
        assert!(earlier.is_empty());
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let repo = InMemoryBalanceRepository::new();
        let balance = MentorBalance::open(MentorId::new(), Currency::Egp);

        assert!(repo.create(&balance).await.unwrap());
        assert!(!repo.create(&balance).await.unwrap());
    }

    #[tokio::test]
    async fn commit_writes_balance_and_entry() {
        let repo = InMemoryBalanceRepository::new();
        let mut balance = MentorBalance::open(MentorId::new(), Currency::Egp);
        repo.create(&balance).await.unwrap();

        let entry = credit(&mut balance, 42_500);
        assert_eq!(repo.commit(&balance, &entry).await.unwrap(), CommitOutcome::Committed);

        let stored = repo.find(balance.mentor_id).await.unwrap().unwrap();
        assert_eq!(stored.available_balance, 42_500);
        assert_eq!(stored.version, 1);
        assert!(repo.find_entry(&entry.reference).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stale_commit_reports_conflict_and_writes_nothing() {
        let repo = InMemoryBalanceRepository::new();
        let opened = MentorBalance::open(MentorId::new(), Currency::Egp);
        repo.create(&opened).await.unwrap();

        let mut first = opened.clone();
        let entry = credit(&mut first, 100);
        repo.commit(&first, &entry).await.unwrap();

        let mut stale = opened;
        let stale_entry = credit(&mut stale, 200);
        assert_eq!(
            repo.commit(&stale, &stale_entry).await.unwrap(),
            CommitOutcome::VersionConflict
        );
        assert_eq!(repo.entry_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_reference_is_rejected() {
        let repo = InMemoryBalanceRepository::new();
        let mut balance = MentorBalance::open(MentorId::new(), Currency::Egp);
        repo.create(&balance).await.unwrap();

        let op = LedgerOperation::SessionCredit {
            session_id: SessionId::new(),
            amount: 100,
        };
        let entry = balance.apply(&op).unwrap();
        repo.commit(&balance, &entry).await.unwrap();

        let mut reloaded = repo.find(balance.mentor_id).await.unwrap().unwrap();
        let again = reloaded.apply(&op).unwrap();
        assert_eq!(
            repo.commit(&reloaded, &again).await.unwrap(),
            CommitOutcome::DuplicateReference
        );
    }

    #[tokio::test]
    async fn list_entries_is_newest_first() {
        let repo = InMemoryBalanceRepository::new();
        let mut balance = MentorBalance::open(MentorId::new(), Currency::Egp);
        repo.create(&balance).await.unwrap();

        for amount in [100, 200, 300] {
            let entry = credit(&mut balance, amount);
            repo.commit(&balance, &entry).await.unwrap();
            balance.version += 1;
        }

        let entries = repo.list_entries(balance.mentor_id, 2).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].requested, 300);
    }
}
