//! In-memory payout repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, PayoutId};
use crate::domain::payout::Payout;
use crate::ports::{PayoutFilter, PayoutRepository};

use super::stale_version;

#[derive(Debug, Clone, Default)]
pub struct InMemoryPayoutRepository {
    payouts: Arc<RwLock<HashMap<PayoutId, Payout>>>,
    /// Makes the next insert fail, for compensation tests.
    fail_next_insert: Arc<RwLock<bool>>,
}

impl InMemoryPayoutRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_next_insert(&self) {
        *self.fail_next_insert.write().await = true;
    }
}

#[async_trait]
impl PayoutRepository for InMemoryPayoutRepository {
    async fn insert(&self, payout: &Payout) -> Result<(), DomainError> {
        {
            let mut fail = self.fail_next_insert.write().await;
            if *fail {
                *fail = false;
                return Err(DomainError::database("injected insert failure"));
            }
        }
        let mut payouts = self.payouts.write().await;
        if payouts.contains_key(&payout.id) {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Payout {} already exists", payout.id),
            ));
        }
        payouts.insert(payout.id, payout.clone());
        Ok(())
    }

    async fn update(&self, payout: &Payout) -> Result<(), DomainError> {
        let mut payouts = self.payouts.write().await;
        let stored = payouts.get_mut(&payout.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::PayoutNotFound,
                format!("Payout {} not found", payout.id),
            )
        })?;
        if stored.version != payout.version {
            return Err(stale_version("Payout", payout.id, payout.version));
        }
        let mut next = payout.clone();
        next.version = payout.version + 1;
        *stored = next;
        Ok(())
    }

    async fn find_by_id(&self, id: PayoutId) -> Result<Option<Payout>, DomainError> {
        Ok(self.payouts.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: PayoutFilter) -> Result<Vec<Payout>, DomainError> {
        let payouts = self.payouts.read().await;
        let mut matching: Vec<Payout> = payouts
            .values()
            .filter(|p| filter.mentor_id.map_or(true, |m| p.mentor_id == m))
            .filter(|p| filter.status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        if let Some(limit) = filter.limit {
            matching.truncate(limit as usize);
        }
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Currency, MentorId, Money};
    use crate::domain::payout::PayoutStatus;

    fn payout(mentor_id: MentorId) -> Payout {
        Payout::request(
            PayoutId::new(),
            mentor_id,
            Money::new(20_000, Currency::Egp).unwrap(),
        )
    }

    #[tokio::test]
    async fn list_filters_by_mentor_and_status() {
        let repo = InMemoryPayoutRepository::new();
        let mentor = MentorId::new();
        let mut processing = payout(mentor);
        repo.insert(&processing).await.unwrap();
        repo.insert(&payout(mentor)).await.unwrap();
        repo.insert(&payout(MentorId::new())).await.unwrap();

        processing.start_processing().unwrap();
        repo.update(&processing).await.unwrap();

        let mine = repo
            .list(PayoutFilter {
                mentor_id: Some(mentor),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);

        let pending = repo
            .list(PayoutFilter {
                mentor_id: Some(mentor),
                status: Some(PayoutStatus::Pending),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let repo = InMemoryPayoutRepository::new();
        let original = payout(MentorId::new());
        repo.insert(&original).await.unwrap();

        let mut first = original.clone();
        first.start_processing().unwrap();
        repo.update(&first).await.unwrap();

        let mut second = original;
        second.cancel(None).unwrap();
        assert_eq!(repo.update(&second).await.unwrap_err().code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn injected_insert_failure_fires_once() {
        let repo = InMemoryPayoutRepository::new();
        repo.fail_next_insert().await;

        assert!(repo.insert(&payout(MentorId::new())).await.is_err());
        assert!(repo.insert(&payout(MentorId::new())).await.is_ok());
    }
}
