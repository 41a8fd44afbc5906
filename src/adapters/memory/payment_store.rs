//! In-memory payment repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, SessionId, Timestamp};
use crate::domain::payment::{Payment, PaymentProvider, PaymentStatus};
use crate::ports::PaymentRepository;

use super::stale_version;

#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentRepository {
    payments: Arc<RwLock<HashMap<PaymentId, Payment>>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payments, failed attempts included.
    pub async fn count(&self) -> usize {
        self.payments.read().await.len()
    }
}

fn is_live(payment: &Payment) -> bool {
    payment.status != PaymentStatus::Failed
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut payments = self.payments.write().await;
        if payments.contains_key(&payment.id) {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Payment {} already exists", payment.id),
            ));
        }
        if is_live(payment)
            && payments
                .values()
                .any(|p| p.session_id == payment.session_id && is_live(p))
        {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Session {} already has a live payment", payment.session_id),
            ));
        }
        payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut payments = self.payments.write().await;
        let stored = payments.get_mut(&payment.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("Payment {} not found", payment.id),
            )
        })?;
        if stored.version != payment.version {
            return Err(stale_version("Payment", payment.id, payment.version));
        }
        let mut next = payment.clone();
        next.version = payment.version + 1;
        *stored = next;
        Ok(())
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self.payments.read().await.get(&id).cloned())
    }

    async fn find_live_by_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| p.session_id == session_id && is_live(p))
            .cloned())
    }

    async fn find_by_provider_reference(
        &self,
        provider: PaymentProvider,
        provider_payment_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| {
                p.provider == provider
                    && p.provider_payment_id.as_deref() == Some(provider_payment_id)
            })
            .cloned())
    }

    async fn list_open_before(
        &self,
        cutoff: Timestamp,
        limit: u32,
    ) -> Result<Vec<Payment>, DomainError> {
        let payments = self.payments.read().await;
        let mut open: Vec<Payment> = payments
            .values()
            .filter(|p| p.status.is_open() && p.created_at.is_before(&cutoff))
            .cloned()
            .collect();
        open.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        open.truncate(limit as usize);
        Ok(open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Currency, MentorId, Money, Percentage, UserId};
    use crate::domain::payment::NewPayment;

    fn payment(session_id: SessionId) -> Payment {
        Payment::create(NewPayment {
            id: PaymentId::new(),
            session_id,
            mentee_id: UserId::new(),
            mentor_id: MentorId::new(),
            provider: PaymentProvider::Paymob,
            method: None,
            amount: Money::new(50_000, Currency::Egp).unwrap(),
            charge: Money::new(50_000, Currency::Egp).unwrap(),
            commission_rate: Percentage::try_new(15).unwrap(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn update_bumps_version() {
        let repo = InMemoryPaymentRepository::new();
        let mut p = payment(SessionId::new());
        repo.insert(&p).await.unwrap();

        p.mark_pending("ord_1", None).unwrap();
        repo.update(&p).await.unwrap();

        assert_eq!(repo.find_by_id(p.id).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn second_live_payment_for_session_conflicts() {
        let repo = InMemoryPaymentRepository::new();
        let session = SessionId::new();
        repo.insert(&payment(session)).await.unwrap();

        let err = repo.insert(&payment(session)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn failed_attempt_frees_the_session() {
        let repo = InMemoryPaymentRepository::new();
        let session = SessionId::new();
        let p = payment(session);
        repo.insert(&p).await.unwrap();

        let mut failed = repo.find_by_id(p.id).await.unwrap().unwrap();
        failed.mark_failed("declined").unwrap();
        repo.update(&failed).await.unwrap();

        assert!(repo.insert(&payment(session)).await.is_ok());
        assert_eq!(repo.count().await, 2);
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let repo = InMemoryPaymentRepository::new();
        let p = payment(SessionId::new());
        repo.insert(&p).await.unwrap();

        let loaded = repo.find_by_id(p.id).await.unwrap().unwrap();
        let mut first = loaded.clone();
        first.mark_pending("ord_1", None).unwrap();
        repo.update(&first).await.unwrap();

        let mut second = loaded;
        second.mark_failed("late").unwrap();
        let err = repo.update(&second).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn finds_by_provider_reference() {
        let repo = InMemoryPaymentRepository::new();
        let mut p = payment(SessionId::new());
        p.mark_pending("ord_42", None).unwrap();
        repo.insert(&p).await.unwrap();

        let found = repo
            .find_by_provider_reference(PaymentProvider::Paymob, "ord_42")
            .await
            .unwrap();
        assert_eq!(found.map(|f| f.id), Some(p.id));
        assert!(repo
            .find_by_provider_reference(PaymentProvider::Stripe, "ord_42")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn list_open_before_respects_cutoff_and_limit() {
        let repo = InMemoryPaymentRepository::new();
        for _ in 0..3 {
            repo.insert(&payment(SessionId::new())).await.unwrap();
        }
        let later = Timestamp::now().plus_secs(60);

        assert_eq!(repo.list_open_before(later, 2).await.unwrap().len(), 2);
        assert!(repo
            .list_open_before(Timestamp::now().minus_secs(60), 10)
            .await
            .unwrap()
            .is_empty());
    }
}
