//! In-memory session directory.
//!
//! Stands in for the booking service. Tests and the demo binary seed it
//! with sessions directly.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, SessionId};
use crate::ports::{SessionDirectory, SessionSnapshot, SessionState};

#[derive(Debug, Clone, Default)]
pub struct InMemorySessionDirectory {
    sessions: Arc<RwLock<HashMap<SessionId, SessionSnapshot>>>,
    paid_with: Arc<RwLock<HashMap<SessionId, PaymentId>>>,
}

impl InMemorySessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: SessionSnapshot) {
        self.sessions.write().await.insert(session.id, session);
    }

    pub async fn set_state(&self, id: SessionId, state: SessionState) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.state = state;
        }
    }

    /// The payment that paid for the session, if it was marked paid.
    pub async fn paid_with(&self, id: SessionId) -> Option<PaymentId> {
        self.paid_with.read().await.get(&id).copied()
    }
}

#[async_trait]
impl SessionDirectory for InMemorySessionDirectory {
    async fn get_session(&self, id: SessionId) -> Result<Option<SessionSnapshot>, DomainError> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn mark_session_paid(
        &self,
        id: SessionId,
        payment_id: PaymentId,
    ) -> Result<(), DomainError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or_else(|| {
            DomainError::new(ErrorCode::SessionNotFound, format!("Session {} not found", id))
        })?;
        if session.state == SessionState::Booked {
            session.state = SessionState::Paid;
        }
        self.paid_with.write().await.entry(id).or_insert(payment_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Currency, MentorId, Money, UserId};

    fn session() -> SessionSnapshot {
        SessionSnapshot {
            id: SessionId::new(),
            mentor_id: MentorId::new(),
            mentee_id: UserId::new(),
            price: Some(Money::new(50_000, Currency::Egp).unwrap()),
            state: SessionState::Booked,
            title: "Career review".to_string(),
            mentee_email: None,
            mentee_name: None,
            mentee_phone: None,
        }
    }

    #[tokio::test]
    async fn mark_paid_is_repeatable() {
        let directory = InMemorySessionDirectory::new();
        let s = session();
        directory.insert(s.clone()).await;
        let payment = PaymentId::new();

        directory.mark_session_paid(s.id, payment).await.unwrap();
        directory.mark_session_paid(s.id, payment).await.unwrap();

        let stored = directory.get_session(s.id).await.unwrap().unwrap();
        assert_eq!(stored.state, SessionState::Paid);
        assert_eq!(directory.paid_with(s.id).await, Some(payment));
    }

    #[tokio::test]
    async fn mark_paid_does_not_regress_completed_session() {
        let directory = InMemorySessionDirectory::new();
        let s = session();
        directory.insert(s.clone()).await;
        directory.set_state(s.id, SessionState::Completed).await;

        directory.mark_session_paid(s.id, PaymentId::new()).await.unwrap();

        let stored = directory.get_session(s.id).await.unwrap().unwrap();
        assert_eq!(stored.state, SessionState::Completed);
    }

    #[tokio::test]
    async fn unknown_session_is_an_error() {
        let directory = InMemorySessionDirectory::new();
        let err = directory
            .mark_session_paid(SessionId::new(), PaymentId::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
    }
}
