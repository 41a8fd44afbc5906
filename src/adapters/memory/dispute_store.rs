//! In-memory dispute repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::dispute::SessionDispute;
use crate::domain::foundation::{DisputeId, DomainError, ErrorCode, SessionId};
use crate::ports::{DisputeFilter, DisputeRepository};

#[derive(Debug, Clone, Default)]
pub struct InMemoryDisputeRepository {
    disputes: Arc<RwLock<HashMap<DisputeId, SessionDispute>>>,
}

impl InMemoryDisputeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DisputeRepository for InMemoryDisputeRepository {
    async fn insert(&self, dispute: &SessionDispute) -> Result<(), DomainError> {
        let mut disputes = self.disputes.write().await;
        if disputes
            .values()
            .any(|d| d.session_id == dispute.session_id && d.status.is_active())
        {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Session {} already has an open dispute", dispute.session_id),
            ));
        }
        disputes.insert(dispute.id, dispute.clone());
        Ok(())
    }

    async fn resolve(&self, dispute: &SessionDispute) -> Result<(), DomainError> {
        let mut disputes = self.disputes.write().await;
        let stored = disputes.get_mut(&dispute.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DisputeNotFound,
                format!("Dispute {} not found", dispute.id),
            )
        })?;
        if !stored.status.is_active() {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Dispute {} is no longer pending", dispute.id),
            ));
        }
        *stored = dispute.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: DisputeId) -> Result<Option<SessionDispute>, DomainError> {
        Ok(self.disputes.read().await.get(&id).cloned())
    }

    async fn find_active_by_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<SessionDispute>, DomainError> {
        Ok(self
            .disputes
            .read()
            .await
            .values()
            .find(|d| d.session_id == session_id && d.status.is_active())
            .cloned())
    }

    async fn list(&self, filter: DisputeFilter) -> Result<Vec<SessionDispute>, DomainError> {
        let disputes = self.disputes.read().await;
        let mut matching: Vec<SessionDispute> = disputes
            .values()
            .filter(|d| filter.status.map_or(true, |s| d.status == s))
            .filter(|d| filter.session_id.map_or(true, |s| d.session_id == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            matching.truncate(limit as usize);
        }
        Ok(matching)
    }
}
