//! In-memory processed webhook event log.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::domain::payment::PaymentProvider;
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

#[derive(Debug, Clone, Default)]
pub struct InMemoryWebhookEventRepository {
    events: Arc<RwLock<HashMap<(PaymentProvider, String), WebhookEventRecord>>>,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, in no particular order.
    pub async fn records(&self) -> Vec<WebhookEventRecord> {
        self.events.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn find(
        &self,
        provider: PaymentProvider,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self
            .events
            .read()
            .await
            .get(&(provider, event_id.to_string()))
            .cloned())
    }

    async fn save(&self, record: &WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let mut events = self.events.write().await;
        let key = (record.provider, record.event_id.clone());
        if events.contains_key(&key) {
            return Ok(SaveResult::AlreadyExists);
        }
        events.insert(key, record.clone());
        Ok(SaveResult::Inserted)
    }
}
