//! In-process event bus.
//!
//! Handlers run inline on the publishing task, in subscription order. The
//! binary uses the bus as its notification channel; tests read back the
//! recorded envelopes to check what a service announced.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

#[derive(Default)]
struct BusState {
    routes: HashMap<String, Vec<Arc<dyn EventHandler>>>,
    recorded: Vec<EventEnvelope>,
}

#[derive(Default)]
pub struct InMemoryEventBus {
    state: Mutex<BusState>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    // A handler that panicked while the lock was held leaves the state usable.
    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every envelope published so far, oldest first.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.state().recorded.clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.state()
            .recorded
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.state().recorded.iter().any(|e| e.event_type == event_type)
    }

    pub fn event_count(&self) -> usize {
        self.state().recorded.len()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let handlers = {
            let mut state = self.state();
            state.recorded.push(event.clone());
            state.routes.get(&event.event_type).cloned().unwrap_or_default()
        };

        let mut failed = Vec::new();
        for handler in handlers {
            if let Err(e) = handler.handle(event.clone()).await {
                tracing::warn!(
                    handler = handler.name(),
                    event_type = %event.event_type,
                    error = %e,
                    "Event handler failed"
                );
                failed.push(handler.name());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::InternalError,
                format!("{} handler(s) failed: {}", failed.len(), failed.join(", ")),
            ))
        }
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.subscribe_all(&[event_type], handler);
    }

    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        let mut state = self.state();
        for event_type in event_types {
            state
                .routes
                .entry((*event_type).to_string())
                .or_default()
                .push(Arc::clone(&handler));
        }
    }
}
