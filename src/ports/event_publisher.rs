//! EventPublisher port - Interface for publishing domain events.
//!
//! Services publish after their state change is committed. A publish failure
//! never rolls back money movement; callers log it and carry on.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Delivery is at-least-once. An error means at least one subscriber
/// failed; the event itself was still accepted.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;
}
