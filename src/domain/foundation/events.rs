//! Domain event plumbing.
//!
//! Payment, ledger, payout and dispute events implement [`DomainEvent`] and
//! travel through the event bus wrapped in an [`EventEnvelope`].

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::Timestamp;

/// Implemented by every notification-worthy state change.
pub trait DomainEvent: Send + Sync {
    /// Routing key, e.g. "payment.succeeded".
    fn event_type(&self) -> &'static str;

    fn aggregate_id(&self) -> String;

    /// "Payment", "MentorBalance", "Payout" or "Dispute".
    fn aggregate_type(&self) -> &'static str;
}

/// Provides `to_envelope()` for any serializable domain event.
pub trait SerializableDomainEvent: DomainEvent + Serialize {
    fn to_envelope(&self) -> Result<EventEnvelope, serde_json::Error> {
        Ok(EventEnvelope::new(
            self.event_type(),
            self.aggregate_id(),
            self.aggregate_type(),
            serde_json::to_value(self)?,
        ))
    }
}

impl<T: DomainEvent + Serialize> SerializableDomainEvent for T {}

/// A published event as handlers see it.
///
/// `event_id` is fresh per publish. Handlers that need idempotency key on
/// the aggregate and payload, since a retried operation republishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub event_type: String,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub occurred_at: Timestamp,
    pub payload: JsonValue,
}

impl EventEnvelope {
    pub fn new(
        event_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            occurred_at: Timestamp::now(),
            payload,
        }
    }

    /// Reads a single field out of the payload.
    pub fn payload_field(&self, key: &str) -> Option<&JsonValue> {
        self.payload.get(key)
    }
}
