//! Best-effort domain event publishing.
//!
//! Notifications never decide the outcome of a money movement: a failed
//! publish is logged and swallowed.

use crate::domain::foundation::SerializableDomainEvent;
use crate::ports::EventPublisher;

pub(crate) async fn publish_event<E: SerializableDomainEvent>(
    publisher: &dyn EventPublisher,
    event: &E,
) {
    let envelope = match event.to_envelope() {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(
                event_type = event.event_type(),
                aggregate_id = %event.aggregate_id(),
                error = %e,
                "Failed to serialize domain event"
            );
            return;
        }
    };

    let event_type = envelope.event_type.clone();
    let aggregate_id = envelope.aggregate_id.clone();
    if let Err(e) = publisher.publish(envelope).await {
        tracing::warn!(
            event_type = %event_type,
            aggregate_id = %aggregate_id,
            error = %e,
            "Event publish failed; continuing"
        );
    }
}
