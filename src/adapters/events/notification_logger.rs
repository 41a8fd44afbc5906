//! Notification handler that records outgoing notifications in the log.
//!
//! Delivery (email, push) lives outside this service; the binary subscribes
//! this handler so every notification-worthy event leaves a trace.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventHandler;

/// Event types that notify a mentee, mentor or admin.
pub const NOTIFICATION_EVENTS: [&str; 10] = [
    "payment.succeeded",
    "payment.failed",
    "payment.refunded",
    "payout.requested",
    "payout.completed",
    "payout.failed",
    "payout.cancelled",
    "dispute.opened",
    "dispute.resolved",
    "ledger.shortfall_recorded",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotificationHandler;

impl LoggingNotificationHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventHandler for LoggingNotificationHandler {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        tracing::info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            aggregate_type = %event.aggregate_type,
            aggregate_id = %event.aggregate_id,
            payload = %event.payload,
            "Notification dispatched"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LoggingNotificationHandler"
    }
}
