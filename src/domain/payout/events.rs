//! Payout domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainEvent, MentorId, PayoutId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayoutEvent {
    Requested {
        payout_id: PayoutId,
        mentor_id: MentorId,
        amount: i64,
    },
    Completed {
        payout_id: PayoutId,
        mentor_id: MentorId,
        amount: i64,
    },
    Failed {
        payout_id: PayoutId,
        mentor_id: MentorId,
        amount: i64,
        reason: String,
    },
    Cancelled {
        payout_id: PayoutId,
        mentor_id: MentorId,
        amount: i64,
    },
}

impl DomainEvent for PayoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PayoutEvent::Requested { .. } => "payout.requested",
            PayoutEvent::Completed { .. } => "payout.completed",
            PayoutEvent::Failed { .. } => "payout.failed",
            PayoutEvent::Cancelled { .. } => "payout.cancelled",
        }
    }

    fn aggregate_id(&self) -> String {
        match self {
            PayoutEvent::Requested { payout_id, .. }
            | PayoutEvent::Completed { payout_id, .. }
            | PayoutEvent::Failed { payout_id, .. }
            | PayoutEvent::Cancelled { payout_id, .. } => payout_id.to_string(),
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "Payout"
    }
}
