//! Dispute domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DisputeId, DomainEvent, MentorId, SessionId, UserId};

use super::{DisputeReason, DisputeResolution};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisputeEvent {
    Opened {
        dispute_id: DisputeId,
        session_id: SessionId,
        mentee_id: UserId,
        mentor_id: MentorId,
        reason: DisputeReason,
    },
    Resolved {
        dispute_id: DisputeId,
        session_id: SessionId,
        mentee_id: UserId,
        mentor_id: MentorId,
        resolution: DisputeResolution,
        refund_amount: Option<i64>,
    },
}

impl DomainEvent for DisputeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DisputeEvent::Opened { .. } => "dispute.opened",
            DisputeEvent::Resolved { .. } => "dispute.resolved",
        }
    }

    fn aggregate_id(&self) -> String {
        match self {
            DisputeEvent::Opened { dispute_id, .. } | DisputeEvent::Resolved { dispute_id, .. } => {
                dispute_id.to_string()
            }
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "SessionDispute"
    }
}
