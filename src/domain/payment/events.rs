//! Payment domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainEvent, MentorId, PaymentId, SessionId, UserId};

use super::PaymentProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentEvent {
    Succeeded {
        payment_id: PaymentId,
        session_id: SessionId,
        mentee_id: UserId,
        mentor_id: MentorId,
        provider: PaymentProvider,
        amount: i64,
        mentor_payout_amount: i64,
        transaction_id: String,
    },
    Failed {
        payment_id: PaymentId,
        session_id: SessionId,
        mentee_id: UserId,
        reason: String,
    },
    Refunded {
        payment_id: PaymentId,
        session_id: SessionId,
        mentee_id: UserId,
        amount: i64,
        total_refunded: i64,
        fully_refunded: bool,
    },
}

impl PaymentEvent {
    pub fn payment_id(&self) -> PaymentId {
        match self {
            PaymentEvent::Succeeded { payment_id, .. }
            | PaymentEvent::Failed { payment_id, .. }
            | PaymentEvent::Refunded { payment_id, .. } => *payment_id,
        }
    }
}

impl DomainEvent for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::Succeeded { .. } => "payment.succeeded",
            PaymentEvent::Failed { .. } => "payment.failed",
            PaymentEvent::Refunded { .. } => "payment.refunded",
        }
    }

    fn aggregate_id(&self) -> String {
        self.payment_id().to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "Payment"
    }
}
