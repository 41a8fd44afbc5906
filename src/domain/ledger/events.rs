//! Ledger domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainEvent, MentorId, SessionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Session earnings landed in the available balance.
    EarningsCredited {
        mentor_id: MentorId,
        session_id: SessionId,
        amount: i64,
        available_balance: i64,
    },
    /// A refund clawback exceeded what the mentor had; the platform absorbs the rest.
    ShortfallRecorded {
        mentor_id: MentorId,
        /// Ledger reference of the clawback entry.
        reference: String,
        requested: i64,
        debited: i64,
        shortfall: i64,
    },
}

impl DomainEvent for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::EarningsCredited { .. } => "ledger.earnings_credited",
            LedgerEvent::ShortfallRecorded { .. } => "ledger.shortfall_recorded",
        }
    }

    fn aggregate_id(&self) -> String {
        match self {
            LedgerEvent::EarningsCredited { mentor_id, .. }
            | LedgerEvent::ShortfallRecorded { mentor_id, .. } => mentor_id.to_string(),
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "MentorBalance"
    }
}
