//! Ledger operations and the entries they leave behind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    DisputeId, LedgerEntryId, MentorId, PaymentId, PayoutId, SessionId, Timestamp,
    ValidationError,
};

const PAYOUT_RESERVE_PREFIX: &str = "payout-reserve:";

/// The only ways a mentor balance may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerOperation {
    /// Earnings from a completed, paid session.
    SessionCredit { session_id: SessionId, amount: i64 },
    /// Funds set aside for a requested payout.
    PayoutReservation { payout_id: PayoutId, amount: i64 },
    /// Reserved funds returned after a payout failed or was cancelled.
    PayoutRelease { payout_id: PayoutId, amount: i64 },
    /// Earnings clawed back after a dispute refund.
    DisputeRefund { dispute_id: DisputeId, amount: i64 },
    /// Earnings clawed back after an administrator refunded a payment
    /// directly. `sequence` is the refund's 1-based position on the payment.
    RefundClawback {
        payment_id: PaymentId,
        sequence: u32,
        amount: i64,
    },
}

impl LedgerOperation {
    pub fn kind(&self) -> EntryKind {
        match self {
            LedgerOperation::SessionCredit { .. } => EntryKind::SessionCredit,
            LedgerOperation::PayoutReservation { .. } => EntryKind::PayoutReservation,
            LedgerOperation::PayoutRelease { .. } => EntryKind::PayoutRelease,
            LedgerOperation::DisputeRefund { .. } => EntryKind::DisputeRefund,
            LedgerOperation::RefundClawback { .. } => EntryKind::RefundClawback,
        }
    }

    pub fn amount(&self) -> i64 {
        match self {
            LedgerOperation::SessionCredit { amount, .. }
            | LedgerOperation::PayoutReservation { amount, .. }
            | LedgerOperation::PayoutRelease { amount, .. }
            | LedgerOperation::DisputeRefund { amount, .. }
            | LedgerOperation::RefundClawback { amount, .. } => *amount,
        }
    }

    /// Unique key; a second operation with the same key is a no-op.
    pub fn reference(&self) -> String {
        match self {
            LedgerOperation::SessionCredit { session_id, .. } => {
                format!("session-credit:{}", session_id)
            }
            LedgerOperation::PayoutReservation { payout_id, .. } => {
                format!("{}{}", PAYOUT_RESERVE_PREFIX, payout_id)
            }
            LedgerOperation::PayoutRelease { payout_id, .. } => {
                format!("payout-release:{}", payout_id)
            }
            LedgerOperation::DisputeRefund { dispute_id, .. } => {
                format!("dispute-refund:{}", dispute_id)
            }
            LedgerOperation::RefundClawback {
                payment_id,
                sequence,
                ..
            } => format!("refund-clawback:{}:{}", payment_id, sequence),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    SessionCredit,
    PayoutReservation,
    PayoutRelease,
    DisputeRefund,
    RefundClawback,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::SessionCredit => "session_credit",
            EntryKind::PayoutReservation => "payout_reservation",
            EntryKind::PayoutRelease => "payout_release",
            EntryKind::DisputeRefund => "dispute_refund",
            EntryKind::RefundClawback => "refund_clawback",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session_credit" => Ok(EntryKind::SessionCredit),
            "payout_reservation" => Ok(EntryKind::PayoutReservation),
            "payout_release" => Ok(EntryKind::PayoutRelease),
            "dispute_refund" => Ok(EntryKind::DisputeRefund),
            "refund_clawback" => Ok(EntryKind::RefundClawback),
            other => Err(ValidationError::invalid_format(
                "entry_kind",
                format!("unknown ledger entry kind '{}'", other),
            )),
        }
    }
}

/// Immutable record of one applied balance mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub mentor_id: MentorId,
    pub kind: EntryKind,
    pub reference: String,
    /// Amount the operation asked for.
    pub requested: i64,
    /// Signed change actually applied to the available balance.
    pub applied: i64,
    /// Part of a refund clawback the balance could not cover.
    pub shortfall: i64,
    pub available_after: i64,
    pub total_earnings_after: i64,
    pub created_at: Timestamp,
}

impl LedgerEntry {
    /// The payout a reservation entry was posted for.
    pub fn reserved_payout(&self) -> Option<PayoutId> {
        if self.kind != EntryKind::PayoutReservation {
            return None;
        }
        self.reference
            .strip_prefix(PAYOUT_RESERVE_PREFIX)
            .and_then(|id| id.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_are_distinct_per_kind() {
        let payout_id = PayoutId::new();
        let reserve = LedgerOperation::PayoutReservation { payout_id, amount: 1 };
        let release = LedgerOperation::PayoutRelease { payout_id, amount: 1 };
        assert_ne!(reserve.reference(), release.reference());
    }

    #[test]
    fn session_credit_reference_is_stable() {
        let session_id = SessionId::new();
        let a = LedgerOperation::SessionCredit { session_id, amount: 10 };
        let b = LedgerOperation::SessionCredit { session_id, amount: 99 };
        assert_eq!(a.reference(), b.reference());
    }

    #[test]
    fn refund_clawbacks_are_keyed_per_refund() {
        let payment_id = PaymentId::new();
        let first = LedgerOperation::RefundClawback { payment_id, sequence: 1, amount: 5 };
        let second = LedgerOperation::RefundClawback { payment_id, sequence: 2, amount: 5 };
        assert_ne!(first.reference(), second.reference());
        assert_eq!(first.reference(), format!("refund-clawback:{}:1", payment_id));
    }

    #[test]
    fn reservation_entry_names_its_payout() {
        let payout_id = PayoutId::new();
        let mut balance = crate::domain::ledger::MentorBalance::open(
            MentorId::new(),
            crate::domain::foundation::Currency::Egp,
        );
        balance
            .apply(&LedgerOperation::SessionCredit { session_id: SessionId::new(), amount: 100 })
            .unwrap();
        let reserve = balance
            .apply(&LedgerOperation::PayoutReservation { payout_id, amount: 100 })
            .unwrap();
        let release = balance
            .apply(&LedgerOperation::PayoutRelease { payout_id, amount: 100 })
            .unwrap();

        assert_eq!(reserve.reserved_payout(), Some(payout_id));
        assert_eq!(release.reserved_payout(), None);
    }

    #[test]
    fn kind_round_trips_through_storage_string() {
        for kind in [
            EntryKind::SessionCredit,
            EntryKind::PayoutReservation,
            EntryKind::PayoutRelease,
            EntryKind::DisputeRefund,
            EntryKind::RefundClawback,
        ] {
            assert_eq!(kind.as_str().parse::<EntryKind>().unwrap(), kind);
        }
    }
}
