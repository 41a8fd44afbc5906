//! MentorBalance aggregate.
//!
//! Three scalar balances per mentor in the ledger currency. The only way to
//! change them is `apply`, which takes one `LedgerOperation` and returns the
//! entry describing what happened.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Currency, LedgerEntryId, MentorId, Timestamp};

use super::{LedgerEntry, LedgerError, LedgerOperation};

/// Balances owed to one mentor.
///
/// # Invariants
///
/// - `available_balance >= 0`
/// - `pending_balance >= 0`
/// - `total_earnings >= 0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorBalance {
    pub mentor_id: MentorId,
    pub currency: Currency,
    /// Withdrawable now.
    pub available_balance: i64,
    /// Earned but held back.
    pub pending_balance: i64,
    /// Lifetime earnings, reduced only by dispute corrections.
    pub total_earnings: i64,
    pub last_updated: Timestamp,
    pub created_at: Timestamp,
    /// Optimistic concurrency version as loaded from storage.
    pub version: i64,
}

impl MentorBalance {
    /// Zero balances for a newly approved mentor.
    pub fn open(mentor_id: MentorId, currency: Currency) -> Self {
        let now = Timestamp::now();
        Self {
            mentor_id,
            currency,
            available_balance: 0,
            pending_balance: 0,
            total_earnings: 0,
            last_updated: now,
            created_at: now,
            version: 0,
        }
    }

    /// Applies one operation, returning the entry to persist alongside.
    ///
    /// Nothing changes when an error is returned.
    pub fn apply(&mut self, op: &LedgerOperation) -> Result<LedgerEntry, LedgerError> {
        let requested = op.amount();
        if requested <= 0 {
            return Err(LedgerError::validation(
                "amount",
                format!("{} amount must be positive, got {}", op.kind(), requested),
            ));
        }

        let (applied, shortfall) = match op {
            LedgerOperation::SessionCredit { .. } => {
                self.available_balance = checked(self.available_balance, requested)?;
                self.total_earnings = checked(self.total_earnings, requested)?;
                (requested, 0)
            }
            LedgerOperation::PayoutReservation { .. } => {
                if requested > self.available_balance {
                    return Err(LedgerError::InsufficientBalance {
                        mentor_id: self.mentor_id,
                        requested,
                        available: self.available_balance,
                    });
                }
                self.available_balance -= requested;
                (-requested, 0)
            }
            LedgerOperation::PayoutRelease { .. } => {
                self.available_balance = checked(self.available_balance, requested)?;
                (requested, 0)
            }
            LedgerOperation::DisputeRefund { .. } | LedgerOperation::RefundClawback { .. } => {
                let debit = requested.min(self.available_balance);
                self.available_balance -= debit;
                self.total_earnings -= requested.min(self.total_earnings);
                (-debit, requested - debit)
            }
        };

        self.last_updated = Timestamp::now();

        Ok(LedgerEntry {
            id: LedgerEntryId::new(),
            mentor_id: self.mentor_id,
            kind: op.kind(),
            reference: op.reference(),
            requested,
            applied,
            shortfall,
            available_after: self.available_balance,
            total_earnings_after: self.total_earnings,
            created_at: self.last_updated,
        })
    }

    pub fn is_consistent(&self) -> bool {
        self.available_balance >= 0 && self.pending_balance >= 0 && self.total_earnings >= 0
    }
}

fn checked(current: i64, delta: i64) -> Result<i64, LedgerError> {
    current
        .checked_add(delta)
        .ok_or_else(|| LedgerError::InvariantViolation(format!("balance overflow adding {}", delta)))
}
