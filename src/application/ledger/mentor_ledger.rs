//! MentorLedger - the single writer of mentor balances.
//!
//! Every mutation is an optimistic read-modify-write: load the balance,
//! apply one `LedgerOperation`, and commit the new balance together with its
//! entry. A version conflict reloads and retries; a duplicate entry reference
//! means the operation already happened and the stored entry is returned.

use std::sync::Arc;

use crate::application::publish::publish_event;
use crate::domain::foundation::{
    Currency, DisputeId, MentorId, PaymentId, PayoutId, SessionId, Timestamp,
};
use crate::domain::ledger::{
    EntryKind, LedgerEntry, LedgerError, LedgerEvent, LedgerOperation, MentorBalance,
};
use crate::ports::{
    CommitOutcome, EventPublisher, MentorBalanceRepository, PaymentRepository, SessionDirectory,
};

/// Ledger tuning.
#[derive(Debug, Clone, Copy)]
pub struct LedgerSettings {
    /// Currency every balance is kept in.
    pub currency: Currency,
    /// Commit attempts before giving up on a contended balance.
    pub max_attempts: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            currency: Currency::Egp,
            max_attempts: 5,
        }
    }
}

/// Result of a ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPosting {
    pub entry: LedgerEntry,
    /// False when the reference had already been posted.
    pub newly_posted: bool,
}

pub struct MentorLedger {
    balances: Arc<dyn MentorBalanceRepository>,
    payments: Arc<dyn PaymentRepository>,
    sessions: Arc<dyn SessionDirectory>,
    publisher: Arc<dyn EventPublisher>,
    settings: LedgerSettings,
}

impl MentorLedger {
    pub fn new(
        balances: Arc<dyn MentorBalanceRepository>,
        payments: Arc<dyn PaymentRepository>,
        sessions: Arc<dyn SessionDirectory>,
        publisher: Arc<dyn EventPublisher>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            balances,
            payments,
            sessions,
            publisher,
            settings,
        }
    }

    /// Opens a zero balance for a newly approved mentor. Idempotent.
    pub async fn open_balance(&self, mentor_id: MentorId) -> Result<MentorBalance, LedgerError> {
        let balance = MentorBalance::open(mentor_id, self.settings.currency);
        if self.balances.create(&balance).await? {
            tracing::info!(mentor_id = %mentor_id, "Mentor balance opened");
            return Ok(balance);
        }
        self.get_balance(mentor_id).await
    }

    pub async fn get_balance(&self, mentor_id: MentorId) -> Result<MentorBalance, LedgerError> {
        self.balances
            .find(mentor_id)
            .await?
            .ok_or(LedgerError::BalanceNotFound(mentor_id))
    }

    /// Most recent entries first.
    pub async fn list_entries(
        &self,
        mentor_id: MentorId,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.balances.list_entries(mentor_id, limit).await?)
    }

    /// Payout reservations posted in `[from, to)`, oldest first.
    pub async fn payout_reservations_between(
        &self,
        from: Timestamp,
        to: Timestamp,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self
            .balances
            .list_entries_of_kind(EntryKind::PayoutReservation, from, to, limit)
            .await?)
    }

    /// Credits the mentor's share of the session's settled payment.
    ///
    /// Posted at most once per session.
    pub async fn credit_on_session_completion(
        &self,
        session_id: SessionId,
    ) -> Result<LedgerPosting, LedgerError> {
        let payment = match self.payments.find_live_by_session(session_id).await? {
            Some(payment) if payment.status.is_settled() => payment,
            Some(_) => return Err(LedgerError::PaymentNotSettled(session_id)),
            None => {
                return match self.sessions.get_session(session_id).await? {
                    Some(_) => Err(LedgerError::PaymentNotSettled(session_id)),
                    None => Err(LedgerError::SessionNotFound(session_id)),
                }
            }
        };

        let op = LedgerOperation::SessionCredit {
            session_id,
            amount: payment.mentor_payout_amount,
        };
        let posting = self.post(payment.mentor_id, op, true).await?;

        if posting.newly_posted {
            tracing::info!(
                mentor_id = %payment.mentor_id,
                session_id = %session_id,
                payment_id = %payment.id,
                amount = payment.mentor_payout_amount,
                available = posting.entry.available_after,
                "Session earnings credited"
            );
            publish_event(
                self.publisher.as_ref(),
                &LedgerEvent::EarningsCredited {
                    mentor_id: payment.mentor_id,
                    session_id,
                    amount: payment.mentor_payout_amount,
                    available_balance: posting.entry.available_after,
                },
            )
            .await;
        }
        Ok(posting)
    }

    /// Debits `amount` from the available balance for a payout request.
    pub async fn reserve_for_payout(
        &self,
        mentor_id: MentorId,
        payout_id: PayoutId,
        amount: i64,
    ) -> Result<LedgerPosting, LedgerError> {
        let posting = self
            .post(mentor_id, LedgerOperation::PayoutReservation { payout_id, amount }, false)
            .await?;
        if posting.newly_posted {
            tracing::info!(
                mentor_id = %mentor_id,
                payout_id = %payout_id,
                amount,
                available = posting.entry.available_after,
                "Payout funds reserved"
            );
        }
        Ok(posting)
    }

    /// Restores a reservation after the payout failed or was cancelled.
    pub async fn release_on_failure_or_cancel(
        &self,
        mentor_id: MentorId,
        payout_id: PayoutId,
        amount: i64,
    ) -> Result<LedgerPosting, LedgerError> {
        let posting = self
            .post(mentor_id, LedgerOperation::PayoutRelease { payout_id, amount }, false)
            .await?;
        if posting.newly_posted {
            tracing::info!(
                mentor_id = %mentor_id,
                payout_id = %payout_id,
                amount,
                available = posting.entry.available_after,
                "Payout funds released"
            );
        }
        Ok(posting)
    }

    /// Takes the mentor's share of a dispute refund back.
    ///
    /// The balance is clamped at zero; whatever it cannot cover is recorded
    /// on the entry as a shortfall and announced.
    pub async fn adjust_for_dispute_refund(
        &self,
        mentor_id: MentorId,
        dispute_id: DisputeId,
        amount: i64,
    ) -> Result<LedgerPosting, LedgerError> {
        self.claw_back(mentor_id, LedgerOperation::DisputeRefund { dispute_id, amount })
            .await
    }

    /// Takes the mentor's share of a direct payment refund back.
    ///
    /// `sequence` is the refund's position on the payment, so each refund
    /// is clawed back once. Clamps like a dispute refund.
    pub async fn adjust_for_payment_refund(
        &self,
        mentor_id: MentorId,
        payment_id: PaymentId,
        sequence: u32,
        amount: i64,
    ) -> Result<LedgerPosting, LedgerError> {
        self.claw_back(
            mentor_id,
            LedgerOperation::RefundClawback {
                payment_id,
                sequence,
                amount,
            },
        )
        .await
    }

    async fn claw_back(
        &self,
        mentor_id: MentorId,
        op: LedgerOperation,
    ) -> Result<LedgerPosting, LedgerError> {
        let posting = self.post(mentor_id, op, true).await?;

        if posting.newly_posted {
            let entry = &posting.entry;
            if entry.shortfall > 0 {
                tracing::error!(
                    mentor_id = %mentor_id,
                    reference = %entry.reference,
                    requested = entry.requested,
                    debited = -entry.applied,
                    shortfall = entry.shortfall,
                    "Refund clawback exceeds available balance; shortfall absorbed by platform"
                );
                publish_event(
                    self.publisher.as_ref(),
                    &LedgerEvent::ShortfallRecorded {
                        mentor_id,
                        reference: entry.reference.clone(),
                        requested: entry.requested,
                        debited: -entry.applied,
                        shortfall: entry.shortfall,
                    },
                )
                .await;
            } else {
                tracing::info!(
                    mentor_id = %mentor_id,
                    reference = %entry.reference,
                    amount = entry.requested,
                    available = entry.available_after,
                    "Refund clawback debited"
                );
            }
        }
        Ok(posting)
    }

    async fn post(
        &self,
        mentor_id: MentorId,
        op: LedgerOperation,
        open_if_missing: bool,
    ) -> Result<LedgerPosting, LedgerError> {
        let reference = op.reference();

        for attempt in 1..=self.settings.max_attempts {
            if let Some(entry) = self.balances.find_entry(&reference).await? {
                return Ok(LedgerPosting {
                    entry,
                    newly_posted: false,
                });
            }

            let mut balance = match self.balances.find(mentor_id).await? {
                Some(balance) => balance,
                None if open_if_missing => {
                    self.open_balance(mentor_id).await?;
                    continue;
                }
                None => return Err(LedgerError::BalanceNotFound(mentor_id)),
            };

            let entry = balance.apply(&op)?;
            if !balance.is_consistent() {
                return Err(LedgerError::InvariantViolation(format!(
                    "{} would leave mentor {} with available {} and total {}",
                    reference, mentor_id, balance.available_balance, balance.total_earnings
                )));
            }

            match self.balances.commit(&balance, &entry).await? {
                CommitOutcome::Committed => {
                    return Ok(LedgerPosting {
                        entry,
                        newly_posted: true,
                    })
                }
                CommitOutcome::DuplicateReference => {
                    let entry = self.balances.find_entry(&reference).await?.ok_or_else(|| {
                        LedgerError::InvariantViolation(format!(
                            "entry {} reported as duplicate but not found",
                            reference
                        ))
                    })?;
                    return Ok(LedgerPosting {
                        entry,
                        newly_posted: false,
                    });
                }
                CommitOutcome::VersionConflict => {
                    tracing::debug!(
                        mentor_id = %mentor_id,
                        reference = %reference,
                        attempt,
                        "Balance version conflict; retrying"
                    );
                }
            }
        }

        tracing::warn!(mentor_id = %mentor_id, reference = %reference, "Ledger commit kept conflicting");
        Err(LedgerError::Contended(mentor_id))
    }
}
