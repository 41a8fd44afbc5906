//! PayoutManager - mentor withdrawals backed by ledger reservations.
//!
//! Requesting a payout debits the mentor's available balance before the
//! payout is stored; a failed or cancelled payout gives the reservation
//! back. Both ledger postings are keyed by payout id, so repeating a
//! command never moves money twice.
//!
//! The reservation and the payout row are separate writes. A process that
//! dies between them leaves a reservation with no payout; the reconciliation
//! sweep finds those through `release_orphaned_reservations` and returns the
//! funds.

use std::sync::Arc;

use crate::application::ledger::MentorLedger;
use crate::application::publish::publish_event;
use crate::domain::foundation::{Currency, ErrorCode, MentorId, Money, PayoutId, Timestamp};
use crate::domain::payout::{Payout, PayoutError, PayoutEvent, PayoutPolicy, PayoutStatus};
use crate::ports::{EventPublisher, PayoutFilter, PayoutRepository};

const MAX_SAVE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct RequestPayoutCommand {
    pub mentor_id: MentorId,
    /// Minor units in the ledger currency.
    pub amount: i64,
}

pub struct PayoutManager {
    payouts: Arc<dyn PayoutRepository>,
    ledger: Arc<MentorLedger>,
    publisher: Arc<dyn EventPublisher>,
    policy: PayoutPolicy,
    currency: Currency,
}

impl PayoutManager {
    pub fn new(
        payouts: Arc<dyn PayoutRepository>,
        ledger: Arc<MentorLedger>,
        publisher: Arc<dyn EventPublisher>,
        policy: PayoutPolicy,
        currency: Currency,
    ) -> Self {
        Self {
            payouts,
            ledger,
            publisher,
            policy,
            currency,
        }
    }

    /// Reserves funds and records a `Pending` payout.
    pub async fn request_payout(&self, cmd: RequestPayoutCommand) -> Result<Payout, PayoutError> {
        self.policy.check(cmd.amount)?;
        let amount = Money::positive(cmd.amount, self.currency)
            .map_err(|e| PayoutError::validation("amount", e.to_string()))?;

        let payout = Payout::request(PayoutId::new(), cmd.mentor_id, amount);
        self.ledger
            .reserve_for_payout(cmd.mentor_id, payout.id, cmd.amount)
            .await?;

        if let Err(e) = self.payouts.insert(&payout).await {
            tracing::error!(
                payout_id = %payout.id,
                mentor_id = %cmd.mentor_id,
                error = %e,
                "Could not store payout; releasing reservation"
            );
            if let Err(release_error) = self
                .ledger
                .release_on_failure_or_cancel(cmd.mentor_id, payout.id, cmd.amount)
                .await
            {
                tracing::error!(
                    payout_id = %payout.id,
                    error = %release_error,
                    "Reservation release failed after payout insert failure"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            payout_id = %payout.id,
            mentor_id = %payout.mentor_id,
            amount = cmd.amount,
            "Payout requested"
        );
        publish_event(
            self.publisher.as_ref(),
            &PayoutEvent::Requested {
                payout_id: payout.id,
                mentor_id: payout.mentor_id,
                amount: cmd.amount,
            },
        )
        .await;
        Ok(payout)
    }

    /// `Pending → Processing`.
    pub async fn process(&self, payout_id: PayoutId) -> Result<Payout, PayoutError> {
        let (payout, changed) = self
            .transition(payout_id, PayoutStatus::Processing, |p| p.start_processing())
            .await?;
        if changed {
            tracing::info!(payout_id = %payout.id, "Payout processing");
        }
        Ok(payout)
    }

    /// `Processing → Completed`. No ledger change.
    pub async fn complete(&self, payout_id: PayoutId) -> Result<Payout, PayoutError> {
        let (payout, changed) = self
            .transition(payout_id, PayoutStatus::Completed, |p| p.complete())
            .await?;
        if changed {
            tracing::info!(payout_id = %payout.id, mentor_id = %payout.mentor_id, "Payout completed");
            publish_event(
                self.publisher.as_ref(),
                &PayoutEvent::Completed {
                    payout_id: payout.id,
                    mentor_id: payout.mentor_id,
                    amount: payout.amount.amount(),
                },
            )
            .await;
        }
        Ok(payout)
    }

    /// Marks the payout failed and returns its funds.
    pub async fn fail(&self, payout_id: PayoutId, reason: String) -> Result<Payout, PayoutError> {
        let (payout, changed) = self
            .transition(payout_id, PayoutStatus::Failed, |p| p.fail(reason.clone()))
            .await?;
        self.release(&payout).await?;
        if changed {
            tracing::info!(payout_id = %payout.id, reason = %reason, "Payout failed");
            publish_event(
                self.publisher.as_ref(),
                &PayoutEvent::Failed {
                    payout_id: payout.id,
                    mentor_id: payout.mentor_id,
                    amount: payout.amount.amount(),
                    reason,
                },
            )
            .await;
        }
        Ok(payout)
    }

    /// Cancels a pending payout and returns its funds.
    pub async fn cancel(
        &self,
        payout_id: PayoutId,
        reason: Option<String>,
    ) -> Result<Payout, PayoutError> {
        let (payout, changed) = self
            .transition(payout_id, PayoutStatus::Cancelled, |p| p.cancel(reason.clone()))
            .await?;
        self.release(&payout).await?;
        if changed {
            tracing::info!(payout_id = %payout.id, "Payout cancelled");
            publish_event(
                self.publisher.as_ref(),
                &PayoutEvent::Cancelled {
                    payout_id: payout.id,
                    mentor_id: payout.mentor_id,
                    amount: payout.amount.amount(),
                },
            )
            .await;
        }
        Ok(payout)
    }

    pub async fn get(&self, payout_id: PayoutId) -> Result<Payout, PayoutError> {
        self.payouts
            .find_by_id(payout_id)
            .await?
            .ok_or(PayoutError::NotFound(payout_id))
    }

    pub async fn list(&self, filter: PayoutFilter) -> Result<Vec<Payout>, PayoutError> {
        Ok(self.payouts.list(filter).await?)
    }

    /// Releases reservations posted in `[from, to)` whose payout was never
    /// stored. Returns how many were released by this call.
    pub async fn release_orphaned_reservations(
        &self,
        from: Timestamp,
        to: Timestamp,
        limit: u32,
    ) -> Result<usize, PayoutError> {
        let reservations = self.ledger.payout_reservations_between(from, to, limit).await?;

        let mut released = 0;
        for entry in reservations {
            let Some(payout_id) = entry.reserved_payout() else {
                continue;
            };
            if self.payouts.find_by_id(payout_id).await?.is_some() {
                continue;
            }
            let posting = self
                .ledger
                .release_on_failure_or_cancel(entry.mentor_id, payout_id, entry.requested)
                .await?;
            if posting.newly_posted {
                tracing::warn!(
                    payout_id = %payout_id,
                    mentor_id = %entry.mentor_id,
                    amount = entry.requested,
                    "Released reservation with no stored payout"
                );
                released += 1;
            }
        }
        Ok(released)
    }

    async fn release(&self, payout: &Payout) -> Result<(), PayoutError> {
        self.ledger
            .release_on_failure_or_cancel(payout.mentor_id, payout.id, payout.amount.amount())
            .await?;
        Ok(())
    }

    /// Moves the payout to `target`, reloading on version conflicts.
    ///
    /// Returns the stored payout and whether this call changed it. A payout
    /// already in `target` is returned unchanged.
    async fn transition<F>(
        &self,
        payout_id: PayoutId,
        target: PayoutStatus,
        apply: F,
    ) -> Result<(Payout, bool), PayoutError>
    where
        F: Fn(&mut Payout) -> Result<(), PayoutError>,
    {
        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let mut payout = self.get(payout_id).await?;
            if payout.status == target {
                return Ok((payout, false));
            }
            apply(&mut payout)?;

            match self.payouts.update(&payout).await {
                Ok(()) => {
                    payout.version += 1;
                    return Ok((payout, true));
                }
                Err(e) if e.code == ErrorCode::Conflict => {
                    tracing::debug!(payout_id = %payout_id, attempt, "Payout version conflict; reloading");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(PayoutError::Infrastructure(format!(
            "payout {} kept changing concurrently",
            payout_id
        )))
    }
}
