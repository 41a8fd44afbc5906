//! Payment aggregate entity.
//!
//! One Payment is one charge attempt for one session. A session may
//! accumulate several Failed attempts but at most one live payment.
//!
//! # Design Decisions
//!
//! - **Money in minor units**: `amount` is the session price in the ledger
//!   currency; `charge` is what the provider collects after conversion.
//! - **Frozen split**: commission and mentor share are fixed at creation.
//! - **Append-only refunds**: each refund is kept with its idempotency reference;
//!   `refund_amount` is their running total.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    MentorId, Money, PaymentId, Percentage, SessionId, StateMachine, Timestamp, UserId,
};

use super::commission::pro_rata;
use super::{CommissionSplit, PaymentError, PaymentMethod, PaymentProvider, PaymentStatus};

/// A refund issued against a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    /// Caller-supplied idempotency reference (e.g. "dispute:<id>").
    pub reference: String,
    /// Minor units in the payment's ledger currency.
    pub amount: i64,
    pub refund_transaction_id: Option<String>,
    pub refunded_at: Timestamp,
}

/// Inputs for a new payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: PaymentId,
    pub session_id: SessionId,
    pub mentee_id: UserId,
    pub mentor_id: MentorId,
    pub provider: PaymentProvider,
    pub method: Option<PaymentMethod>,
    pub amount: Money,
    pub charge: Money,
    pub commission_rate: Percentage,
}

/// Payment aggregate.
///
/// # Invariants
///
/// - `mentor_payout_amount + platform_commission == amount`
/// - `refund_amount <= amount`
/// - settled statuses carry `paid_at` and `transaction_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub session_id: SessionId,
    pub mentee_id: UserId,
    pub mentor_id: MentorId,
    pub provider: PaymentProvider,
    pub method: Option<PaymentMethod>,
    pub amount: Money,
    pub charge: Money,
    pub status: PaymentStatus,
    pub provider_payment_id: Option<String>,
    /// Client secret or redirect URL handed to the mentee's client.
    pub checkout: Option<String>,
    pub transaction_id: Option<String>,
    pub platform_commission: i64,
    pub mentor_payout_amount: i64,
    pub paid_at: Option<Timestamp>,
    pub refund_amount: Option<i64>,
    pub refunded_at: Option<Timestamp>,
    pub refunds: Vec<Refund>,
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Optimistic concurrency version as loaded from storage.
    pub version: i64,
}

impl Payment {
    /// Creates a payment in `Created` with its commission split frozen.
    pub fn create(new: NewPayment) -> Result<Self, PaymentError> {
        if new.amount.amount() <= 0 {
            return Err(PaymentError::InvalidAmount(format!(
                "session price must be positive, got {}",
                new.amount
            )));
        }
        if new.charge.amount() <= 0 {
            return Err(PaymentError::InvalidAmount(format!(
                "charge must be positive, got {}",
                new.charge
            )));
        }

        let method = match (new.provider.supports_methods(), new.method) {
            (true, Some(method)) => Some(method),
            (true, None) => Some(PaymentMethod::Card),
            (false, None) => None,
            (false, Some(_)) => {
                return Err(PaymentError::validation(
                    "method",
                    format!("{} does not take a payment method", new.provider),
                ))
            }
        };

        let split = CommissionSplit::compute(new.amount.amount(), new.commission_rate);
        let now = Timestamp::now();

        Ok(Self {
            id: new.id,
            session_id: new.session_id,
            mentee_id: new.mentee_id,
            mentor_id: new.mentor_id,
            provider: new.provider,
            method,
            amount: new.amount,
            charge: new.charge,
            status: PaymentStatus::Created,
            provider_payment_id: None,
            checkout: None,
            transaction_id: None,
            platform_commission: split.platform_commission,
            mentor_payout_amount: split.mentor_payout_amount,
            paid_at: None,
            refund_amount: None,
            refunded_at: None,
            refunds: Vec::new(),
            failure_reason: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn split(&self) -> CommissionSplit {
        CommissionSplit {
            platform_commission: self.platform_commission,
            mentor_payout_amount: self.mentor_payout_amount,
        }
    }

    /// Provider accepted the intent.
    pub fn mark_pending(
        &mut self,
        provider_payment_id: impl Into<String>,
        checkout: Option<String>,
    ) -> Result<(), PaymentError> {
        self.transition_to(PaymentStatus::PendingConfirmation, "confirm intent for")?;
        self.provider_payment_id = Some(provider_payment_id.into());
        self.checkout = checkout;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Provider confirmed the charge.
    pub fn mark_succeeded(
        &mut self,
        transaction_id: impl Into<String>,
        paid_at: Timestamp,
    ) -> Result<(), PaymentError> {
        let transaction_id = transaction_id.into();
        if transaction_id.is_empty() {
            return Err(PaymentError::validation(
                "transaction_id",
                "a settled payment needs a provider transaction id",
            ));
        }
        self.transition_to(PaymentStatus::Succeeded, "settle")?;
        self.transaction_id = Some(transaction_id);
        self.paid_at = Some(paid_at);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// The attempt failed or was abandoned.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), PaymentError> {
        self.transition_to(PaymentStatus::Failed, "fail")?;
        self.failure_reason = Some(reason.into());
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Total refunded so far.
    pub fn refunded_total(&self) -> i64 {
        self.refund_amount.unwrap_or(0)
    }

    /// Amount still available for refunds.
    pub fn remaining_refundable(&self) -> i64 {
        self.amount.amount() - self.refunded_total()
    }

    pub fn find_refund(&self, reference: &str) -> Option<&Refund> {
        self.refunds.iter().find(|r| r.reference == reference)
    }

    /// Checks a refund of `amount` is legal without changing anything.
    ///
    /// An over-refund is an invariant violation and keeps the attempted value.
    pub fn ensure_refundable(&self, amount: i64) -> Result<(), PaymentError> {
        if !self.status.is_refundable() {
            return Err(PaymentError::invalid_state(self.status, "refund"));
        }
        if amount <= 0 {
            return Err(PaymentError::validation(
                "amount",
                format!("refund amount must be positive, got {}", amount),
            ));
        }
        let remaining = self.remaining_refundable();
        if amount > remaining {
            return Err(PaymentError::invariant(format!(
                "refund of {} exceeds remaining {} on payment {} (amount {}, already refunded {})",
                amount,
                remaining,
                self.id,
                self.amount.amount(),
                self.refunded_total()
            )));
        }
        Ok(())
    }

    /// Records a refund the provider has executed.
    pub fn apply_refund(&mut self, refund: Refund) -> Result<(), PaymentError> {
        self.ensure_refundable(refund.amount)?;

        let total = self.refunded_total() + refund.amount;
        let target = if total == self.amount.amount() {
            PaymentStatus::FullyRefunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        self.transition_to(target, "refund")?;

        self.refund_amount = Some(total);
        self.refunded_at = Some(refund.refunded_at);
        self.refunds.push(refund);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// The provider-currency amount to return for the next refund of
    /// `amount` ledger minor units.
    ///
    /// Converted on the running total, so partial refunds that add up to the
    /// price return exactly the full charge.
    pub fn charge_portion(&self, amount: i64) -> i64 {
        let before = self.refunded_total();
        let after = before.saturating_add(amount);
        let price = self.amount.amount();
        pro_rata(after, price, self.charge.amount()) - pro_rata(before, price, self.charge.amount())
    }

    /// 1-based position of the refund recorded under `reference`.
    pub fn refund_sequence(&self, reference: &str) -> Option<u32> {
        self.refunds
            .iter()
            .position(|r| r.reference == reference)
            .map(|index| index as u32 + 1)
    }

    /// The mentor's part of `refund`, given every refund recorded before it.
    ///
    /// A refund not yet recorded is treated as the next one.
    pub fn mentor_share_of_refund(&self, refund: &Refund) -> i64 {
        let before: i64 = self
            .refunds
            .iter()
            .take_while(|r| r.reference != refund.reference)
            .map(|r| r.amount)
            .sum();
        self.split()
            .mentor_share_of(before, refund.amount, self.amount.amount())
    }

    /// Open for longer than `max_age_secs`.
    pub fn is_stale(&self, now: Timestamp, max_age_secs: i64) -> bool {
        self.status.is_open() && now.duration_since(&self.created_at).num_seconds() > max_age_secs
    }

    /// Verifies the cross-field invariants.
    pub fn check_invariants(&self) -> Result<(), PaymentError> {
        if self.mentor_payout_amount + self.platform_commission != self.amount.amount() {
            return Err(PaymentError::invariant(format!(
                "split {} + {} does not equal amount {} on payment {}",
                self.mentor_payout_amount,
                self.platform_commission,
                self.amount.amount(),
                self.id
            )));
        }
        if self.refunded_total() > self.amount.amount() {
            return Err(PaymentError::invariant(format!(
                "refunded {} exceeds amount {} on payment {}",
                self.refunded_total(),
                self.amount.amount(),
                self.id
            )));
        }
        let settled = self.status.is_settled();
        if settled != (self.paid_at.is_some() && self.transaction_id.is_some()) {
            return Err(PaymentError::invariant(format!(
                "payment {} in status {} has inconsistent settlement fields",
                self.id, self.status
            )));
        }
        Ok(())
    }

    fn transition_to(&mut self, target: PaymentStatus, action: &str) -> Result<(), PaymentError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| PaymentError::invalid_state(self.status, action))?;
        Ok(())
    }
}
