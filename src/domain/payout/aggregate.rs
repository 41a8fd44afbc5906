//! Payout aggregate entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MentorId, Money, PayoutId, StateMachine, Timestamp};

use super::{PayoutError, PayoutStatus};

/// A mentor-initiated withdrawal.
///
/// Immutable once `Completed` or `Cancelled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub id: PayoutId,
    pub mentor_id: MentorId,
    pub amount: Money,
    pub status: PayoutStatus,
    pub failure_reason: Option<String>,
    pub requested_at: Timestamp,
    pub processed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
    pub version: i64,
}

impl Payout {
    /// A new `Pending` payout. Funds must already be reserved.
    pub fn request(id: PayoutId, mentor_id: MentorId, amount: Money) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            mentor_id,
            amount,
            status: PayoutStatus::Pending,
            failure_reason: None,
            requested_at: now,
            processed_at: None,
            completed_at: None,
            updated_at: now,
            version: 0,
        }
    }

    /// External transfer initiated.
    pub fn start_processing(&mut self) -> Result<(), PayoutError> {
        self.transition_to(PayoutStatus::Processing, "process")?;
        self.processed_at = Some(self.updated_at);
        Ok(())
    }

    /// External transfer confirmed.
    pub fn complete(&mut self) -> Result<(), PayoutError> {
        self.transition_to(PayoutStatus::Completed, "complete")?;
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), PayoutError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(PayoutError::validation("reason", "a failure reason is required"));
        }
        self.transition_to(PayoutStatus::Failed, "fail")?;
        self.failure_reason = Some(reason);
        Ok(())
    }

    pub fn cancel(&mut self, reason: Option<String>) -> Result<(), PayoutError> {
        self.transition_to(PayoutStatus::Cancelled, "cancel")?;
        self.failure_reason = reason.filter(|r| !r.trim().is_empty());
        Ok(())
    }

    fn transition_to(&mut self, target: PayoutStatus, action: &str) -> Result<(), PayoutError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| PayoutError::invalid_state(self.status, action))?;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Currency;

    fn payout() -> Payout {
        Payout::request(
            PayoutId::new(),
            MentorId::new(),
            Money::new(30_000, Currency::Egp).unwrap(),
        )
    }

    #[test]
    fn request_starts_pending() {
        let payout = payout();
        assert_eq!(payout.status, PayoutStatus::Pending);
        assert!(payout.processed_at.is_none());
    }

    #[test]
    fn full_lifecycle_sets_timestamps() {
        let mut payout = payout();
        payout.start_processing().unwrap();
        assert!(payout.processed_at.is_some());
        payout.complete().unwrap();
        assert_eq!(payout.status, PayoutStatus::Completed);
        assert!(payout.completed_at.is_some());
    }

    #[test]
    fn completed_payout_is_immutable() {
        let mut payout = payout();
        payout.start_processing().unwrap();
        payout.complete().unwrap();
        assert!(payout.fail("bounced").is_err());
        assert!(payout.cancel(None).is_err());
        assert_eq!(payout.status, PayoutStatus::Completed);
    }

    #[test]
    fn fail_records_reason() {
        let mut payout = payout();
        payout.fail("bank rejected account").unwrap();
        assert_eq!(payout.failure_reason.as_deref(), Some("bank rejected account"));
    }

    #[test]
    fn fail_requires_reason() {
        let mut payout = payout();
        assert!(matches!(payout.fail("  "), Err(PayoutError::Validation { .. })));
        assert_eq!(payout.status, PayoutStatus::Pending);
    }

    #[test]
    fn processing_payout_cannot_be_cancelled() {
        let mut payout = payout();
        payout.start_processing().unwrap();
        let err = payout.cancel(None).unwrap_err();
        assert!(matches!(err, PayoutError::InvalidState { current: PayoutStatus::Processing, .. }));
    }
}
