//! Payment status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle of a single payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Row persisted, provider not yet contacted (or contact failed mid-flight).
    Created,

    /// Provider accepted the intent; waiting for settlement.
    PendingConfirmation,

    /// Provider confirmed the charge.
    Succeeded,

    /// Part of the charge was returned to the mentee.
    PartiallyRefunded,

    /// The whole charge was returned to the mentee.
    FullyRefunded,

    /// The attempt failed or was abandoned. A new attempt needs a new payment.
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "created",
            PaymentStatus::PendingConfirmation => "pending_confirmation",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
            PaymentStatus::FullyRefunded => "fully_refunded",
            PaymentStatus::Failed => "failed",
        }
    }

    /// True once money has been collected, including after refunds.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Succeeded | PaymentStatus::PartiallyRefunded | PaymentStatus::FullyRefunded
        )
    }

    /// Refunds are only legal while some collected money remains.
    pub fn is_refundable(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded | PaymentStatus::PartiallyRefunded)
    }

    /// Still waiting on the provider.
    pub fn is_open(&self) -> bool {
        matches!(self, PaymentStatus::Created | PaymentStatus::PendingConfirmation)
    }

    /// Returns true if the current status already covers what a provider
    /// callback reports, so applying it would be a duplicate or stale delivery.
    pub fn already_reflects(&self, reported: CallbackStatus) -> bool {
        match reported {
            CallbackStatus::Pending => *self != PaymentStatus::Created,
            CallbackStatus::Succeeded => self.is_settled(),
            CallbackStatus::Failed => *self == PaymentStatus::Failed || self.is_settled(),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(PaymentStatus::Created),
            "pending_confirmation" => Ok(PaymentStatus::PendingConfirmation),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "partially_refunded" => Ok(PaymentStatus::PartiallyRefunded),
            "fully_refunded" => Ok(PaymentStatus::FullyRefunded),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Created, PendingConfirmation)
                | (Created, Succeeded)
                | (Created, Failed)
                | (PendingConfirmation, Succeeded)
                | (PendingConfirmation, Failed)
                | (Succeeded, PartiallyRefunded)
                | (Succeeded, FullyRefunded)
                | (PartiallyRefunded, PartiallyRefunded)
                | (PartiallyRefunded, FullyRefunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Created => vec![PendingConfirmation, Succeeded, Failed],
            PendingConfirmation => vec![Succeeded, Failed],
            Succeeded => vec![PartiallyRefunded, FullyRefunded],
            PartiallyRefunded => vec![PartiallyRefunded, FullyRefunded],
            FullyRefunded | Failed => vec![],
        }
    }
}

/// Provider-neutral settlement state reported by a callback or status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStatus {
    Pending,
    Succeeded,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaymentStatus::*;

    const ALL: [PaymentStatus; 6] = [
        Created,
        PendingConfirmation,
        Succeeded,
        PartiallyRefunded,
        FullyRefunded,
        Failed,
    ];

    // ══════════════════════════════════════════════════════════════
    // Transitions
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn happy_path_is_legal() {
        assert!(Created.can_transition_to(&PendingConfirmation));
        assert!(PendingConfirmation.can_transition_to(&Succeeded));
        assert!(Succeeded.can_transition_to(&PartiallyRefunded));
        assert!(PartiallyRefunded.can_transition_to(&FullyRefunded));
    }

    #[test]
    fn succeeded_never_goes_back_to_pending() {
        assert!(!Succeeded.can_transition_to(&PendingConfirmation));
        assert!(Succeeded.transition_to(PendingConfirmation).is_err());
    }

    #[test]
    fn settled_payment_cannot_fail() {
        assert!(!Succeeded.can_transition_to(&Failed));
        assert!(!PartiallyRefunded.can_transition_to(&Failed));
    }

    #[test]
    fn failed_and_fully_refunded_are_terminal() {
        assert!(Failed.is_terminal());
        assert!(FullyRefunded.is_terminal());
        assert!(!PartiallyRefunded.is_terminal());
    }

    #[test]
    fn can_transition_to_matches_valid_transitions() {
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Callback ordering
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn pending_callback_after_success_is_stale() {
        assert!(Succeeded.already_reflects(CallbackStatus::Pending));
        assert!(PendingConfirmation.already_reflects(CallbackStatus::Pending));
        assert!(!Created.already_reflects(CallbackStatus::Pending));
    }

    #[test]
    fn success_callback_is_new_only_while_open() {
        assert!(!Created.already_reflects(CallbackStatus::Succeeded));
        assert!(!PendingConfirmation.already_reflects(CallbackStatus::Succeeded));
        assert!(Succeeded.already_reflects(CallbackStatus::Succeeded));
        assert!(FullyRefunded.already_reflects(CallbackStatus::Succeeded));
    }

    #[test]
    fn failure_callback_after_settlement_is_stale() {
        assert!(Succeeded.already_reflects(CallbackStatus::Failed));
        assert!(Failed.already_reflects(CallbackStatus::Failed));
        assert!(!PendingConfirmation.already_reflects(CallbackStatus::Failed));
    }

    #[test]
    fn status_round_trips_through_storage_string() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
    }
}
