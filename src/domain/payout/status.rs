//! Payout status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Requested; funds already reserved from the available balance.
    Pending,
    /// External transfer initiated.
    Processing,
    /// Transfer confirmed. Terminal.
    Completed,
    /// Transfer failed; funds returned. Terminal.
    Failed,
    /// Withdrawn by an administrator before processing; funds returned. Terminal.
    Cancelled,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Failed => "failed",
            PayoutStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses whose reservation has been handed back to the mentor.
    pub fn releases_funds(&self) -> bool {
        matches!(self, PayoutStatus::Failed | PayoutStatus::Cancelled)
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PayoutStatus::Pending),
            "processing" => Ok(PayoutStatus::Processing),
            "completed" => Ok(PayoutStatus::Completed),
            "failed" => Ok(PayoutStatus::Failed),
            "cancelled" => Ok(PayoutStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "payout_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for PayoutStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PayoutStatus::*;
        matches!(
            (self, target),
            (Pending, Processing)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PayoutStatus::*;
        match self {
            Pending => vec![Processing, Failed, Cancelled],
            Processing => vec![Completed, Failed],
            Completed | Failed | Cancelled => vec![],
        }
    }
}
