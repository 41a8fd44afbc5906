//! Dispute status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    /// Awaiting an administrator. At most one per session.
    Pending,
    /// Decided. Terminal.
    Resolved,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeStatus::Pending => "pending",
            DisputeStatus::Resolved => "resolved",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, DisputeStatus::Pending)
    }
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisputeStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DisputeStatus::Pending),
            "resolved" => Ok(DisputeStatus::Resolved),
            other => Err(ValidationError::invalid_format(
                "dispute_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for DisputeStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!((self, target), (DisputeStatus::Pending, DisputeStatus::Resolved))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            DisputeStatus::Pending => vec![DisputeStatus::Resolved],
            DisputeStatus::Resolved => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_is_terminal() {
        assert!(DisputeStatus::Resolved.is_terminal());
        assert!(DisputeStatus::Resolved.transition_to(DisputeStatus::Pending).is_err());
    }

    #[test]
    fn only_pending_is_active() {
        assert!(DisputeStatus::Pending.is_active());
        assert!(!DisputeStatus::Resolved.is_active());
    }
}
