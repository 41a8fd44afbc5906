//! Payout amount bounds.

use serde::{Deserialize, Serialize};

use super::PayoutError;

/// Minimum and maximum single withdrawal, in ledger minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutPolicy {
    pub minimum: i64,
    pub maximum: i64,
}

impl PayoutPolicy {
    pub fn new(minimum: i64, maximum: i64) -> Self {
        Self { minimum, maximum }
    }

    pub fn check(&self, amount: i64) -> Result<(), PayoutError> {
        if amount < self.minimum {
            return Err(PayoutError::BelowMinimum {
                amount,
                minimum: self.minimum,
            });
        }
        if amount > self.maximum {
            return Err(PayoutError::AboveMaximum {
                amount,
                maximum: self.maximum,
            });
        }
        Ok(())
    }
}

impl Default for PayoutPolicy {
    /// 100 EGP to 50,000 EGP.
    fn default() -> Self {
        Self::new(10_000, 5_000_000)
    }
}
