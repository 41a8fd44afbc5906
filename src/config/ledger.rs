//! Ledger, payout and reconciliation settings

use serde::Deserialize;
use std::time::Duration;

use crate::application::ledger::LedgerSettings;
use crate::application::payments::{PaymentSettings, ReconciliationSweepConfig};
use crate::domain::foundation::{Currency, Percentage};
use crate::domain::payout::PayoutPolicy;

use super::error::ValidationError;

/// Business rules for commission, balances, payouts and the sweep.
///
/// Amounts are in minor units of `currency`.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// ISO code balances and session prices are kept in
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Platform share of each session price
    #[serde(default = "default_commission_percent")]
    pub commission_percent: u8,

    #[serde(default = "default_payout_minimum")]
    pub payout_minimum: i64,

    #[serde(default = "default_payout_maximum")]
    pub payout_maximum: i64,

    /// Age at which an open payment is picked up by the sweep
    #[serde(default = "default_pending_timeout")]
    pub pending_timeout_secs: i64,

    /// Age at which a read re-checks a pending payment with its provider
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: i64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: u32,

    /// Balance commit attempts under contention
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,
}

impl LedgerConfig {
    pub fn currency(&self) -> Result<Currency, ValidationError> {
        self.currency
            .parse()
            .map_err(|_| ValidationError::UnsupportedCurrency(self.currency.clone()))
    }

    pub fn payment_settings(&self) -> Result<PaymentSettings, ValidationError> {
        Ok(PaymentSettings {
            commission_rate: Percentage::try_new(self.commission_percent)
                .map_err(|_| ValidationError::InvalidCommission)?,
            ledger_currency: self.currency()?,
            stale_after_secs: self.stale_after_secs,
        })
    }

    pub fn ledger_settings(&self) -> Result<LedgerSettings, ValidationError> {
        Ok(LedgerSettings {
            currency: self.currency()?,
            max_attempts: self.max_commit_attempts,
        })
    }

    pub fn payout_policy(&self) -> PayoutPolicy {
        PayoutPolicy::new(self.payout_minimum, self.payout_maximum)
    }

    pub fn sweep_config(&self) -> ReconciliationSweepConfig {
        ReconciliationSweepConfig::default()
            .with_interval(Duration::from_secs(self.sweep_interval_secs))
            .with_batch_size(self.sweep_batch_size)
            .with_pending_timeout_secs(self.pending_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.currency()?;
        if self.commission_percent > 100 {
            return Err(ValidationError::InvalidCommission);
        }
        if self.payout_minimum <= 0 || self.payout_minimum > self.payout_maximum {
            return Err(ValidationError::InvalidPayoutLimits);
        }
        if self.pending_timeout_secs <= 0 {
            return Err(ValidationError::InvalidLedgerSetting("pending_timeout_secs"));
        }
        if self.stale_after_secs <= 0 {
            return Err(ValidationError::InvalidLedgerSetting("stale_after_secs"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidLedgerSetting("sweep_interval_secs"));
        }
        if self.sweep_batch_size == 0 {
            return Err(ValidationError::InvalidLedgerSetting("sweep_batch_size"));
        }
        if self.max_commit_attempts == 0 {
            return Err(ValidationError::InvalidLedgerSetting("max_commit_attempts"));
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            commission_percent: default_commission_percent(),
            payout_minimum: default_payout_minimum(),
            payout_maximum: default_payout_maximum(),
            pending_timeout_secs: default_pending_timeout(),
            stale_after_secs: default_stale_after(),
            sweep_interval_secs: default_sweep_interval(),
            sweep_batch_size: default_sweep_batch_size(),
            max_commit_attempts: default_max_commit_attempts(),
        }
    }
}

fn default_currency() -> String {
    "EGP".to_string()
}

fn default_commission_percent() -> u8 {
    15
}

// 100 EGP
fn default_payout_minimum() -> i64 {
    10_000
}

// 50,000 EGP
fn default_payout_maximum() -> i64 {
    5_000_000
}

fn default_pending_timeout() -> i64 {
    900
}

fn default_stale_after() -> i64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_sweep_batch_size() -> u32 {
    100
}

fn default_max_commit_attempts() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_defaults() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());

        let payment = config.payment_settings().unwrap();
        assert_eq!(payment.commission_rate, Percentage::FIFTEEN);
        assert_eq!(payment.ledger_currency, Currency::Egp);
        assert_eq!(config.payout_policy(), PayoutPolicy::default());
        assert_eq!(config.ledger_settings().unwrap().max_attempts, 5);
    }

    #[test]
    fn test_sweep_config_uses_configured_values() {
        let config = LedgerConfig {
            sweep_interval_secs: 5,
            sweep_batch_size: 20,
            pending_timeout_secs: 120,
            ..Default::default()
        };
        let sweep = config.sweep_config();
        assert_eq!(sweep.interval, Duration::from_secs(5));
        assert_eq!(sweep.batch_size, 20);
        assert_eq!(sweep.pending_timeout_secs, 120);
    }

    #[test]
    fn test_currency_is_case_insensitive() {
        let config = LedgerConfig {
            currency: "usd".to_string(),
            ..Default::default()
        };
        assert_eq!(config.currency(), Ok(Currency::Usd));
    }

    #[test]
    fn test_unsupported_currency_rejected() {
        let config = LedgerConfig {
            currency: "EUR".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::UnsupportedCurrency("EUR".to_string()))
        );
    }

    #[test]
    fn test_commission_above_hundred_rejected() {
        let config = LedgerConfig {
            commission_percent: 101,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidCommission));
    }

    #[test]
    fn test_payout_limits_must_be_ordered() {
        let config = LedgerConfig {
            payout_minimum: 10_000,
            payout_maximum: 5_000,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidPayoutLimits));
    }

    #[test]
    fn test_zero_sweep_batch_rejected() {
        let config = LedgerConfig {
            sweep_batch_size: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidLedgerSetting("sweep_batch_size"))
        );
    }
}
