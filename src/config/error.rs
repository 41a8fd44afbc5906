//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid Stripe API key format")]
    InvalidStripeKey,

    #[error("Invalid Stripe webhook secret format")]
    InvalidStripeWebhookSecret,

    #[error("Paymob integration id must be positive")]
    InvalidPaymobIntegration,

    #[error("Exchange rate must be a positive number")]
    InvalidExchangeRate,

    #[error("Unsupported ledger currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Commission percent must be between 0 and 100")]
    InvalidCommission,

    #[error("Payout limits must satisfy 0 < minimum <= maximum")]
    InvalidPayoutLimits,

    #[error("Invalid ledger setting: {0}")]
    InvalidLedgerSetting(&'static str),
}
