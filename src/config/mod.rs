//! Service configuration.
//!
//! Every setting comes from `MENTORSHIP__<SECTION>__<KEY>` environment
//! variables, with `.env` read first when present. Only the database URL
//! and the provider credentials are required; `server` and `ledger` fall
//! back to defaults.
//!
//! ```no_run
//! use mentorship_ledger::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

mod database;
mod error;
mod ledger;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use ledger::LedgerConfig;
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Stripe and Paymob credentials.
    pub payment: PaymentConfig,
    /// Commission, payout limits and sweep timing.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl AppConfig {
    /// Loads `.env` if present, then reads variables such as
    /// `MENTORSHIP__SERVER__PORT=8080` (-> `server.port`) and
    /// `MENTORSHIP__PAYMENT__PAYMOB_HMAC_SECRET=...` (-> `payment.paymob_hmac_secret`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into their expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("MENTORSHIP")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Checks cross-field rules `serde` cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.ledger.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
