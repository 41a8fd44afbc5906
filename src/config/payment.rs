//! Payment provider configuration (Stripe and Paymob)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::paymob::PaymobConfig;
use crate::adapters::stripe::StripeConfig;

use super::error::ValidationError;

/// Credentials and settings for both payment providers.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    pub stripe_api_key: SecretString,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: SecretString,

    /// Reject test-mode webhook events
    #[serde(default)]
    pub stripe_require_livemode: bool,

    pub stripe_api_base_url: Option<String>,

    /// Paymob Accept API key
    pub paymob_api_key: SecretString,

    /// Paymob HMAC secret for callback verification
    pub paymob_hmac_secret: SecretString,

    pub paymob_card_integration_id: i64,

    pub paymob_wallet_integration_id: i64,

    /// Paymob hosted iframe used for card checkout
    pub paymob_iframe_id: String,

    pub paymob_api_base_url: Option<String>,

    /// Rate used to convert USD prices to EGP for Paymob charges
    #[serde(default = "default_egp_per_usd")]
    pub egp_per_usd: f64,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    pub fn stripe_config(&self) -> StripeConfig {
        let config = StripeConfig::new(
            self.stripe_api_key.clone(),
            self.stripe_webhook_secret.clone(),
        )
        .with_require_livemode(self.stripe_require_livemode);
        match &self.stripe_api_base_url {
            Some(url) => config.with_base_url(url.clone()),
            None => config,
        }
    }

    pub fn paymob_config(&self) -> PaymobConfig {
        let config = PaymobConfig::new(
            self.paymob_api_key.clone(),
            self.paymob_hmac_secret.clone(),
            self.paymob_card_integration_id,
            self.paymob_wallet_integration_id,
            self.paymob_iframe_id.clone(),
        );
        match &self.paymob_api_base_url {
            Some(url) => config.with_base_url(url.clone()),
            None => config,
        }
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let stripe_key = self.stripe_api_key.expose_secret();
        let stripe_secret = self.stripe_webhook_secret.expose_secret();

        if stripe_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if stripe_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }
        if !stripe_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !stripe_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        if self.paymob_api_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMOB_API_KEY"));
        }
        if self.paymob_hmac_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMOB_HMAC_SECRET"));
        }
        if self.paymob_iframe_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMOB_IFRAME_ID"));
        }
        if self.paymob_card_integration_id <= 0 || self.paymob_wallet_integration_id <= 0 {
            return Err(ValidationError::InvalidPaymobIntegration);
        }

        if !self.egp_per_usd.is_finite() || self.egp_per_usd <= 0.0 {
            return Err(ValidationError::InvalidExchangeRate);
        }

        Ok(())
    }
}

fn default_egp_per_usd() -> f64 {
    50.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::new(value.to_string())
    }

    fn valid() -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: secret("sk_test_abcd1234"),
            stripe_webhook_secret: secret("whsec_xyz789"),
            stripe_require_livemode: false,
            stripe_api_base_url: None,
            paymob_api_key: secret("paymob-key"),
            paymob_hmac_secret: secret("paymob-hmac"),
            paymob_card_integration_id: 11,
            paymob_wallet_integration_id: 12,
            paymob_iframe_id: "834".to_string(),
            paymob_api_base_url: None,
            egp_per_usd: default_egp_per_usd(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid();
        assert!(config.validate().is_ok());
        assert!(config.is_test_mode());
    }

    #[test]
    fn test_stripe_key_prefixes() {
        let config = PaymentConfig {
            stripe_api_key: secret("pk_test_xxx"),
            ..valid()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidStripeKey));

        let config = PaymentConfig {
            stripe_webhook_secret: secret("secret_xxx"),
            ..valid()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidStripeWebhookSecret));
    }

    #[test]
    fn test_missing_paymob_hmac_secret() {
        let config = PaymentConfig {
            paymob_hmac_secret: secret(""),
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("PAYMOB_HMAC_SECRET"))
        );
    }

    #[test]
    fn test_integration_ids_must_be_positive() {
        let config = PaymentConfig {
            paymob_wallet_integration_id: 0,
            ..valid()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidPaymobIntegration));
    }

    #[test]
    fn test_exchange_rate_must_be_positive() {
        for rate in [0.0, -1.0, f64::NAN] {
            let config = PaymentConfig {
                egp_per_usd: rate,
                ..valid()
            };
            assert_eq!(config.validate(), Err(ValidationError::InvalidExchangeRate));
        }
    }

    #[test]
    fn test_secrets_are_redacted_in_debug_output() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains("sk_test_abcd1234"));
        assert!(!rendered.contains("paymob-hmac"));
    }
}
