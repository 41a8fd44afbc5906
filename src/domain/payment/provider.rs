//! Payment provider and method enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Third-party providers a payment can be routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    /// Card-network provider; signs webhooks in a header, charges in USD.
    Stripe,
    /// Regional wallet/card gateway; signs webhooks with a query parameter.
    Paymob,
}

impl PaymentProvider {
    pub const ALL: [PaymentProvider; 2] = [PaymentProvider::Stripe, PaymentProvider::Paymob];

    /// Path segment and storage value.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::Paymob => "paymob",
        }
    }

    /// Whether the provider distinguishes payment-method sub-types.
    pub fn supports_methods(&self) -> bool {
        matches!(self, PaymentProvider::Paymob)
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProvider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(PaymentProvider::Stripe),
            "paymob" => Ok(PaymentProvider::Paymob),
            other => Err(ValidationError::invalid_format(
                "provider",
                format!("unknown payment provider '{}'", other),
            )),
        }
    }
}

/// Payment-method sub-type, only meaningful for Paymob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Wallet => "wallet",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "wallet" => Ok(PaymentMethod::Wallet),
            other => Err(ValidationError::invalid_format(
                "method",
                format!("unknown payment method '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_round_trips_through_path_segment() {
        for provider in PaymentProvider::ALL {
            assert_eq!(provider.as_str().parse::<PaymentProvider>().unwrap(), provider);
        }
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!("paypal".parse::<PaymentProvider>().is_err());
    }

    #[test]
    fn only_paymob_supports_methods() {
        assert!(PaymentProvider::Paymob.supports_methods());
        assert!(!PaymentProvider::Stripe.supports_methods());
    }

    #[test]
    fn method_parses_from_snake_case() {
        assert_eq!("wallet".parse::<PaymentMethod>().unwrap(), PaymentMethod::Wallet);
    }
}
