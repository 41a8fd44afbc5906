//! Money value object.
//!
//! All monetary values are integer minor units (piastres, cents) tagged with
//! their currency. Arithmetic never mixes currencies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// ISO-4217 currencies the platform handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Egyptian pound, the ledger currency.
    Egp,
    /// US dollar, required by the card network provider.
    Usd,
}

impl Currency {
    /// ISO code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Egp => "EGP",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EGP" => Ok(Currency::Egp),
            "USD" => Ok(Currency::Usd),
            other => Err(ValidationError::invalid_format(
                "currency",
                format!("unsupported currency '{}'", other),
            )),
        }
    }
}

/// An amount of money in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a non-negative amount.
    pub fn new(amount: i64, currency: Currency) -> Result<Self, ValidationError> {
        if amount < 0 {
            return Err(ValidationError::out_of_range("amount", 0, i64::MAX, amount));
        }
        Ok(Self { amount, currency })
    }

    /// Creates a strictly positive amount.
    pub fn positive(amount: i64, currency: Currency) -> Result<Self, ValidationError> {
        if amount <= 0 {
            return Err(ValidationError::out_of_range("amount", 1, i64::MAX, amount));
        }
        Ok(Self { amount, currency })
    }

    /// Fixed amount for constants such as provider minimums.
    pub const fn from_minor(amount: u32, currency: Currency) -> Self {
        Self {
            amount: amount as i64,
            currency,
        }
    }

    /// Zero in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self { amount: 0, currency }
    }

    /// Minor units.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Adds two amounts of the same currency.
    pub fn checked_add(&self, other: Money) -> Result<Money, ValidationError> {
        self.ensure_same_currency(&other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| ValidationError::invalid_format("amount", "overflow"))?;
        Ok(Money { amount, currency: self.currency })
    }

    /// Subtracts `other`, failing if the result would be negative.
    pub fn checked_sub(&self, other: Money) -> Result<Money, ValidationError> {
        self.ensure_same_currency(&other)?;
        Money::new(self.amount - other.amount, self.currency)
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), ValidationError> {
        if self.currency != other.currency {
            return Err(ValidationError::invalid_format(
                "currency",
                format!("cannot combine {} with {}", self.currency, other.currency),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02} {}", self.amount / 100, self.amount % 100, self.currency)
    }
}
