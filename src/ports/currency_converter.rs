//! Currency conversion port.

use crate::domain::foundation::{Currency, Money, ValidationError};

/// Pure conversion between currencies at externally fixed rates.
pub trait CurrencyConverter: Send + Sync {
    /// Converts `money` into `to`, rounding to the nearest minor unit.
    fn convert(&self, money: Money, to: Currency) -> Result<Money, ValidationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn accepts_dyn(_: &dyn CurrencyConverter) {}
}
