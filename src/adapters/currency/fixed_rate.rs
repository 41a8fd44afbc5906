//! Fixed-rate EGP/USD converter.
//!
//! Rates are held as integer micro-units so conversion stays in integer
//! arithmetic; results round half up to the nearest minor unit.

use crate::domain::foundation::{Currency, Money, ValidationError};
use crate::ports::CurrencyConverter;

const MICROS: i128 = 1_000_000;

/// Converter with one configured EGP-per-USD rate.
#[derive(Debug, Clone, Copy)]
pub struct FixedRateConverter {
    egp_per_usd_micros: i128,
}

impl FixedRateConverter {
    pub fn new(egp_per_usd: f64) -> Result<Self, ValidationError> {
        if !egp_per_usd.is_finite() || egp_per_usd <= 0.0 {
            return Err(ValidationError::invalid_format(
                "egp_per_usd",
                format!("rate must be a positive number, got {}", egp_per_usd),
            ));
        }
        let micros = (egp_per_usd * MICROS as f64).round() as i128;
        if micros == 0 {
            return Err(ValidationError::invalid_format("egp_per_usd", "rate too small"));
        }
        Ok(Self {
            egp_per_usd_micros: micros,
        })
    }
}

fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    (numerator * 2 + denominator) / (denominator * 2)
}

impl CurrencyConverter for FixedRateConverter {
    fn convert(&self, money: Money, to: Currency) -> Result<Money, ValidationError> {
        let amount = money.amount() as i128;
        let converted = match (money.currency(), to) {
            (from, to) if from == to => return Ok(money),
            (Currency::Usd, Currency::Egp) => {
                div_round_half_up(amount * self.egp_per_usd_micros, MICROS)
            }
            (Currency::Egp, Currency::Usd) => {
                div_round_half_up(amount * MICROS, self.egp_per_usd_micros)
            }
            (from, to) => {
                return Err(ValidationError::invalid_format(
                    "currency",
                    format!("no rate from {} to {}", from, to),
                ))
            }
        };
        let converted = i64::try_from(converted)
            .map_err(|_| ValidationError::invalid_format("amount", "overflow"))?;
        Money::new(converted, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter() -> FixedRateConverter {
        FixedRateConverter::new(50.0).unwrap()
    }

    #[test]
    fn egp_to_usd_divides_by_rate() {
        let usd = converter()
            .convert(Money::new(50_000, Currency::Egp).unwrap(), Currency::Usd)
            .unwrap();
        assert_eq!(usd, Money::new(1_000, Currency::Usd).unwrap());
    }

    #[test]
    fn usd_to_egp_multiplies_by_rate() {
        let egp = converter()
            .convert(Money::new(1_000, Currency::Usd).unwrap(), Currency::Egp)
            .unwrap();
        assert_eq!(egp.amount(), 50_000);
    }

    #[test]
    fn rounds_half_up() {
        // 125 / 50 = 2.5 cents
        let usd = converter()
            .convert(Money::new(125, Currency::Egp).unwrap(), Currency::Usd)
            .unwrap();
        assert_eq!(usd.amount(), 3);
    }

    #[test]
    fn fractional_rate_is_kept() {
        let converter = FixedRateConverter::new(48.5).unwrap();
        let usd = converter
            .convert(Money::new(48_500, Currency::Egp).unwrap(), Currency::Usd)
            .unwrap();
        assert_eq!(usd.amount(), 1_000);
    }

    #[test]
    fn same_currency_is_identity() {
        let money = Money::new(777, Currency::Egp).unwrap();
        assert_eq!(converter().convert(money, Currency::Egp).unwrap(), money);
    }

    #[test]
    fn rejects_non_positive_rate() {
        assert!(FixedRateConverter::new(0.0).is_err());
        assert!(FixedRateConverter::new(-3.0).is_err());
        assert!(FixedRateConverter::new(f64::NAN).is_err());
    }
}
