//! Platform commission split.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Percentage;

/// How a payment amount divides between the platform and the mentor.
///
/// Frozen on the payment at creation; later rate changes never touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    pub platform_commission: i64,
    pub mentor_payout_amount: i64,
}

impl CommissionSplit {
    /// Splits `amount` minor units at `rate`; the mentor receives the remainder.
    pub fn compute(amount: i64, rate: Percentage) -> Self {
        let platform_commission = rate.of(amount);
        Self {
            platform_commission,
            mentor_payout_amount: amount - platform_commission,
        }
    }

    pub fn total(&self) -> i64 {
        self.platform_commission + self.mentor_payout_amount
    }

    /// The mentor's portion of refunding `refund` more of `amount` after
    /// `already_refunded` was returned.
    ///
    /// Taken as the difference of cumulative clawbacks, so however a refund
    /// is split into partials the shares add up to `mentor_payout_amount`.
    pub fn mentor_share_of(&self, already_refunded: i64, refund: i64, amount: i64) -> i64 {
        if refund <= 0 {
            return 0;
        }
        let after = already_refunded.saturating_add(refund);
        pro_rata(after, amount, self.mentor_payout_amount)
            - pro_rata(already_refunded, amount, self.mentor_payout_amount)
    }
}

/// `part / whole` of `of`, rounded down; the whole once `part` reaches `whole`.
pub(crate) fn pro_rata(part: i64, whole: i64, of: i64) -> i64 {
    if whole <= 0 || part <= 0 {
        return 0;
    }
    if part >= whole {
        return of;
    }
    let scaled = i128::from(part) * i128::from(of);
    (scaled / i128::from(whole)) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rate(value: u8) -> Percentage {
        Percentage::try_new(value).unwrap()
    }

    #[test]
    fn five_hundred_pounds_at_fifteen_percent() {
        let split = CommissionSplit::compute(50_000, rate(15));
        assert_eq!(split.platform_commission, 7_500);
        assert_eq!(split.mentor_payout_amount, 42_500);
    }

    #[test]
    fn full_refund_claws_back_whole_mentor_share() {
        let split = CommissionSplit::compute(50_000, rate(15));
        assert_eq!(split.mentor_share_of(0, 50_000, 50_000), 42_500);
    }

    #[test]
    fn partial_refund_claws_back_proportionally() {
        let split = CommissionSplit::compute(50_000, rate(20));
        assert_eq!(split.mentor_share_of(0, 25_000, 50_000), 20_000);
    }

    #[test]
    fn zero_refund_claws_back_nothing() {
        let split = CommissionSplit::compute(50_000, rate(20));
        assert_eq!(split.mentor_share_of(0, 0, 50_000), 0);
    }

    #[test]
    fn uneven_partials_claw_back_exactly_the_payout() {
        let split = CommissionSplit::compute(50_000, rate(15));
        let first = split.mentor_share_of(0, 25_001, 50_000);
        let second = split.mentor_share_of(25_001, 24_999, 50_000);
        assert_eq!(first, 21_250);
        assert_eq!(first + second, 42_500);
    }

    proptest! {
        #[test]
        fn split_always_conserves_amount(amount in 0i64..10_000_000_000, pct in 0u8..=100) {
            let split = CommissionSplit::compute(amount, rate(pct));
            prop_assert_eq!(split.total(), amount);
            prop_assert!(split.platform_commission >= 0);
            prop_assert!(split.mentor_payout_amount >= 0);
        }

        #[test]
        fn mentor_share_never_exceeds_payout(
            amount in 1i64..10_000_000,
            refund in 0i64..10_000_000,
            pct in 0u8..=100,
        ) {
            let split = CommissionSplit::compute(amount, rate(pct));
            let share = split.mentor_share_of(0, refund.min(amount), amount);
            prop_assert!(share <= split.mentor_payout_amount);
            prop_assert!(share <= refund.min(amount));
        }

        #[test]
        fn partial_shares_sum_to_payout(
            amount in 1i64..10_000_000,
            cuts in proptest::collection::vec(1i64..10_000_000, 0..6),
            pct in 0u8..=100,
        ) {
            let split = CommissionSplit::compute(amount, rate(pct));
            let mut refunded = 0;
            let mut clawed = 0;
            for cut in cuts {
                let refund = cut.min(amount - refunded);
                if refund == 0 {
                    break;
                }
                clawed += split.mentor_share_of(refunded, refund, amount);
                refunded += refund;
            }
            clawed += split.mentor_share_of(refunded, amount - refunded, amount);
            prop_assert_eq!(clawed, split.mentor_payout_amount);
        }
    }
}
