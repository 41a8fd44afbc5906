//! Provider dispatch.

use std::sync::Arc;

use crate::domain::payment::PaymentProvider;
use crate::ports::PaymentGateway;

/// One gateway per provider, resolved by an exhaustive match.
#[derive(Clone)]
pub struct PaymentGateways {
    stripe: Arc<dyn PaymentGateway>,
    paymob: Arc<dyn PaymentGateway>,
}

impl PaymentGateways {
    pub fn new(stripe: Arc<dyn PaymentGateway>, paymob: Arc<dyn PaymentGateway>) -> Self {
        Self { stripe, paymob }
    }

    pub fn for_provider(&self, provider: PaymentProvider) -> &dyn PaymentGateway {
        match provider {
            PaymentProvider::Stripe => self.stripe.as_ref(),
            PaymentProvider::Paymob => self.paymob.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockPaymentGateway;
    use crate::domain::foundation::Currency;

    #[test]
    fn resolves_each_provider() {
        let gateways = PaymentGateways::new(
            Arc::new(MockPaymentGateway::new(PaymentProvider::Stripe)),
            Arc::new(MockPaymentGateway::new(PaymentProvider::Paymob)),
        );

        for provider in PaymentProvider::ALL {
            assert_eq!(gateways.for_provider(provider).provider(), provider);
        }
        assert_eq!(
            gateways.for_provider(PaymentProvider::Stripe).minimum_charge().currency(),
            Currency::Usd
        );
    }
}
