//! Shared application state.
//!
//! Holds the Arc-wrapped ports and builds application services on demand,
//! so every request works against the same repositories and gateways.

use std::sync::Arc;

use crate::application::disputes::DisputeResolver;
use crate::application::ledger::{LedgerSettings, MentorLedger};
use crate::application::payments::{
    PaymentGateways, PaymentOrchestrator, PaymentSettings, ReconciliationSweep,
    ReconciliationSweepConfig, WebhookReconciler,
};
use crate::application::payouts::PayoutManager;
use crate::domain::payout::PayoutPolicy;
use crate::ports::{
    CurrencyConverter, DisputeRepository, EventPublisher, MentorBalanceRepository,
    PaymentRepository, PayoutRepository, SessionDirectory, WebhookEventRepository,
};

/// Business settings shared by the application services.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceSettings {
    pub payment: PaymentSettings,
    pub ledger: LedgerSettings,
    pub payout_policy: PayoutPolicy,
}

#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<dyn PaymentRepository>,
    pub balances: Arc<dyn MentorBalanceRepository>,
    pub payouts: Arc<dyn PayoutRepository>,
    pub disputes: Arc<dyn DisputeRepository>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub sessions: Arc<dyn SessionDirectory>,
    pub gateways: PaymentGateways,
    pub converter: Arc<dyn CurrencyConverter>,
    pub event_publisher: Arc<dyn EventPublisher>,
    pub settings: ServiceSettings,
}

impl AppState {
    pub fn ledger(&self) -> Arc<MentorLedger> {
        Arc::new(MentorLedger::new(
            self.balances.clone(),
            self.payments.clone(),
            self.sessions.clone(),
            self.event_publisher.clone(),
            self.settings.ledger,
        ))
    }

    pub fn orchestrator(&self) -> Arc<PaymentOrchestrator> {
        Arc::new(PaymentOrchestrator::new(
            self.payments.clone(),
            self.sessions.clone(),
            self.gateways.clone(),
            self.converter.clone(),
            self.ledger(),
            self.event_publisher.clone(),
            self.settings.payment,
        ))
    }

    pub fn webhook_reconciler(&self) -> WebhookReconciler {
        WebhookReconciler::new(
            self.gateways.clone(),
            self.payments.clone(),
            self.webhook_events.clone(),
            self.orchestrator(),
        )
    }

    pub fn payout_manager(&self) -> PayoutManager {
        PayoutManager::new(
            self.payouts.clone(),
            self.ledger(),
            self.event_publisher.clone(),
            self.settings.payout_policy,
            self.settings.ledger.currency,
        )
    }

    pub fn dispute_resolver(&self) -> DisputeResolver {
        DisputeResolver::new(
            self.disputes.clone(),
            self.sessions.clone(),
            self.payments.clone(),
            self.orchestrator(),
            self.ledger(),
            self.event_publisher.clone(),
        )
    }

    pub fn reconciliation_sweep(&self, config: ReconciliationSweepConfig) -> ReconciliationSweep {
        ReconciliationSweep::with_config(
            self.payments.clone(),
            self.gateways.clone(),
            self.orchestrator(),
            config,
        )
        .with_payout_recovery(Arc::new(self.payout_manager()))
    }
}
