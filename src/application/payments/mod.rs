//! Payment application services.
//!
//! - `PaymentOrchestrator` - intents, settlement, refunds
//! - `WebhookReconciler` - verified, de-duplicated provider callbacks
//! - `ReconciliationSweep` - background polling for missed callbacks

mod gateways;
mod orchestrator;
mod reconciliation_sweep;
mod webhook_reconciler;

pub use gateways::PaymentGateways;
pub use orchestrator::{
    ConfirmPaymentCommand, CreatePaymentIntentCommand, PaymentOrchestrator, PaymentSettings,
    RefundOutcome, RefundPaymentCommand, SettlementOutcome, DISPUTE_REFUND_PREFIX,
};
pub use reconciliation_sweep::{ReconciliationSweep, ReconciliationSweepConfig, SweepReport};
pub use webhook_reconciler::{WebhookCommand, WebhookOutcome, WebhookReconciler};
