//! ReconciliationSweep - background settlement of payments callbacks missed.
//!
//! Periodically loads payments still open past the pending timeout, asks
//! their provider for the current status, and applies the answer through
//! the orchestrator exactly like a callback. A payment the provider still
//! reports as pending is left open: the mentee may yet complete it, so only
//! the provider may fail it. An intent no provider ever accepted is failed as
//! abandoned once it is older than twice the timeout.
//!
//! When payout recovery is attached, each pass also returns payout
//! reservations whose payout row was never stored.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 60s | Time between sweeps |
//! | `batch_size` | 100 | Max payments examined per sweep |
//! | `pending_timeout_secs` | 900 | Age at which an open payment is swept |
//! | `reservation_grace_secs` | 300 | Age at which a reservation without a payout is released |
//! | `reservation_lookback_secs` | 86400 | Oldest reservation examined |
//!
//! ## Graceful Shutdown
//!
//! The sweep listens for a shutdown signal and runs one final pass before
//! stopping.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::application::payouts::PayoutManager;
use crate::domain::foundation::Timestamp;
use crate::domain::payment::{CallbackStatus, Payment, PaymentError, PaymentStatus};
use crate::ports::PaymentRepository;

use super::{PaymentGateways, PaymentOrchestrator, SettlementOutcome};

const ABANDONED_REASON: &str = "abandoned: intent never accepted by provider";

/// Configuration for the reconciliation sweep.
#[derive(Debug, Clone)]
pub struct ReconciliationSweepConfig {
    pub interval: Duration,
    pub batch_size: u32,
    pub pending_timeout_secs: i64,
    pub reservation_grace_secs: i64,
    pub reservation_lookback_secs: i64,
}

impl Default for ReconciliationSweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            batch_size: 100,
            pending_timeout_secs: 900,
            reservation_grace_secs: 300,
            reservation_lookback_secs: 86_400,
        }
    }
}

impl ReconciliationSweepConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_pending_timeout_secs(mut self, secs: i64) -> Self {
        self.pending_timeout_secs = secs;
        self
    }

    pub fn with_reservation_grace_secs(mut self, secs: i64) -> Self {
        self.reservation_grace_secs = secs;
        self
    }
}

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub settled: usize,
    pub failed: usize,
    pub unchanged: usize,
    pub errors: usize,
    pub released_reservations: usize,
}

pub struct ReconciliationSweep {
    payments: Arc<dyn PaymentRepository>,
    gateways: PaymentGateways,
    orchestrator: Arc<PaymentOrchestrator>,
    payouts: Option<Arc<PayoutManager>>,
    config: ReconciliationSweepConfig,
}

impl ReconciliationSweep {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        gateways: PaymentGateways,
        orchestrator: Arc<PaymentOrchestrator>,
    ) -> Self {
        Self::with_config(payments, gateways, orchestrator, ReconciliationSweepConfig::default())
    }

    pub fn with_config(
        payments: Arc<dyn PaymentRepository>,
        gateways: PaymentGateways,
        orchestrator: Arc<PaymentOrchestrator>,
        config: ReconciliationSweepConfig,
    ) -> Self {
        Self {
            payments,
            gateways,
            orchestrator,
            payouts: None,
            config,
        }
    }

    /// Also release orphaned payout reservations on every pass.
    pub fn with_payout_recovery(mut self, payouts: Arc<PayoutManager>) -> Self {
        self.payouts = Some(payouts);
        self
    }

    /// Run sweeps until the shutdown signal is received.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        self.log_sweep().await;
                        tracing::info!("Reconciliation sweep stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.log_sweep().await;
                }
            }
        }
    }

    async fn log_sweep(&self) {
        match self.sweep_once().await {
            Ok(report) if report.examined > 0 || report.released_reservations > 0 => {
                tracing::info!(
                    examined = report.examined,
                    settled = report.settled,
                    failed = report.failed,
                    unchanged = report.unchanged,
                    errors = report.errors,
                    released_reservations = report.released_reservations,
                    "Reconciliation sweep finished"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Reconciliation sweep could not list payments"),
        }
    }

    /// Runs one pass over the stale open payments.
    pub async fn sweep_once(&self) -> Result<SweepReport, PaymentError> {
        let now = Timestamp::now();
        let cutoff = now.minus_secs(self.config.pending_timeout_secs);
        let abandon_after = self.config.pending_timeout_secs.saturating_mul(2);

        let stale = self
            .payments
            .list_open_before(cutoff, self.config.batch_size)
            .await?;

        let mut report = SweepReport {
            examined: stale.len(),
            ..SweepReport::default()
        };

        for payment in stale {
            let payment_id = payment.id;
            let abandoned = payment.is_stale(now, abandon_after);
            match self.reconcile(payment, abandoned).await {
                Ok(Some(SettlementOutcome::Applied(p))) if p.status == PaymentStatus::Failed => {
                    report.failed += 1
                }
                Ok(Some(SettlementOutcome::Applied(_))) => report.settled += 1,
                Ok(_) => report.unchanged += 1,
                Err(e) => {
                    report.errors += 1;
                    tracing::warn!(payment_id = %payment_id, error = %e, "Could not reconcile payment");
                }
            }
        }

        if let Some(payouts) = &self.payouts {
            let from = now.minus_secs(self.config.reservation_lookback_secs);
            let to = now.minus_secs(self.config.reservation_grace_secs);
            match payouts
                .release_orphaned_reservations(from, to, self.config.batch_size)
                .await
            {
                Ok(released) => report.released_reservations = released,
                Err(e) => {
                    report.errors += 1;
                    tracing::warn!(error = %e, "Could not recover payout reservations");
                }
            }
        }

        Ok(report)
    }

    async fn reconcile(
        &self,
        payment: Payment,
        abandoned: bool,
    ) -> Result<Option<SettlementOutcome>, PaymentError> {
        let provider_payment_id = match payment.provider_payment_id.clone() {
            Some(id) => id,
            // The intent was never accepted by the provider.
            None if abandoned => {
                return Ok(Some(self.orchestrator.abandon(payment, ABANDONED_REASON).await?))
            }
            None => return Ok(None),
        };

        let status = self
            .gateways
            .for_provider(payment.provider)
            .get_status(&provider_payment_id)
            .await
            .map_err(|e| PaymentError::ProviderUnavailable(e.to_string()))?;

        if status.status == CallbackStatus::Pending {
            return Ok(None);
        }

        Ok(Some(self.orchestrator.apply_provider_status(payment, status).await?))
    }
}
