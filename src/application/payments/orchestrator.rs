//! PaymentOrchestrator - owns the Payment lifecycle.
//!
//! Creates provider intents, applies settlement reports from callbacks,
//! confirmations and the reconciliation sweep, and issues refunds. A
//! settlement that moves a payment to `Succeeded` finalizes the session:
//! the booking side is told it is paid and the mentor's share is credited.

use std::sync::Arc;

use crate::application::ledger::MentorLedger;
use crate::application::publish::publish_event;
use crate::domain::foundation::{
    Currency, ErrorCode, Money, PaymentId, Percentage, SessionId, Timestamp, UserId,
};
use crate::domain::ledger::LedgerError;
use crate::domain::payment::{
    CallbackStatus, NewPayment, Payment, PaymentError, PaymentEvent, PaymentMethod,
    PaymentProvider, PaymentStatus, Refund,
};
use crate::ports::{
    CallbackResult, CurrencyConverter, EventPublisher, GatewayError, GatewayErrorCode,
    IntentRequest, PaymentRepository, ProviderStatus, RefundRequest, SessionContext,
    SessionDirectory, SessionSnapshot, SessionState,
};

use super::PaymentGateways;

/// Attempts at a versioned payment write before giving up.
const MAX_SAVE_ATTEMPTS: u32 = 3;

/// Refund references owned by the dispute resolver, which claws the mentor
/// share back itself.
pub const DISPUTE_REFUND_PREFIX: &str = "dispute:";

/// Orchestrator tuning.
#[derive(Debug, Clone, Copy)]
pub struct PaymentSettings {
    /// Platform share of every session price, frozen per payment.
    pub commission_rate: Percentage,
    /// Currency session prices and balances are kept in.
    pub ledger_currency: Currency,
    /// A pending payment older than this is re-read from the provider.
    pub stale_after_secs: i64,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            commission_rate: Percentage::FIFTEEN,
            ledger_currency: Currency::Egp,
            stale_after_secs: 300,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Commands and outcomes
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct CreatePaymentIntentCommand {
    pub session_id: SessionId,
    /// The mentee asking to pay.
    pub mentee_id: UserId,
    pub provider: PaymentProvider,
    pub method: Option<PaymentMethod>,
}

#[derive(Debug, Clone)]
pub struct ConfirmPaymentCommand {
    pub provider_payment_id: String,
    pub session_id: SessionId,
}

#[derive(Debug, Clone)]
pub struct RefundPaymentCommand {
    pub payment_id: PaymentId,
    /// Minor units in the ledger currency.
    pub amount: i64,
    /// Idempotency reference, e.g. "dispute:<id>" or an admin ticket id.
    pub reference: String,
    /// Overrides the settled transaction to refund against.
    pub triggering_transaction_id: Option<String>,
}

/// What applying a settlement report did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The payment moved forward.
    Applied(Payment),
    /// The payment already reflected the report.
    AlreadyApplied(Payment),
}

impl SettlementOutcome {
    pub fn payment(&self) -> &Payment {
        match self {
            SettlementOutcome::Applied(p) | SettlementOutcome::AlreadyApplied(p) => p,
        }
    }

    pub fn into_payment(self) -> Payment {
        match self {
            SettlementOutcome::Applied(p) | SettlementOutcome::AlreadyApplied(p) => p,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundOutcome {
    pub payment: Payment,
    pub refund: Refund,
    /// True when the reference had been refunded before.
    pub already_refunded: bool,
}

/// A normalized settlement report, whatever its source.
struct Settlement {
    status: CallbackStatus,
    transaction_id: Option<String>,
    amount: Option<i64>,
    currency: Option<String>,
    reason: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Orchestrator
// ════════════════════════════════════════════════════════════════════════════════

pub struct PaymentOrchestrator {
    payments: Arc<dyn PaymentRepository>,
    sessions: Arc<dyn SessionDirectory>,
    gateways: PaymentGateways,
    converter: Arc<dyn CurrencyConverter>,
    ledger: Arc<MentorLedger>,
    publisher: Arc<dyn EventPublisher>,
    settings: PaymentSettings,
}

impl PaymentOrchestrator {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        sessions: Arc<dyn SessionDirectory>,
        gateways: PaymentGateways,
        converter: Arc<dyn CurrencyConverter>,
        ledger: Arc<MentorLedger>,
        publisher: Arc<dyn EventPublisher>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            payments,
            sessions,
            gateways,
            converter,
            ledger,
            publisher,
            settings,
        }
    }

    /// Opens (or returns the existing) intent for a session.
    pub async fn create_payment_intent(
        &self,
        cmd: CreatePaymentIntentCommand,
    ) -> Result<Payment, PaymentError> {
        let session = self
            .sessions
            .get_session(cmd.session_id)
            .await?
            .ok_or(PaymentError::SessionNotFound(cmd.session_id))?;
        let price = self.check_payable(&session, cmd.mentee_id)?;

        if let Some(existing) = self.payments.find_live_by_session(cmd.session_id).await? {
            tracing::debug!(
                payment_id = %existing.id,
                session_id = %cmd.session_id,
                "Returning existing payment for session"
            );
            return Ok(existing);
        }

        let gateway = self.gateways.for_provider(cmd.provider);
        let minimum = gateway.minimum_charge();
        let charge = self.converter.convert(price, minimum.currency())?;
        if charge.amount() < minimum.amount() {
            return Err(PaymentError::InvalidAmount(format!(
                "{} ({}) is below the {} minimum of {}",
                price, charge, cmd.provider, minimum
            )));
        }

        let mut payment = Payment::create(NewPayment {
            id: PaymentId::new(),
            session_id: session.id,
            mentee_id: session.mentee_id,
            mentor_id: session.mentor_id,
            provider: cmd.provider,
            method: cmd.method,
            amount: price,
            charge,
            commission_rate: self.settings.commission_rate,
        })?;

        match self.payments.insert(&payment).await {
            Ok(()) => {}
            Err(e) if e.code == ErrorCode::Conflict => {
                // A concurrent request for the same session won the race.
                return self
                    .payments
                    .find_live_by_session(cmd.session_id)
                    .await?
                    .ok_or_else(|| PaymentError::Infrastructure(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let request = IntentRequest {
            payment_id: payment.id,
            charge,
            method: payment.method,
            context: SessionContext {
                session_id: Some(session.id),
                description: session.title.clone(),
                payer_email: session.mentee_email.clone(),
                payer_name: session.mentee_name.clone(),
                payer_phone: session.mentee_phone.clone(),
            },
        };

        let created = match gateway.create_intent(request).await {
            Ok(created) => created,
            Err(gateway_error) => {
                tracing::warn!(
                    payment_id = %payment.id,
                    provider = %cmd.provider,
                    error = %gateway_error,
                    "Provider refused intent"
                );
                let reason = gateway_error.to_string();
                if let Err(e) = self
                    .save_with(&mut payment, |p| p.mark_failed(reason.clone()).map(|_| true))
                    .await
                {
                    tracing::error!(payment_id = %payment.id, error = %e, "Could not mark payment failed");
                }
                return Err(map_gateway_error(gateway_error));
            }
        };

        let provider_payment_id = created.provider_payment_id;
        let checkout = created.checkout;
        self.save_with(&mut payment, |p| {
            if p.status != PaymentStatus::Created {
                // A settlement overtook the accept response.
                if p.provider_payment_id.is_none() {
                    p.provider_payment_id = Some(provider_payment_id.clone());
                    p.checkout = checkout.clone();
                    return Ok(true);
                }
                return Ok(false);
            }
            p.mark_pending(provider_payment_id.clone(), checkout.clone())?;
            Ok(true)
        })
        .await?;

        tracing::info!(
            payment_id = %payment.id,
            session_id = %payment.session_id,
            provider = %payment.provider,
            amount = payment.amount.amount(),
            charge = %payment.charge,
            "Payment intent created"
        );
        Ok(payment)
    }

    /// Client-driven confirmation: asks the provider and applies the answer.
    pub async fn confirm(&self, cmd: ConfirmPaymentCommand) -> Result<Payment, PaymentError> {
        let payment = self
            .payments
            .find_live_by_session(cmd.session_id)
            .await?
            .filter(|p| p.provider_payment_id.as_deref() == Some(cmd.provider_payment_id.as_str()))
            .ok_or_else(|| PaymentError::NotFoundForProvider(cmd.provider_payment_id.clone()))?;

        if payment.status.is_settled() {
            return Ok(payment);
        }

        let status = self
            .gateways
            .for_provider(payment.provider)
            .get_status(&cmd.provider_payment_id)
            .await
            .map_err(map_gateway_error)?;

        Ok(self.apply_provider_status(payment, status).await?.into_payment())
    }

    /// Refunds `amount` of a settled payment. Idempotent per reference.
    pub async fn refund(&self, cmd: RefundPaymentCommand) -> Result<RefundOutcome, PaymentError> {
        let reference = cmd.reference.trim().to_string();
        if reference.is_empty() {
            return Err(PaymentError::validation("reference", "a refund reference is required"));
        }

        let mut payment = self
            .payments
            .find_by_id(cmd.payment_id)
            .await?
            .ok_or(PaymentError::NotFound(cmd.payment_id))?;

        if let Some(existing) = payment.find_refund(&reference).cloned() {
            return Ok(RefundOutcome {
                payment,
                refund: existing,
                already_refunded: true,
            });
        }

        payment.ensure_refundable(cmd.amount)?;

        let provider_payment_id = payment.provider_payment_id.clone().ok_or_else(|| {
            PaymentError::invariant(format!("settled payment {} has no provider reference", payment.id))
        })?;
        let charge_amount = Money::new(payment.charge_portion(cmd.amount), payment.charge.currency())?;

        let result = self
            .gateways
            .for_provider(payment.provider)
            .refund(RefundRequest {
                provider_payment_id,
                transaction_id: cmd
                    .triggering_transaction_id
                    .clone()
                    .or_else(|| payment.transaction_id.clone()),
                amount: charge_amount,
                idempotency_key: reference.clone(),
            })
            .await
            .map_err(map_gateway_error)?;

        if !result.success {
            return Err(PaymentError::ProviderRejected(format!(
                "{} did not accept refund {} on payment {}",
                payment.provider, reference, payment.id
            )));
        }

        let refund = Refund {
            reference: reference.clone(),
            amount: cmd.amount,
            refund_transaction_id: result.refund_transaction_id,
            refunded_at: Timestamp::now(),
        };

        let to_apply = refund.clone();
        self.save_with(&mut payment, |p| {
            if p.find_refund(&to_apply.reference).is_some() {
                return Ok(false);
            }
            p.apply_refund(to_apply.clone())?;
            Ok(true)
        })
        .await?;

        tracing::info!(
            payment_id = %payment.id,
            reference = %reference,
            amount = cmd.amount,
            total_refunded = payment.refunded_total(),
            status = %payment.status,
            "Payment refunded"
        );
        publish_event(
            self.publisher.as_ref(),
            &PaymentEvent::Refunded {
                payment_id: payment.id,
                session_id: payment.session_id,
                mentee_id: payment.mentee_id,
                amount: cmd.amount,
                total_refunded: payment.refunded_total(),
                fully_refunded: payment.status == PaymentStatus::FullyRefunded,
            },
        )
        .await;

        Ok(RefundOutcome {
            payment,
            refund,
            already_refunded: false,
        })
    }

    /// Refunds a payment outside any dispute and takes the mentor's share of
    /// that refund back from their balance.
    ///
    /// Safe to retry: a replayed reference skips the provider and re-posts
    /// the clawback, which the ledger applies once per refund.
    pub async fn refund_with_clawback(
        &self,
        cmd: RefundPaymentCommand,
    ) -> Result<RefundOutcome, PaymentError> {
        if cmd.reference.trim().starts_with(DISPUTE_REFUND_PREFIX) {
            return Err(PaymentError::validation(
                "reference",
                "dispute refunds are issued by resolving the dispute",
            ));
        }

        let outcome = self.refund(cmd).await?;
        let payment = &outcome.payment;
        let sequence = payment
            .refund_sequence(&outcome.refund.reference)
            .ok_or_else(|| {
                PaymentError::invariant(format!(
                    "refund {} missing from payment {}",
                    outcome.refund.reference, payment.id
                ))
            })?;

        let mentor_share = payment.mentor_share_of_refund(&outcome.refund);
        if mentor_share > 0 {
            self.ledger
                .adjust_for_payment_refund(payment.mentor_id, payment.id, sequence, mentor_share)
                .await
                .map_err(ledger_to_payment_error)?;
        }
        Ok(outcome)
    }

    /// Current payment state; a stale pending payment is re-read from the provider.
    pub async fn get_payment_status(&self, payment_id: PaymentId) -> Result<Payment, PaymentError> {
        let payment = self
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or(PaymentError::NotFound(payment_id))?;

        let stale = payment.status == PaymentStatus::PendingConfirmation
            && payment.is_stale(Timestamp::now(), self.settings.stale_after_secs);
        let provider_payment_id = match (&payment.provider_payment_id, stale) {
            (Some(id), true) => id.clone(),
            _ => return Ok(payment),
        };

        let gateway = self.gateways.for_provider(payment.provider);
        match gateway.get_status(&provider_payment_id).await {
            Ok(status) => Ok(self.apply_provider_status(payment, status).await?.into_payment()),
            Err(e) => {
                tracing::warn!(
                    payment_id = %payment.id,
                    error = %e,
                    "Provider status read-through failed; returning local state"
                );
                Ok(payment)
            }
        }
    }

    /// Applies a verified provider callback.
    pub async fn apply_callback(
        &self,
        payment: Payment,
        callback: &CallbackResult,
    ) -> Result<SettlementOutcome, PaymentError> {
        let status = match callback.status {
            Some(status) => status,
            None => return Ok(SettlementOutcome::AlreadyApplied(payment)),
        };
        self.apply_settlement(
            payment,
            Settlement {
                status,
                transaction_id: callback.transaction_id.clone(),
                amount: callback.amount,
                currency: callback.currency.clone(),
                reason: format!("provider reported {}", callback.event_type),
            },
        )
        .await
    }

    /// Applies a polled provider status.
    pub async fn apply_provider_status(
        &self,
        payment: Payment,
        status: ProviderStatus,
    ) -> Result<SettlementOutcome, PaymentError> {
        self.apply_settlement(
            payment,
            Settlement {
                status: status.status,
                transaction_id: status.transaction_id,
                amount: status.amount,
                currency: None,
                reason: "provider reported failure".to_string(),
            },
        )
        .await
    }

    /// Fails an open payment the provider never settled.
    pub async fn abandon(&self, payment: Payment, reason: &str) -> Result<SettlementOutcome, PaymentError> {
        self.apply_settlement(
            payment,
            Settlement {
                status: CallbackStatus::Failed,
                transaction_id: None,
                amount: None,
                currency: None,
                reason: reason.to_string(),
            },
        )
        .await
    }

    async fn apply_settlement(
        &self,
        mut payment: Payment,
        report: Settlement,
    ) -> Result<SettlementOutcome, PaymentError> {
        if report.status == CallbackStatus::Succeeded {
            self.check_settled_amount(&payment, &report)?;
        }

        let paid_at = Timestamp::now();
        let changed = self
            .save_with(&mut payment, |p| {
                if p.status.already_reflects(report.status) {
                    return Ok(false);
                }
                match report.status {
                    CallbackStatus::Pending => {
                        let reference = p.provider_payment_id.clone().unwrap_or_default();
                        let checkout = p.checkout.clone();
                        p.mark_pending(reference, checkout)?;
                    }
                    CallbackStatus::Succeeded => {
                        if p.status == PaymentStatus::Failed {
                            return Err(PaymentError::invariant(format!(
                                "success reported for failed payment {}",
                                p.id
                            )));
                        }
                        let transaction_id = report
                            .transaction_id
                            .clone()
                            .or_else(|| p.provider_payment_id.clone())
                            .unwrap_or_default();
                        p.mark_succeeded(transaction_id, paid_at)?;
                    }
                    CallbackStatus::Failed => p.mark_failed(report.reason.clone())?,
                }
                Ok(true)
            })
            .await?;

        if !changed {
            if payment.status.is_settled() && report.status == CallbackStatus::Succeeded {
                // Re-run the idempotent half of finalization in case an
                // earlier attempt stopped after saving the payment.
                self.finalize_session(&payment).await?;
            }
            return Ok(SettlementOutcome::AlreadyApplied(payment));
        }

        tracing::info!(
            payment_id = %payment.id,
            session_id = %payment.session_id,
            status = %payment.status,
            "Payment status updated"
        );

        match payment.status {
            PaymentStatus::Succeeded => {
                self.finalize_session(&payment).await?;
                publish_event(
                    self.publisher.as_ref(),
                    &PaymentEvent::Succeeded {
                        payment_id: payment.id,
                        session_id: payment.session_id,
                        mentee_id: payment.mentee_id,
                        mentor_id: payment.mentor_id,
                        provider: payment.provider,
                        amount: payment.amount.amount(),
                        mentor_payout_amount: payment.mentor_payout_amount,
                        transaction_id: payment.transaction_id.clone().unwrap_or_default(),
                    },
                )
                .await;
            }
            PaymentStatus::Failed => {
                publish_event(
                    self.publisher.as_ref(),
                    &PaymentEvent::Failed {
                        payment_id: payment.id,
                        session_id: payment.session_id,
                        mentee_id: payment.mentee_id,
                        reason: payment.failure_reason.clone().unwrap_or_default(),
                    },
                )
                .await;
            }
            _ => {}
        }

        Ok(SettlementOutcome::Applied(payment))
    }

    /// Marks the session paid and credits the mentor. Both steps are idempotent.
    async fn finalize_session(&self, payment: &Payment) -> Result<(), PaymentError> {
        self.sessions
            .mark_session_paid(payment.session_id, payment.id)
            .await?;
        self.ledger
            .credit_on_session_completion(payment.session_id)
            .await
            .map_err(ledger_to_payment_error)?;
        Ok(())
    }

    fn check_payable(&self, session: &SessionSnapshot, mentee_id: UserId) -> Result<Money, PaymentError> {
        if session.mentee_id != mentee_id {
            return Err(PaymentError::session_not_payable(
                session.id,
                "only the booking mentee can pay for the session",
            ));
        }
        match session.state {
            SessionState::Booked => {}
            SessionState::Paid | SessionState::Completed => {
                return Err(PaymentError::session_not_payable(session.id, "session is already paid"))
            }
            SessionState::Cancelled => {
                return Err(PaymentError::session_not_payable(session.id, "session was cancelled"))
            }
        }
        let price = session
            .price
            .filter(|p| p.amount() > 0)
            .ok_or_else(|| PaymentError::session_not_payable(session.id, "session has no price"))?;
        if price.currency() != self.settings.ledger_currency {
            return Err(PaymentError::session_not_payable(
                session.id,
                format!("session is priced in {}", price.currency()),
            ));
        }
        Ok(price)
    }

    fn check_settled_amount(&self, payment: &Payment, report: &Settlement) -> Result<(), PaymentError> {
        if let Some(amount) = report.amount {
            if amount != payment.charge.amount() {
                return Err(PaymentError::invariant(format!(
                    "payment {} settled for {} but {} was charged",
                    payment.id,
                    amount,
                    payment.charge.amount()
                )));
            }
        }
        if let Some(currency) = &report.currency {
            if !currency.eq_ignore_ascii_case(payment.charge.currency().code()) {
                return Err(PaymentError::invariant(format!(
                    "payment {} settled in {} but was charged in {}",
                    payment.id,
                    currency,
                    payment.charge.currency()
                )));
            }
        }
        Ok(())
    }

    /// Applies `mutate` and saves, reloading and re-evaluating on version
    /// conflicts. `mutate` returns false when there is nothing to write.
    ///
    /// On success `payment` holds the stored state.
    async fn save_with<F>(&self, payment: &mut Payment, mutate: F) -> Result<bool, PaymentError>
    where
        F: Fn(&mut Payment) -> Result<bool, PaymentError>,
    {
        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let mut candidate = payment.clone();
            if !mutate(&mut candidate)? {
                return Ok(false);
            }
            candidate.check_invariants()?;

            match self.payments.update(&candidate).await {
                Ok(()) => {
                    candidate.version += 1;
                    *payment = candidate;
                    return Ok(true);
                }
                Err(e) if e.code == ErrorCode::Conflict => {
                    tracing::debug!(payment_id = %payment.id, attempt, "Payment version conflict; reloading");
                    *payment = self
                        .payments
                        .find_by_id(payment.id)
                        .await?
                        .ok_or(PaymentError::NotFound(payment.id))?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(PaymentError::Infrastructure(format!(
            "payment {} kept changing concurrently",
            payment.id
        )))
    }
}

fn map_gateway_error(err: GatewayError) -> PaymentError {
    if err.is_unavailable() {
        return PaymentError::ProviderUnavailable(err.to_string());
    }
    match err.code {
        GatewayErrorCode::InvalidAmount => PaymentError::InvalidAmount(err.message),
        _ => PaymentError::ProviderRejected(err.to_string()),
    }
}

fn ledger_to_payment_error(err: LedgerError) -> PaymentError {
    match err {
        LedgerError::InvariantViolation(message) => PaymentError::InvariantViolation(message),
        other => PaymentError::Infrastructure(other.to_string()),
    }
}
