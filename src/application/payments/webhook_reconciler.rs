//! WebhookReconciler - turns provider callbacks into payment transitions.
//!
//! Each delivery is verified by its provider's gateway, de-duplicated on the
//! provider's event id, and handed to the orchestrator. Outcomes the provider
//! should not redeliver are recorded; transient failures are not, so the
//! redelivery is processed from scratch.

use std::sync::Arc;

use crate::domain::foundation::PaymentId;
use crate::domain::payment::{PaymentError, PaymentProvider, PaymentStatus};
use crate::domain::webhook::WebhookError;
use crate::ports::{PaymentRepository, SaveResult, WebhookEventRecord, WebhookEventRepository};

use super::{PaymentGateways, PaymentOrchestrator, SettlementOutcome};

/// Command to handle one provider callback.
#[derive(Debug, Clone)]
pub struct WebhookCommand {
    pub provider: PaymentProvider,
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header or Paymob `hmac` query parameter.
    pub signature: Option<String>,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The payment moved to `status`.
    Processed {
        payment_id: PaymentId,
        status: PaymentStatus,
    },
    /// The event id was seen before.
    Duplicate,
    /// Acknowledged without a state change.
    Ignored { reason: String },
}

pub struct WebhookReconciler {
    gateways: PaymentGateways,
    payments: Arc<dyn PaymentRepository>,
    events: Arc<dyn WebhookEventRepository>,
    orchestrator: Arc<PaymentOrchestrator>,
}

impl WebhookReconciler {
    pub fn new(
        gateways: PaymentGateways,
        payments: Arc<dyn PaymentRepository>,
        events: Arc<dyn WebhookEventRepository>,
        orchestrator: Arc<PaymentOrchestrator>,
    ) -> Self {
        Self {
            gateways,
            payments,
            events,
            orchestrator,
        }
    }

    pub async fn handle(&self, cmd: WebhookCommand) -> Result<WebhookOutcome, WebhookError> {
        let provider = cmd.provider;

        // 1. Verify and parse
        let callback = self
            .gateways
            .for_provider(provider)
            .parse_callback(&cmd.payload, cmd.signature.as_deref())
            .map_err(|e| {
                if e.is_authentication_failure() {
                    tracing::warn!(provider = %provider, error = %e, "Rejected unauthenticated webhook");
                } else {
                    tracing::warn!(provider = %provider, error = %e, "Rejected malformed webhook");
                }
                e
            })?;

        // 2. Duplicate delivery
        if self
            .events
            .find(provider, &callback.event_id)
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?
            .is_some()
        {
            tracing::debug!(provider = %provider, event_id = %callback.event_id, "Duplicate webhook");
            return Ok(WebhookOutcome::Duplicate);
        }

        // 3. Events that carry no settlement
        if callback.status.is_none() {
            let reason = format!("{} carries no payment status", callback.event_type);
            let record = WebhookEventRecord::ignored(
                provider,
                &callback.event_id,
                &callback.event_type,
                &reason,
                callback.raw.clone(),
            );
            return self.record(record, WebhookOutcome::Ignored { reason }).await;
        }

        // 4. Locate the payment
        let payment = self
            .payments
            .find_by_provider_reference(provider, &callback.provider_payment_id)
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?
            .ok_or_else(|| {
                tracing::warn!(
                    provider = %provider,
                    event_id = %callback.event_id,
                    provider_payment_id = %callback.provider_payment_id,
                    "Webhook for unknown payment; asking for redelivery"
                );
                WebhookError::PaymentNotFound(callback.provider_payment_id.clone())
            })?;
        let payment_id = payment.id;

        // 5. Apply
        match self.orchestrator.apply_callback(payment, &callback).await {
            Ok(SettlementOutcome::Applied(payment)) => {
                tracing::info!(
                    provider = %provider,
                    event_id = %callback.event_id,
                    payment_id = %payment.id,
                    status = %payment.status,
                    "Webhook applied"
                );
                let record = WebhookEventRecord::success(
                    provider,
                    &callback.event_id,
                    &callback.event_type,
                    callback.raw.clone(),
                )
                .for_payment(&callback.provider_payment_id);
                self.record(
                    record,
                    WebhookOutcome::Processed {
                        payment_id: payment.id,
                        status: payment.status,
                    },
                )
                .await
            }
            Ok(SettlementOutcome::AlreadyApplied(payment)) => {
                let reason = format!("payment already {}", payment.status);
                let record = WebhookEventRecord::ignored(
                    provider,
                    &callback.event_id,
                    &callback.event_type,
                    &reason,
                    callback.raw.clone(),
                )
                .for_payment(&callback.provider_payment_id);
                self.record(record, WebhookOutcome::Ignored { reason }).await
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    provider = %provider,
                    event_id = %callback.event_id,
                    payment_id = %payment_id,
                    error = %e,
                    "Webhook processing failed transiently"
                );
                Err(transient_error(e))
            }
            Err(e) => {
                tracing::error!(
                    provider = %provider,
                    event_id = %callback.event_id,
                    payment_id = %payment_id,
                    error = %e,
                    "Webhook contradicts recorded payment state"
                );
                let record = WebhookEventRecord::failed(
                    provider,
                    &callback.event_id,
                    &callback.event_type,
                    e.to_string(),
                    callback.raw.clone(),
                )
                .for_payment(&callback.provider_payment_id);
                if let Err(save_error) = self.events.save(&record).await {
                    tracing::warn!(event_id = %callback.event_id, error = %save_error, "Could not record failed webhook");
                }
                Err(WebhookError::InvariantViolation(e.to_string()))
            }
        }
    }

    async fn record(
        &self,
        record: WebhookEventRecord,
        outcome: WebhookOutcome,
    ) -> Result<WebhookOutcome, WebhookError> {
        match self.events.save(&record).await {
            Ok(SaveResult::Inserted) => Ok(outcome),
            Ok(SaveResult::AlreadyExists) => {
                tracing::debug!(event_id = %record.event_id, "Concurrent delivery recorded first");
                Ok(WebhookOutcome::Duplicate)
            }
            Err(e) => {
                // The state change is already durable; a redelivery is a no-op.
                tracing::warn!(event_id = %record.event_id, error = %e, "Could not record webhook");
                Ok(outcome)
            }
        }
    }
}

fn transient_error(err: PaymentError) -> WebhookError {
    match err {
        PaymentError::ProviderUnavailable(message) => WebhookError::ProviderUnavailable(message),
        other => WebhookError::Database(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::currency::FixedRateConverter;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::{
        InMemoryBalanceRepository, InMemoryPaymentRepository, InMemorySessionDirectory,
        InMemoryWebhookEventRepository,
    };
    use crate::adapters::mock::MockPaymentGateway;
    use crate::application::ledger::{LedgerSettings, MentorLedger};
    use crate::application::payments::{CreatePaymentIntentCommand, PaymentSettings};
    use crate::domain::foundation::{Currency, MentorId, Money, SessionId, UserId};
    use crate::domain::payment::{CallbackStatus, Payment};
    use crate::ports::{ProcessingResult, SessionSnapshot, SessionState};

    struct Fixture {
        reconciler: WebhookReconciler,
        orchestrator: Arc<PaymentOrchestrator>,
        ledger: Arc<MentorLedger>,
        payments: InMemoryPaymentRepository,
        sessions: InMemorySessionDirectory,
        events: InMemoryWebhookEventRepository,
        bus: Arc<InMemoryEventBus>,
    }

    fn fixture() -> Fixture {
        let payments = InMemoryPaymentRepository::new();
        let sessions = InMemorySessionDirectory::new();
        let events = InMemoryWebhookEventRepository::new();
        let bus = Arc::new(InMemoryEventBus::new());
        let gateways = PaymentGateways::new(
            Arc::new(MockPaymentGateway::new(PaymentProvider::Stripe)),
            Arc::new(MockPaymentGateway::new(PaymentProvider::Paymob)),
        );
        let ledger = Arc::new(MentorLedger::new(
            Arc::new(InMemoryBalanceRepository::new()),
            Arc::new(payments.clone()),
            Arc::new(sessions.clone()),
            bus.clone(),
            LedgerSettings::default(),
        ));
        let orchestrator = Arc::new(PaymentOrchestrator::new(
            Arc::new(payments.clone()),
            Arc::new(sessions.clone()),
            gateways.clone(),
            Arc::new(FixedRateConverter::new(50.0).unwrap()),
            ledger.clone(),
            bus.clone(),
            PaymentSettings::default(),
        ));
        let reconciler = WebhookReconciler::new(
            gateways,
            Arc::new(payments.clone()),
            Arc::new(events.clone()),
            orchestrator.clone(),
        );
        Fixture {
            reconciler,
            orchestrator,
            ledger,
            payments,
            sessions,
            events,
            bus,
        }
    }

    async fn pending_payment(f: &Fixture) -> Payment {
        let session = SessionSnapshot {
            id: SessionId::new(),
            mentor_id: MentorId::new(),
            mentee_id: UserId::new(),
            price: Some(Money::new(50_000, Currency::Egp).unwrap()),
            state: SessionState::Booked,
            title: "Interview prep".to_string(),
            mentee_email: None,
            mentee_name: None,
            mentee_phone: None,
        };
        f.sessions.insert(session.clone()).await;
        f.orchestrator
            .create_payment_intent(CreatePaymentIntentCommand {
                session_id: session.id,
                mentee_id: session.mentee_id,
                provider: PaymentProvider::Paymob,
                method: None,
            })
            .await
            .unwrap()
    }

    fn delivery(event_id: &str, payment: &Payment, status: CallbackStatus, amount: i64) -> WebhookCommand {
        WebhookCommand {
            provider: PaymentProvider::Paymob,
            payload: MockPaymentGateway::callback_payload(
                event_id,
                payment.provider_payment_id.as_deref().unwrap(),
                status,
                amount,
                "EGP",
            ),
            signature: Some(MockPaymentGateway::SIGNATURE.to_string()),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Happy path and idempotency
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn success_callback_settles_and_credits_once() {
        let f = fixture();
        let payment = pending_payment(&f).await;

        let first = f
            .reconciler
            .handle(delivery("evt_1", &payment, CallbackStatus::Succeeded, 50_000))
            .await
            .unwrap();
        let second = f
            .reconciler
            .handle(delivery("evt_1", &payment, CallbackStatus::Succeeded, 50_000))
            .await
            .unwrap();

        assert_eq!(
            first,
            WebhookOutcome::Processed {
                payment_id: payment.id,
                status: PaymentStatus::Succeeded
            }
        );
        assert_eq!(second, WebhookOutcome::Duplicate);
        let balance = f.ledger.get_balance(payment.mentor_id).await.unwrap();
        assert_eq!(balance.available_balance, 42_500);
        assert_eq!(f.bus.events_of_type("payment.succeeded").len(), 1);
        assert_eq!(f.events.records().await.len(), 1);
    }

    #[tokio::test]
    async fn distinct_event_with_same_status_is_ignored() {
        let f = fixture();
        let payment = pending_payment(&f).await;
        f.reconciler
            .handle(delivery("evt_1", &payment, CallbackStatus::Succeeded, 50_000))
            .await
            .unwrap();

        let outcome = f
            .reconciler
            .handle(delivery("evt_2", &payment, CallbackStatus::Succeeded, 50_000))
            .await
            .unwrap();

        assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
        let balance = f.ledger.get_balance(payment.mentor_id).await.unwrap();
        assert_eq!(balance.total_earnings, 42_500);
    }

    #[tokio::test]
    async fn late_pending_after_success_is_ignored() {
        let f = fixture();
        let payment = pending_payment(&f).await;
        f.reconciler
            .handle(delivery("evt_ok", &payment, CallbackStatus::Succeeded, 50_000))
            .await
            .unwrap();

        let outcome = f
            .reconciler
            .handle(delivery("evt_late", &payment, CallbackStatus::Pending, 50_000))
            .await
            .unwrap();

        assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
        let stored = f.payments.find_by_id(payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Succeeded);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Rejections
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn bad_signature_is_rejected_and_not_recorded() {
        let f = fixture();
        let payment = pending_payment(&f).await;
        let mut cmd = delivery("evt_1", &payment, CallbackStatus::Succeeded, 50_000);
        cmd.signature = Some("forged".to_string());

        let err = f.reconciler.handle(cmd).await.unwrap_err();

        assert_eq!(err, WebhookError::InvalidSignature);
        assert!(!err.is_retryable());
        assert!(f.events.records().await.is_empty());
        let stored = f.payments.find_by_id(payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::PendingConfirmation);
    }

    #[tokio::test]
    async fn unknown_payment_asks_for_redelivery() {
        let f = fixture();
        let cmd = WebhookCommand {
            provider: PaymentProvider::Paymob,
            payload: MockPaymentGateway::callback_payload(
                "evt_1",
                "ord_unknown",
                CallbackStatus::Succeeded,
                50_000,
                "EGP",
            ),
            signature: Some(MockPaymentGateway::SIGNATURE.to_string()),
        };

        let err = f.reconciler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, WebhookError::PaymentNotFound(_)));
        assert!(err.is_retryable());
        assert!(f.events.records().await.is_empty());
    }

    #[tokio::test]
    async fn amount_mismatch_is_recorded_as_failed() {
        let f = fixture();
        let payment = pending_payment(&f).await;

        let err = f
            .reconciler
            .handle(delivery("evt_1", &payment, CallbackStatus::Succeeded, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::InvariantViolation(_)));
        let records = f.events.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result, ProcessingResult::Failed);
        assert!(f.ledger.get_balance(payment.mentor_id).await.is_err());
    }

    #[tokio::test]
    async fn failure_callback_fails_payment() {
        let f = fixture();
        let payment = pending_payment(&f).await;

        let outcome = f
            .reconciler
            .handle(delivery("evt_1", &payment, CallbackStatus::Failed, 50_000))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Processed {
                payment_id: payment.id,
                status: PaymentStatus::Failed
            }
        );
        assert_eq!(f.bus.events_of_type("payment.failed").len(), 1);
    }
}
