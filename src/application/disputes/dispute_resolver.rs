//! DisputeResolver - mentee disputes and their refund resolutions.
//!
//! A refund resolution goes through the orchestrator first (provider refund,
//! payment refund history), then claws the mentor's share back from the
//! ledger, and only then marks the dispute resolved. Every step is keyed by
//! the dispute id, so a resolve retried after a partial failure completes
//! the remaining steps without repeating the earlier ones.

use std::sync::Arc;

use crate::application::ledger::MentorLedger;
use crate::application::payments::{
    PaymentOrchestrator, RefundPaymentCommand, DISPUTE_REFUND_PREFIX,
};
use crate::application::publish::publish_event;
use crate::domain::dispute::{
    DisputeError, DisputeEvent, DisputeReason, DisputeResolution, SessionDispute,
};
use crate::domain::foundation::{DisputeId, ErrorCode, SessionId, UserId};
use crate::ports::{
    DisputeFilter, DisputeRepository, EventPublisher, PaymentRepository, SessionDirectory,
    SessionState,
};

#[derive(Debug, Clone)]
pub struct CreateDisputeCommand {
    pub session_id: SessionId,
    pub mentee_id: UserId,
    pub reason: DisputeReason,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolveDisputeCommand {
    pub dispute_id: DisputeId,
    pub resolution: DisputeResolution,
    /// Minor units; required for both refund resolutions.
    pub refund_amount: Option<i64>,
    pub admin_notes: Option<String>,
}

pub struct DisputeResolver {
    disputes: Arc<dyn DisputeRepository>,
    sessions: Arc<dyn SessionDirectory>,
    payments: Arc<dyn PaymentRepository>,
    orchestrator: Arc<PaymentOrchestrator>,
    ledger: Arc<MentorLedger>,
    publisher: Arc<dyn EventPublisher>,
}

impl DisputeResolver {
    pub fn new(
        disputes: Arc<dyn DisputeRepository>,
        sessions: Arc<dyn SessionDirectory>,
        payments: Arc<dyn PaymentRepository>,
        orchestrator: Arc<PaymentOrchestrator>,
        ledger: Arc<MentorLedger>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            disputes,
            sessions,
            payments,
            orchestrator,
            ledger,
            publisher,
        }
    }

    /// Opens a dispute on a completed session.
    pub async fn create(&self, cmd: CreateDisputeCommand) -> Result<SessionDispute, DisputeError> {
        let session = self
            .sessions
            .get_session(cmd.session_id)
            .await?
            .ok_or(DisputeError::SessionNotFound(cmd.session_id))?;
        if session.mentee_id != cmd.mentee_id {
            return Err(DisputeError::NotSessionMentee);
        }
        if session.state != SessionState::Completed {
            return Err(DisputeError::SessionNotCompleted(cmd.session_id));
        }
        if self
            .disputes
            .find_active_by_session(cmd.session_id)
            .await?
            .is_some()
        {
            return Err(DisputeError::ActiveDisputeExists(cmd.session_id));
        }

        let dispute = SessionDispute::open(
            session.id,
            session.mentee_id,
            session.mentor_id,
            cmd.reason,
            cmd.description,
        )?;
        match self.disputes.insert(&dispute).await {
            Ok(()) => {}
            Err(e) if e.code == ErrorCode::Conflict => {
                return Err(DisputeError::ActiveDisputeExists(cmd.session_id))
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            dispute_id = %dispute.id,
            session_id = %dispute.session_id,
            reason = %dispute.reason,
            "Dispute opened"
        );
        publish_event(
            self.publisher.as_ref(),
            &DisputeEvent::Opened {
                dispute_id: dispute.id,
                session_id: dispute.session_id,
                mentee_id: dispute.mentee_id,
                mentor_id: dispute.mentor_id,
                reason: dispute.reason,
            },
        )
        .await;
        Ok(dispute)
    }

    /// Applies an administrator's decision.
    pub async fn resolve(&self, cmd: ResolveDisputeCommand) -> Result<SessionDispute, DisputeError> {
        let mut dispute = self.get(cmd.dispute_id).await?;
        dispute.ensure_pending()?;

        let refund_amount = if cmd.resolution == DisputeResolution::NoRefund {
            cmd.resolution.refund_amount(cmd.refund_amount, 0)?
        } else {
            let payment = self
                .payments
                .find_live_by_session(dispute.session_id)
                .await?
                .ok_or(DisputeError::NoPaymentForSession(dispute.session_id))?;
            let refund_amount = cmd
                .resolution
                .refund_amount(cmd.refund_amount, payment.amount.amount())?;

            if let Some(amount) = refund_amount {
                let refund = self
                    .orchestrator
                    .refund(RefundPaymentCommand {
                        payment_id: payment.id,
                        amount,
                        reference: format!("{}{}", DISPUTE_REFUND_PREFIX, dispute.id),
                        triggering_transaction_id: None,
                    })
                    .await?;

                let mentor_share = refund.payment.mentor_share_of_refund(&refund.refund);
                if mentor_share > 0 {
                    self.ledger
                        .adjust_for_dispute_refund(dispute.mentor_id, dispute.id, mentor_share)
                        .await?;
                }
            }
            refund_amount
        };

        dispute.resolve(cmd.resolution, refund_amount, cmd.admin_notes)?;
        match self.disputes.resolve(&dispute).await {
            Ok(()) => {}
            Err(e) if e.code == ErrorCode::Conflict => {
                return Err(DisputeError::AlreadyResolved(dispute.id))
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            dispute_id = %dispute.id,
            session_id = %dispute.session_id,
            resolution = %cmd.resolution,
            refund_amount = refund_amount.unwrap_or(0),
            "Dispute resolved"
        );
        publish_event(
            self.publisher.as_ref(),
            &DisputeEvent::Resolved {
                dispute_id: dispute.id,
                session_id: dispute.session_id,
                mentee_id: dispute.mentee_id,
                mentor_id: dispute.mentor_id,
                resolution: cmd.resolution,
                refund_amount,
            },
        )
        .await;
        Ok(dispute)
    }

    pub async fn get(&self, dispute_id: DisputeId) -> Result<SessionDispute, DisputeError> {
        self.disputes
            .find_by_id(dispute_id)
            .await?
            .ok_or(DisputeError::NotFound(dispute_id))
    }

    pub async fn list(&self, filter: DisputeFilter) -> Result<Vec<SessionDispute>, DisputeError> {
        Ok(self.disputes.list(filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::currency::FixedRateConverter;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::{
        InMemoryBalanceRepository, InMemoryDisputeRepository, InMemoryPaymentRepository,
        InMemorySessionDirectory,
    };
    use crate::adapters::mock::MockPaymentGateway;
    use crate::application::ledger::LedgerSettings;
    use crate::application::payments::{
        ConfirmPaymentCommand, CreatePaymentIntentCommand, PaymentGateways, PaymentSettings,
    };
    use crate::domain::dispute::DisputeStatus;
    use crate::domain::foundation::{Currency, MentorId, Money, PayoutId};
    use crate::domain::payment::{CallbackStatus, PaymentError, PaymentProvider, PaymentStatus};
    use crate::ports::{GatewayError, SessionSnapshot};

    struct Fixture {
        resolver: DisputeResolver,
        orchestrator: Arc<PaymentOrchestrator>,
        ledger: Arc<MentorLedger>,
        payments: InMemoryPaymentRepository,
        sessions: InMemorySessionDirectory,
        paymob: MockPaymentGateway,
        bus: Arc<InMemoryEventBus>,
    }

    fn fixture() -> Fixture {
        let payments = InMemoryPaymentRepository::new();
        let sessions = InMemorySessionDirectory::new();
        let paymob = MockPaymentGateway::new(PaymentProvider::Paymob);
        let bus = Arc::new(InMemoryEventBus::new());
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
            PaymentGateways::new(
                Arc::new(MockPaymentGateway::new(PaymentProvider::Stripe)),
                Arc::new(paymob.clone()),
            ),
            Arc::new(FixedRateConverter::new(50.0).unwrap()),
            ledger.clone(),
            bus.clone(),
            PaymentSettings::default(),
        ));
        let resolver = DisputeResolver::new(
            Arc::new(InMemoryDisputeRepository::new()),
            Arc::new(sessions.clone()),
            Arc::new(payments.clone()),
            orchestrator.clone(),
            ledger.clone(),
            bus.clone(),
        );
        Fixture {
            resolver,
            orchestrator,
            ledger,
            payments,
            sessions,
            paymob,
            bus,
        }
    }

    /// A paid and completed 500 EGP session.
    async fn completed_session(f: &Fixture) -> SessionSnapshot {
        let session = SessionSnapshot {
            id: SessionId::new(),
            mentor_id: MentorId::new(),
            mentee_id: UserId::new(),
            price: Some(Money::new(50_000, Currency::Egp).unwrap()),
            state: SessionState::Booked,
            title: "Mock interview".to_string(),
            mentee_email: None,
            mentee_name: None,
            mentee_phone: None,
        };
        f.sessions.insert(session.clone()).await;
        let payment = f
            .orchestrator
            .create_payment_intent(CreatePaymentIntentCommand {
                session_id: session.id,
                mentee_id: session.mentee_id,
                provider: PaymentProvider::Paymob,
                method: None,
            })
            .await
            .unwrap();
        let ppid = payment.provider_payment_id.unwrap();
        f.paymob.set_status(&ppid, CallbackStatus::Succeeded, Some(50_000));
        f.orchestrator
            .confirm(ConfirmPaymentCommand {
                provider_payment_id: ppid,
                session_id: session.id,
            })
            .await
            .unwrap();
        f.sessions.set_state(session.id, SessionState::Completed).await;
        session
    }

    fn open_cmd(session: &SessionSnapshot) -> CreateDisputeCommand {
        CreateDisputeCommand {
            session_id: session.id,
            mentee_id: session.mentee_id,
            reason: DisputeReason::NoShow,
            description: None,
        }
    }

    fn resolve_cmd(
        dispute: &SessionDispute,
        resolution: DisputeResolution,
        refund_amount: Option<i64>,
    ) -> ResolveDisputeCommand {
        ResolveDisputeCommand {
            dispute_id: dispute.id,
            resolution,
            refund_amount,
            admin_notes: Some("reviewed recording".to_string()),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Opening
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn opens_one_dispute_per_session() {
        let f = fixture();
        let session = completed_session(&f).await;

        let dispute = f.resolver.create(open_cmd(&session)).await.unwrap();
        let err = f.resolver.create(open_cmd(&session)).await.unwrap_err();

        assert_eq!(dispute.status, DisputeStatus::Pending);
        assert!(matches!(err, DisputeError::ActiveDisputeExists(_)));
        assert_eq!(f.bus.events_of_type("dispute.opened").len(), 1);
    }

    #[tokio::test]
    async fn only_the_mentee_of_a_completed_session_can_dispute() {
        let f = fixture();
        let session = completed_session(&f).await;

        let mut cmd = open_cmd(&session);
        cmd.mentee_id = UserId::new();
        assert!(matches!(
            f.resolver.create(cmd).await.unwrap_err(),
            DisputeError::NotSessionMentee
        ));

        f.sessions.set_state(session.id, SessionState::Paid).await;
        assert!(matches!(
            f.resolver.create(open_cmd(&session)).await.unwrap_err(),
            DisputeError::SessionNotCompleted(_)
        ));
    }

    #[tokio::test]
    async fn other_reason_needs_description() {
        let f = fixture();
        let session = completed_session(&f).await;
        let mut cmd = open_cmd(&session);
        cmd.reason = DisputeReason::Other;

        let err = f.resolver.create(cmd).await.unwrap_err();

        assert!(matches!(err, DisputeError::DescriptionRequired));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Resolution
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn full_refund_clamps_balance_and_records_shortfall() {
        let f = fixture();
        let session = completed_session(&f).await;
        let dispute = f.resolver.create(open_cmd(&session)).await.unwrap();
        // Mentor already withdrew part of the 425 EGP earned.
        f.ledger
            .reserve_for_payout(session.mentor_id, PayoutId::new(), 30_000)
            .await
            .unwrap();

        let resolved = f
            .resolver
            .resolve(resolve_cmd(&dispute, DisputeResolution::FullRefund, Some(50_000)))
            .await
            .unwrap();

        assert_eq!(resolved.status, DisputeStatus::Resolved);
        assert_eq!(resolved.refund_amount, Some(50_000));
        let payment = f.payments.find_live_by_session(session.id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::FullyRefunded);
        let balance = f.ledger.get_balance(session.mentor_id).await.unwrap();
        assert_eq!(balance.available_balance, 0);
        assert_eq!(f.bus.events_of_type("ledger.shortfall_recorded").len(), 1);
        assert_eq!(f.bus.events_of_type("dispute.resolved").len(), 1);
    }

    #[tokio::test]
    async fn partial_refund_claws_back_proportional_share() {
        let f = fixture();
        let session = completed_session(&f).await;
        let dispute = f.resolver.create(open_cmd(&session)).await.unwrap();

        f.resolver
            .resolve(resolve_cmd(&dispute, DisputeResolution::PartialRefund, Some(20_000)))
            .await
            .unwrap();

        let balance = f.ledger.get_balance(session.mentor_id).await.unwrap();
        assert_eq!(balance.available_balance, 42_500 - 17_000);
        let payment = f.payments.find_live_by_session(session.id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::PartiallyRefunded);
    }

    #[tokio::test]
    async fn full_refund_without_amount_is_rejected_before_any_refund() {
        let f = fixture();
        let session = completed_session(&f).await;
        let dispute = f.resolver.create(open_cmd(&session)).await.unwrap();

        let err = f
            .resolver
            .resolve(resolve_cmd(&dispute, DisputeResolution::FullRefund, None))
            .await
            .unwrap_err();

        assert!(matches!(err, DisputeError::Validation { .. }));
        assert!(!f.paymob.was_called("refund"));
        assert_eq!(f.resolver.get(dispute.id).await.unwrap().status, DisputeStatus::Pending);
    }

    #[tokio::test]
    async fn no_refund_leaves_money_alone() {
        let f = fixture();
        let session = completed_session(&f).await;
        let dispute = f.resolver.create(open_cmd(&session)).await.unwrap();

        let resolved = f
            .resolver
            .resolve(resolve_cmd(&dispute, DisputeResolution::NoRefund, None))
            .await
            .unwrap();

        assert_eq!(resolved.refund_amount, None);
        assert!(!f.paymob.was_called("refund"));
        let balance = f.ledger.get_balance(session.mentor_id).await.unwrap();
        assert_eq!(balance.available_balance, 42_500);
    }

    #[tokio::test]
    async fn refund_above_price_is_rejected() {
        let f = fixture();
        let session = completed_session(&f).await;
        let dispute = f.resolver.create(open_cmd(&session)).await.unwrap();

        let err = f
            .resolver
            .resolve(resolve_cmd(&dispute, DisputeResolution::PartialRefund, Some(60_000)))
            .await
            .unwrap_err();

        assert!(matches!(err, DisputeError::RefundExceedsPrice { .. }));
        assert!(!f.paymob.was_called("refund"));
    }

    #[tokio::test]
    async fn resolved_dispute_cannot_be_resolved_again() {
        let f = fixture();
        let session = completed_session(&f).await;
        let dispute = f.resolver.create(open_cmd(&session)).await.unwrap();
        f.resolver
            .resolve(resolve_cmd(&dispute, DisputeResolution::NoRefund, None))
            .await
            .unwrap();

        let err = f
            .resolver
            .resolve(resolve_cmd(&dispute, DisputeResolution::FullRefund, Some(50_000)))
            .await
            .unwrap_err();

        assert!(matches!(err, DisputeError::AlreadyResolved(_)));
    }

    #[tokio::test]
    async fn retry_after_provider_outage_refunds_once() {
        let f = fixture();
        let session = completed_session(&f).await;
        let dispute = f.resolver.create(open_cmd(&session)).await.unwrap();
        f.paymob.set_error(GatewayError::unavailable("timeout"));

        let err = f
            .resolver
            .resolve(resolve_cmd(&dispute, DisputeResolution::FullRefund, Some(50_000)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DisputeError::Payment(PaymentError::ProviderUnavailable(_))
        ));
        assert_eq!(f.resolver.get(dispute.id).await.unwrap().status, DisputeStatus::Pending);

        f.resolver
            .resolve(resolve_cmd(&dispute, DisputeResolution::FullRefund, Some(50_000)))
            .await
            .unwrap();

        let balance = f.ledger.get_balance(session.mentor_id).await.unwrap();
        assert_eq!(balance.available_balance, 0);
        assert_eq!(balance.total_earnings, 0);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let f = fixture();
        let first = completed_session(&f).await;
        let second = completed_session(&f).await;
        let dispute = f.resolver.create(open_cmd(&first)).await.unwrap();
        f.resolver.create(open_cmd(&second)).await.unwrap();
        f.resolver
            .resolve(resolve_cmd(&dispute, DisputeResolution::NoRefund, None))
            .await
            .unwrap();

        let pending = f
            .resolver
            .list(DisputeFilter {
                status: Some(DisputeStatus::Pending),
                ..DisputeFilter::default()
            })
            .await
            .unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].session_id, second.id);
    }
}
