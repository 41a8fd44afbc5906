//! PostgreSQL implementation of PaymentRepository.
//!
//! Refund history is stored as a JSONB array on the payment row so a refund
//! and the running totals it changes are written by one versioned update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    Currency, DomainError, ErrorCode, MentorId, Money, PaymentId, SessionId, Timestamp, UserId,
};
use crate::domain::payment::{Payment, PaymentMethod, PaymentProvider, PaymentStatus, Refund};
use crate::ports::PaymentRepository;

use super::{invalid_row, parse_column, query_failed, violates};

const SELECT_PAYMENT: &str = r#"
    SELECT id, session_id, mentee_id, mentor_id, provider, method,
           amount, currency, charge_amount, charge_currency, status,
           provider_payment_id, checkout, transaction_id,
           platform_commission, mentor_payout_amount, paid_at,
           refund_amount, refunded_at, refunds, failure_reason,
           created_at, updated_at, version
    FROM payments
"#;

/// PostgreSQL implementation of the PaymentRepository port.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: PaymentId) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payments WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_failed("check payment", e))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    session_id: Uuid,
    mentee_id: Uuid,
    mentor_id: Uuid,
    provider: String,
    method: Option<String>,
    amount: i64,
    currency: String,
    charge_amount: i64,
    charge_currency: String,
    status: String,
    provider_payment_id: Option<String>,
    checkout: Option<String>,
    transaction_id: Option<String>,
    platform_commission: i64,
    mentor_payout_amount: i64,
    paid_at: Option<DateTime<Utc>>,
    refund_amount: Option<i64>,
    refunded_at: Option<DateTime<Utc>>,
    refunds: Json<Vec<Refund>>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let currency: Currency = parse_column("currency", &row.currency)?;
        let charge_currency: Currency = parse_column("charge_currency", &row.charge_currency)?;
        let method = row
            .method
            .as_deref()
            .map(|m| parse_column::<PaymentMethod>("method", m))
            .transpose()?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            session_id: SessionId::from_uuid(row.session_id),
            mentee_id: UserId::from_uuid(row.mentee_id),
            mentor_id: MentorId::from_uuid(row.mentor_id),
            provider: parse_column::<PaymentProvider>("provider", &row.provider)?,
            method,
            amount: Money::new(row.amount, currency).map_err(invalid_row)?,
            charge: Money::new(row.charge_amount, charge_currency).map_err(invalid_row)?,
            status: parse_column::<PaymentStatus>("status", &row.status)?,
            provider_payment_id: row.provider_payment_id,
            checkout: row.checkout,
            transaction_id: row.transaction_id,
            platform_commission: row.platform_commission,
            mentor_payout_amount: row.mentor_payout_amount,
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            refund_amount: row.refund_amount,
            refunded_at: row.refunded_at.map(Timestamp::from_datetime),
            refunds: row.refunds.0,
            failure_reason: row.failure_reason,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            version: row.version,
        })
    }
}

fn optional_datetime(ts: Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.map(|t| *t.as_datetime())
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, session_id, mentee_id, mentor_id, provider, method,
                amount, currency, charge_amount, charge_currency, status,
                provider_payment_id, checkout, transaction_id,
                platform_commission, mentor_payout_amount, paid_at,
                refund_amount, refunded_at, refunds, failure_reason,
                created_at, updated_at, version
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, 0
            )
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.session_id.as_uuid())
        .bind(payment.mentee_id.as_uuid())
        .bind(payment.mentor_id.as_uuid())
        .bind(payment.provider.as_str())
        .bind(payment.method.map(|m| m.as_str()))
        .bind(payment.amount.amount())
        .bind(payment.amount.currency().code())
        .bind(payment.charge.amount())
        .bind(payment.charge.currency().code())
        .bind(payment.status.as_str())
        .bind(&payment.provider_payment_id)
        .bind(&payment.checkout)
        .bind(&payment.transaction_id)
        .bind(payment.platform_commission)
        .bind(payment.mentor_payout_amount)
        .bind(optional_datetime(payment.paid_at))
        .bind(payment.refund_amount)
        .bind(optional_datetime(payment.refunded_at))
        .bind(Json(&payment.refunds))
        .bind(&payment.failure_reason)
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, "payments_one_live_per_session") {
                return DomainError::new(
                    ErrorCode::Conflict,
                    format!("Session {} already has a live payment", payment.session_id),
                );
            }
            if violates(&e, "payments_pkey") {
                return DomainError::new(
                    ErrorCode::Conflict,
                    format!("Payment {} already exists", payment.id),
                );
            }
            query_failed("insert payment", e)
        })?;

        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                method = $3,
                charge_amount = $4,
                charge_currency = $5,
                status = $6,
                provider_payment_id = $7,
                checkout = $8,
                transaction_id = $9,
                paid_at = $10,
                refund_amount = $11,
                refunded_at = $12,
                refunds = $13,
                failure_reason = $14,
                updated_at = $15,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.version)
        .bind(payment.method.map(|m| m.as_str()))
        .bind(payment.charge.amount())
        .bind(payment.charge.currency().code())
        .bind(payment.status.as_str())
        .bind(&payment.provider_payment_id)
        .bind(&payment.checkout)
        .bind(&payment.transaction_id)
        .bind(optional_datetime(payment.paid_at))
        .bind(payment.refund_amount)
        .bind(optional_datetime(payment.refunded_at))
        .bind(Json(&payment.refunds))
        .bind(&payment.failure_reason)
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("update payment", e))?;

        if result.rows_affected() == 0 {
            if self.exists(payment.id).await? {
                return Err(DomainError::new(
                    ErrorCode::Conflict,
                    format!(
                        "payment {} was modified concurrently (expected version {})",
                        payment.id, payment.version
                    ),
                ));
            }
            return Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("Payment {} not found", payment.id),
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_PAYMENT))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_failed("find payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_live_by_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE session_id = $1 AND status <> 'failed'",
            SELECT_PAYMENT
        ))
        .bind(session_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find session payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_provider_reference(
        &self,
        provider: PaymentProvider,
        provider_payment_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE provider = $1 AND provider_payment_id = $2",
            SELECT_PAYMENT
        ))
        .bind(provider.as_str())
        .bind(provider_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find payment by provider reference", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn list_open_before(
        &self,
        cutoff: Timestamp,
        limit: u32,
    ) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE status IN ('created', 'pending_confirmation') AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2"#,
            SELECT_PAYMENT
        ))
        .bind(cutoff.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("list open payments", e))?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}
