//! PostgreSQL implementation of PayoutRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    Currency, DomainError, ErrorCode, MentorId, Money, PayoutId, Timestamp,
};
use crate::domain::payout::{Payout, PayoutStatus};
use crate::ports::{PayoutFilter, PayoutRepository};

use super::{invalid_row, parse_column, query_failed, violates};

pub struct PostgresPayoutRepository {
    pool: PgPool,
}

impl PostgresPayoutRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PayoutRow {
    id: Uuid,
    mentor_id: Uuid,
    amount: i64,
    currency: String,
    status: String,
    failure_reason: Option<String>,
    requested_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<PayoutRow> for Payout {
    type Error = DomainError;

    fn try_from(row: PayoutRow) -> Result<Self, Self::Error> {
        let currency: Currency = parse_column("currency", &row.currency)?;
        Ok(Payout {
            id: PayoutId::from_uuid(row.id),
            mentor_id: MentorId::from_uuid(row.mentor_id),
            amount: Money::new(row.amount, currency).map_err(invalid_row)?,
            status: parse_column::<PayoutStatus>("status", &row.status)?,
            failure_reason: row.failure_reason,
            requested_at: Timestamp::from_datetime(row.requested_at),
            processed_at: row.processed_at.map(Timestamp::from_datetime),
            completed_at: row.completed_at.map(Timestamp::from_datetime),
            updated_at: Timestamp::from_datetime(row.updated_at),
            version: row.version,
        })
    }
}

#[async_trait]
impl PayoutRepository for PostgresPayoutRepository {
    async fn insert(&self, payout: &Payout) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payouts (
                id, mentor_id, amount, currency, status, failure_reason,
                requested_at, processed_at, completed_at, updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0)
            "#,
        )
        .bind(payout.id.as_uuid())
        .bind(payout.mentor_id.as_uuid())
        .bind(payout.amount.amount())
        .bind(payout.amount.currency().code())
        .bind(payout.status.as_str())
        .bind(&payout.failure_reason)
        .bind(payout.requested_at.as_datetime())
        .bind(payout.processed_at.map(|t| *t.as_datetime()))
        .bind(payout.completed_at.map(|t| *t.as_datetime()))
        .bind(payout.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, "payouts_pkey") {
                return DomainError::new(
                    ErrorCode::Conflict,
                    format!("Payout {} already exists", payout.id),
                );
            }
            query_failed("insert payout", e)
        })?;

        Ok(())
    }

    async fn update(&self, payout: &Payout) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payouts SET
                status = $3,
                failure_reason = $4,
                processed_at = $5,
                completed_at = $6,
                updated_at = $7,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(payout.id.as_uuid())
        .bind(payout.version)
        .bind(payout.status.as_str())
        .bind(&payout.failure_reason)
        .bind(payout.processed_at.map(|t| *t.as_datetime()))
        .bind(payout.completed_at.map(|t| *t.as_datetime()))
        .bind(payout.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("update payout", e))?;

        if result.rows_affected() == 0 {
            return match self.find_by_id(payout.id).await? {
                Some(_) => Err(DomainError::new(
                    ErrorCode::Conflict,
                    format!(
                        "payout {} was modified concurrently (expected version {})",
                        payout.id, payout.version
                    ),
                )),
                None => Err(DomainError::new(
                    ErrorCode::PayoutNotFound,
                    format!("Payout {} not found", payout.id),
                )),
            };
        }

        Ok(())
    }

    async fn find_by_id(&self, id: PayoutId) -> Result<Option<Payout>, DomainError> {
        let row: Option<PayoutRow> = sqlx::query_as(
            r#"
            SELECT id, mentor_id, amount, currency, status, failure_reason,
                   requested_at, processed_at, completed_at, updated_at, version
            FROM payouts
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find payout", e))?;

        row.map(Payout::try_from).transpose()
    }

    async fn list(&self, filter: PayoutFilter) -> Result<Vec<Payout>, DomainError> {
        let rows: Vec<PayoutRow> = sqlx::query_as(
            r#"
            SELECT id, mentor_id, amount, currency, status, failure_reason,
                   requested_at, processed_at, completed_at, updated_at, version
            FROM payouts
            WHERE ($1::uuid IS NULL OR mentor_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY requested_at DESC
            LIMIT $3
            "#,
        )
        .bind(filter.mentor_id.map(|m| *m.as_uuid()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.limit.map(i64::from))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("list payouts", e))?;

        rows.into_iter().map(Payout::try_from).collect()
    }
}
