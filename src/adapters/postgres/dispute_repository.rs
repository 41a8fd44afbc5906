//! PostgreSQL implementation of DisputeRepository.
//!
//! The partial unique index `session_disputes_one_pending_per_session`
//! keeps concurrent filings for one session down to a single open dispute.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::dispute::{DisputeReason, DisputeResolution, DisputeStatus, SessionDispute};
use crate::domain::foundation::{
    DisputeId, DomainError, ErrorCode, MentorId, SessionId, Timestamp, UserId,
};
use crate::ports::{DisputeFilter, DisputeRepository};

use super::{parse_column, query_failed, violates};

const SELECT_DISPUTE: &str = r#"
    SELECT id, session_id, mentee_id, mentor_id, reason, description, status,
           resolution, refund_amount, admin_notes, created_at, resolved_at
    FROM session_disputes
"#;

pub struct PostgresDisputeRepository {
    pool: PgPool,
}

impl PostgresDisputeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DisputeRow {
    id: Uuid,
    session_id: Uuid,
    mentee_id: Uuid,
    mentor_id: Uuid,
    reason: String,
    description: Option<String>,
    status: String,
    resolution: Option<String>,
    refund_amount: Option<i64>,
    admin_notes: Option<String>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<DisputeRow> for SessionDispute {
    type Error = DomainError;

    fn try_from(row: DisputeRow) -> Result<Self, Self::Error> {
        Ok(SessionDispute {
            id: DisputeId::from_uuid(row.id),
            session_id: SessionId::from_uuid(row.session_id),
            mentee_id: UserId::from_uuid(row.mentee_id),
            mentor_id: MentorId::from_uuid(row.mentor_id),
            reason: parse_column::<DisputeReason>("reason", &row.reason)?,
            description: row.description,
            status: parse_column::<DisputeStatus>("status", &row.status)?,
            resolution: row
                .resolution
                .as_deref()
                .map(|r| parse_column::<DisputeResolution>("resolution", r))
                .transpose()?,
            refund_amount: row.refund_amount,
            admin_notes: row.admin_notes,
            created_at: Timestamp::from_datetime(row.created_at),
            resolved_at: row.resolved_at.map(Timestamp::from_datetime),
        })
    }
}

#[async_trait]
impl DisputeRepository for PostgresDisputeRepository {
    async fn insert(&self, dispute: &SessionDispute) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO session_disputes (
                id, session_id, mentee_id, mentor_id, reason, description, status,
                resolution, refund_amount, admin_notes, created_at, resolved_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(dispute.id.as_uuid())
        .bind(dispute.session_id.as_uuid())
        .bind(dispute.mentee_id.as_uuid())
        .bind(dispute.mentor_id.as_uuid())
        .bind(dispute.reason.as_str())
        .bind(&dispute.description)
        .bind(dispute.status.as_str())
        .bind(dispute.resolution.map(|r| r.as_str()))
        .bind(dispute.refund_amount)
        .bind(&dispute.admin_notes)
        .bind(dispute.created_at.as_datetime())
        .bind(dispute.resolved_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, "session_disputes_one_pending_per_session") {
                return DomainError::new(
                    ErrorCode::Conflict,
                    format!("Session {} already has an open dispute", dispute.session_id),
                );
            }
            query_failed("insert dispute", e)
        })?;

        Ok(())
    }

    async fn resolve(&self, dispute: &SessionDispute) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE session_disputes SET
                status = $2,
                resolution = $3,
                refund_amount = $4,
                admin_notes = $5,
                resolved_at = $6
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(dispute.id.as_uuid())
        .bind(dispute.status.as_str())
        .bind(dispute.resolution.map(|r| r.as_str()))
        .bind(dispute.refund_amount)
        .bind(&dispute.admin_notes)
        .bind(dispute.resolved_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("resolve dispute", e))?;

        if result.rows_affected() == 0 {
            return match self.find_by_id(dispute.id).await? {
                Some(_) => Err(DomainError::new(
                    ErrorCode::Conflict,
                    format!("Dispute {} is no longer pending", dispute.id),
                )),
                None => Err(DomainError::new(
                    ErrorCode::DisputeNotFound,
                    format!("Dispute {} not found", dispute.id),
                )),
            };
        }

        Ok(())
    }

    async fn find_by_id(&self, id: DisputeId) -> Result<Option<SessionDispute>, DomainError> {
        let row: Option<DisputeRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_DISPUTE))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_failed("find dispute", e))?;

        row.map(SessionDispute::try_from).transpose()
    }

    async fn find_active_by_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<SessionDispute>, DomainError> {
        let row: Option<DisputeRow> = sqlx::query_as(&format!(
            "{} WHERE session_id = $1 AND status = 'pending'",
            SELECT_DISPUTE
        ))
        .bind(session_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find session dispute", e))?;

        row.map(SessionDispute::try_from).transpose()
    }

    async fn list(&self, filter: DisputeFilter) -> Result<Vec<SessionDispute>, DomainError> {
        let rows: Vec<DisputeRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR session_id = $2)
            ORDER BY created_at DESC
            LIMIT $3"#,
            SELECT_DISPUTE
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.session_id.map(|s| *s.as_uuid()))
        .bind(filter.limit.map(i64::from))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("list disputes", e))?;

        rows.into_iter().map(SessionDispute::try_from).collect()
    }
}
