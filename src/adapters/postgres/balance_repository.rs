//! PostgreSQL implementation of MentorBalanceRepository.
//!
//! A commit inserts the ledger entry and applies the versioned balance
//! update in one transaction. The unique `reference` column rejects a
//! replayed mutation before the balance is touched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    Currency, DomainError, ErrorCode, LedgerEntryId, MentorId, Timestamp,
};
use crate::domain::ledger::{EntryKind, LedgerEntry, MentorBalance};
use crate::ports::{CommitOutcome, MentorBalanceRepository};

use super::{parse_column, query_failed};

pub struct PostgresBalanceRepository {
    pool: PgPool,
}

impl PostgresBalanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BalanceRow {
    mentor_id: Uuid,
    currency: String,
    available_balance: i64,
    pending_balance: i64,
    total_earnings: i64,
    last_updated: DateTime<Utc>,
    created_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<BalanceRow> for MentorBalance {
    type Error = DomainError;

    fn try_from(row: BalanceRow) -> Result<Self, Self::Error> {
        Ok(MentorBalance {
            mentor_id: MentorId::from_uuid(row.mentor_id),
            currency: parse_column::<Currency>("currency", &row.currency)?,
            available_balance: row.available_balance,
            pending_balance: row.pending_balance,
            total_earnings: row.total_earnings,
            last_updated: Timestamp::from_datetime(row.last_updated),
            created_at: Timestamp::from_datetime(row.created_at),
            version: row.version,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    mentor_id: Uuid,
    kind: String,
    reference: String,
    requested: i64,
    applied: i64,
    shortfall: i64,
    available_after: i64,
    total_earnings_after: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for LedgerEntry {
    type Error = DomainError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(LedgerEntry {
            id: LedgerEntryId::from_uuid(row.id),
            mentor_id: MentorId::from_uuid(row.mentor_id),
            kind: parse_column::<EntryKind>("kind", &row.kind)?,
            reference: row.reference,
            requested: row.requested,
            applied: row.applied,
            shortfall: row.shortfall,
            available_after: row.available_after,
            total_earnings_after: row.total_earnings_after,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl MentorBalanceRepository for PostgresBalanceRepository {
    async fn find(&self, mentor_id: MentorId) -> Result<Option<MentorBalance>, DomainError> {
        let row: Option<BalanceRow> = sqlx::query_as(
            r#"
            SELECT mentor_id, currency, available_balance, pending_balance,
                   total_earnings, last_updated, created_at, version
            FROM mentor_balances
            WHERE mentor_id = $1
            "#,
        )
        .bind(mentor_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find balance", e))?;

        row.map(MentorBalance::try_from).transpose()
    }

    async fn create(&self, balance: &MentorBalance) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO mentor_balances (
                mentor_id, currency, available_balance, pending_balance,
                total_earnings, last_updated, created_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 0)
            ON CONFLICT (mentor_id) DO NOTHING
            "#,
        )
        .bind(balance.mentor_id.as_uuid())
        .bind(balance.currency.code())
        .bind(balance.available_balance)
        .bind(balance.pending_balance)
        .bind(balance.total_earnings)
        .bind(balance.last_updated.as_datetime())
        .bind(balance.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("create balance", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn commit(
        &self,
        balance: &MentorBalance,
        entry: &LedgerEntry,
    ) -> Result<CommitOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| query_failed("begin ledger transaction", e))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, mentor_id, kind, reference, requested, applied, shortfall,
                available_after, total_earnings_after, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (reference) DO NOTHING
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.mentor_id.as_uuid())
        .bind(entry.kind.as_str())
        .bind(&entry.reference)
        .bind(entry.requested)
        .bind(entry.applied)
        .bind(entry.shortfall)
        .bind(entry.available_after)
        .bind(entry.total_earnings_after)
        .bind(entry.created_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| query_failed("insert ledger entry", e))?;

        if inserted.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| query_failed("roll back ledger transaction", e))?;
            return Ok(CommitOutcome::DuplicateReference);
        }

        let updated = sqlx::query(
            r#"
            UPDATE mentor_balances SET
                available_balance = $3,
                pending_balance = $4,
                total_earnings = $5,
                last_updated = $6,
                version = version + 1
            WHERE mentor_id = $1 AND version = $2
            "#,
        )
        .bind(balance.mentor_id.as_uuid())
        .bind(balance.version)
        .bind(balance.available_balance)
        .bind(balance.pending_balance)
        .bind(balance.total_earnings)
        .bind(balance.last_updated.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| query_failed("update balance", e))?;

        if updated.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| query_failed("roll back ledger transaction", e))?;

            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM mentor_balances WHERE mentor_id = $1)",
            )
            .bind(balance.mentor_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_failed("check balance", e))?;

            if !exists {
                return Err(DomainError::new(
                    ErrorCode::BalanceNotFound,
                    format!("No balance for mentor {}", balance.mentor_id),
                ));
            }
            return Ok(CommitOutcome::VersionConflict);
        }

        tx.commit()
            .await
            .map_err(|e| query_failed("commit ledger transaction", e))?;

        Ok(CommitOutcome::Committed)
    }

    async fn find_entry(&self, reference: &str) -> Result<Option<LedgerEntry>, DomainError> {
        let row: Option<EntryRow> = sqlx::query_as(
            r#"
            SELECT id, mentor_id, kind, reference, requested, applied, shortfall,
                   available_after, total_earnings_after, created_at
            FROM ledger_entries
            WHERE reference = $1
            "#,
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find ledger entry", e))?;

        row.map(LedgerEntry::try_from).transpose()
    }

    async fn list_entries(
        &self,
        mentor_id: MentorId,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"
            SELECT id, mentor_id, kind, reference, requested, applied, shortfall,
                   available_after, total_earnings_after, created_at
            FROM ledger_entries
            WHERE mentor_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(mentor_id.as_uuid())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("list ledger entries", e))?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    async fn list_entries_of_kind(
        &self,
        kind: EntryKind,
        from: Timestamp,
        to: Timestamp,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"
            SELECT id, mentor_id, kind, reference, requested, applied, shortfall,
                   available_after, total_earnings_after, created_at
            FROM ledger_entries
            WHERE kind = $1 AND created_at >= $2 AND created_at < $3
            ORDER BY created_at ASC
            LIMIT $4
            "#,
        )
        .bind(kind.as_str())
        .bind(from.as_datetime())
        .bind(to.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("list ledger entries by kind", e))?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }
}
