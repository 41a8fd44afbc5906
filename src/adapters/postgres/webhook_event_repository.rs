//! PostgreSQL implementation of WebhookEventRepository.
//!
//! Keyed on (provider, event_id). Concurrent deliveries of one event race on
//! the primary key and exactly one insert wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::payment::PaymentProvider;
use crate::ports::{ProcessingResult, SaveResult, WebhookEventRecord, WebhookEventRepository};

use super::{parse_column, query_failed};

pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    provider: String,
    event_id: String,
    event_type: String,
    provider_payment_id: Option<String>,
    processed_at: DateTime<Utc>,
    result: String,
    detail: Option<String>,
    payload: serde_json::Value,
}

impl TryFrom<WebhookEventRow> for WebhookEventRecord {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        Ok(WebhookEventRecord {
            provider: parse_column::<PaymentProvider>("provider", &row.provider)?,
            event_id: row.event_id,
            event_type: row.event_type,
            provider_payment_id: row.provider_payment_id,
            processed_at: Timestamp::from_datetime(row.processed_at),
            result: parse_column::<ProcessingResult>("result", &row.result)?,
            detail: row.detail,
            payload: row.payload,
        })
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn find(
        &self,
        provider: PaymentProvider,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT provider, event_id, event_type, provider_payment_id,
                   processed_at, result, detail, payload
            FROM processed_webhook_events
            WHERE provider = $1 AND event_id = $2
            "#,
        )
        .bind(provider.as_str())
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find webhook event", e))?;

        row.map(WebhookEventRecord::try_from).transpose()
    }

    async fn save(&self, record: &WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_webhook_events (
                provider, event_id, event_type, provider_payment_id,
                processed_at, result, detail, payload
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (provider, event_id) DO NOTHING
            "#,
        )
        .bind(record.provider.as_str())
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(&record.provider_payment_id)
        .bind(record.processed_at.as_datetime())
        .bind(record.result.as_str())
        .bind(&record.detail)
        .bind(&record.payload)
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("save webhook event", e))?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }
}
