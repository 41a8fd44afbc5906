//! PostgreSQL implementation of SessionDirectory.
//!
//! Reads the `sessions` table the booking service writes. The only write is
//! recording which payment paid for a session.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    Currency, DomainError, ErrorCode, MentorId, Money, PaymentId, SessionId, UserId,
};
use crate::ports::{SessionDirectory, SessionSnapshot, SessionState};

use super::{invalid_row, parse_column, query_failed};

pub struct PostgresSessionDirectory {
    pool: PgPool,
}

impl PostgresSessionDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    mentor_id: Uuid,
    mentee_id: Uuid,
    price_amount: Option<i64>,
    price_currency: Option<String>,
    state: String,
    title: String,
    mentee_email: Option<String>,
    mentee_name: Option<String>,
    mentee_phone: Option<String>,
}

fn parse_state(s: &str) -> Result<SessionState, DomainError> {
    match s {
        "booked" => Ok(SessionState::Booked),
        "paid" => Ok(SessionState::Paid),
        "completed" => Ok(SessionState::Completed),
        "cancelled" => Ok(SessionState::Cancelled),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid session state value: {}", s),
        )),
    }
}

impl TryFrom<SessionRow> for SessionSnapshot {
    type Error = DomainError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let price = match (row.price_amount, row.price_currency) {
            (Some(amount), Some(currency)) => {
                let currency: Currency = parse_column("price_currency", &currency)?;
                Some(Money::new(amount, currency).map_err(invalid_row)?)
            }
            _ => None,
        };

        Ok(SessionSnapshot {
            id: SessionId::from_uuid(row.id),
            mentor_id: MentorId::from_uuid(row.mentor_id),
            mentee_id: UserId::from_uuid(row.mentee_id),
            price,
            state: parse_state(&row.state)?,
            title: row.title,
            mentee_email: row.mentee_email,
            mentee_name: row.mentee_name,
            mentee_phone: row.mentee_phone,
        })
    }
}

#[async_trait]
impl SessionDirectory for PostgresSessionDirectory {
    async fn get_session(&self, id: SessionId) -> Result<Option<SessionSnapshot>, DomainError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, mentor_id, mentee_id, price_amount, price_currency, state,
                   title, mentee_email, mentee_name, mentee_phone
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find session", e))?;

        row.map(SessionSnapshot::try_from).transpose()
    }

    async fn mark_session_paid(
        &self,
        id: SessionId,
        payment_id: PaymentId,
    ) -> Result<(), DomainError> {
        // Repeated calls keep the first payment and never move a session
        // backwards out of completed or cancelled.
        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                state = CASE WHEN state = 'booked' THEN 'paid' ELSE state END,
                paid_payment_id = COALESCE(paid_payment_id, $2),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(payment_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("mark session paid", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session {} not found", id),
            ));
        }

        Ok(())
    }
}
