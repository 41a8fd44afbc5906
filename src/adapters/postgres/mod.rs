//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresPaymentRepository` - Payments with refund history as JSONB
//! - `PostgresBalanceRepository` - Mentor balances and their ledger entries
//! - `PostgresPayoutRepository` - Payout requests
//! - `PostgresDisputeRepository` - Session disputes
//! - `PostgresWebhookEventRepository` - Processed callback tracking
//! - `PostgresSessionDirectory` - Booking-owned session rows
//!
//! Uniqueness rules live in the schema (see `migrations/`); the adapters map
//! the named constraints back to domain error codes.

mod balance_repository;
mod dispute_repository;
mod payment_repository;
mod payout_repository;
mod session_directory;
mod webhook_event_repository;

pub use balance_repository::PostgresBalanceRepository;
pub use dispute_repository::PostgresDisputeRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use payout_repository::PostgresPayoutRepository;
pub use session_directory::PostgresSessionDirectory;
pub use webhook_event_repository::PostgresWebhookEventRepository;

use std::str::FromStr;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Parses a stored enum column, treating bad values as database corruption.
fn parse_column<T>(column: &str, value: &str) -> Result<T, DomainError>
where
    T: FromStr<Err = ValidationError>,
{
    T::from_str(value).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value '{}': {}", column, value, e),
        )
    })
}

fn invalid_row(message: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid row: {}", message))
}

fn query_failed(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

/// True when `e` violated the named constraint or unique index.
fn violates(e: &sqlx::Error, constraint: &str) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.constraint() == Some(constraint),
        _ => false,
    }
}
