//! In-memory repository adapters.
//!
//! Each store enforces the same uniqueness and optimistic-version rules as
//! its Postgres counterpart, so application tests exercise the real
//! conflict paths. Useful for testing and local development.

mod balance_store;
mod dispute_store;
mod payment_store;
mod payout_store;
mod session_directory;
mod webhook_event_store;

pub use balance_store::InMemoryBalanceRepository;
pub use dispute_store::InMemoryDisputeRepository;
pub use payment_store::InMemoryPaymentRepository;
pub use payout_store::InMemoryPayoutRepository;
pub use session_directory::InMemorySessionDirectory;
pub use webhook_event_store::InMemoryWebhookEventRepository;

use crate::domain::foundation::{DomainError, ErrorCode};

fn stale_version(entity: &str, id: impl std::fmt::Display, expected: i64) -> DomainError {
    DomainError::new(
        ErrorCode::Conflict,
        format!("{} {} was modified concurrently (expected version {})", entity, id, expected),
    )
}
