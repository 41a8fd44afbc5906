//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, error types and event plumbing
//! that form the vocabulary of the mentorship ledger.

mod errors;
mod events;
mod ids;
mod money;
mod percentage;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventEnvelope, SerializableDomainEvent};
pub use ids::{DisputeId, LedgerEntryId, MentorId, PaymentId, PayoutId, SessionId, UserId};
pub use money::{Currency, Money};
pub use percentage::Percentage;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
