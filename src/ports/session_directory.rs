//! Session collaborator port.
//!
//! Booking and scheduling live outside this service. The ledger only needs
//! to read a session's price and parties and to tell booking it was paid.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, MentorId, Money, PaymentId, SessionId, UserId};

/// Booking-side state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Booked,
    Paid,
    Completed,
    Cancelled,
}

/// What the ledger needs to know about a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub mentor_id: MentorId,
    pub mentee_id: UserId,
    /// `None` for sessions that were never priced.
    pub price: Option<Money>,
    pub state: SessionState,
    pub title: String,
    pub mentee_email: Option<String>,
    pub mentee_name: Option<String>,
    pub mentee_phone: Option<String>,
}

#[async_trait]
pub trait SessionDirectory: Send + Sync {
    async fn get_session(&self, id: SessionId) -> Result<Option<SessionSnapshot>, DomainError>;

    /// Tells booking the session is paid. Must tolerate repeated calls.
    async fn mark_session_paid(
        &self,
        id: SessionId,
        payment_id: PaymentId,
    ) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn accepts_dyn(_: &dyn SessionDirectory) {}
}
