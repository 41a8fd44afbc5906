//! SessionDispute aggregate entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DisputeId, MentorId, SessionId, StateMachine, Timestamp, UserId};

use super::{DisputeError, DisputeReason, DisputeResolution, DisputeStatus};

/// A mentee's claim against a completed session.
///
/// Terminal once resolved, whatever the resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDispute {
    pub id: DisputeId,
    pub session_id: SessionId,
    pub mentee_id: UserId,
    pub mentor_id: MentorId,
    pub reason: DisputeReason,
    pub description: Option<String>,
    pub status: DisputeStatus,
    pub resolution: Option<DisputeResolution>,
    pub refund_amount: Option<i64>,
    pub admin_notes: Option<String>,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

impl SessionDispute {
    /// Opens a dispute. `Other` needs a non-blank description.
    pub fn open(
        session_id: SessionId,
        mentee_id: UserId,
        mentor_id: MentorId,
        reason: DisputeReason,
        description: Option<String>,
    ) -> Result<Self, DisputeError> {
        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if reason.requires_description() && description.is_none() {
            return Err(DisputeError::DescriptionRequired);
        }

        Ok(Self {
            id: DisputeId::new(),
            session_id,
            mentee_id,
            mentor_id,
            reason,
            description,
            status: DisputeStatus::Pending,
            resolution: None,
            refund_amount: None,
            admin_notes: None,
            created_at: Timestamp::now(),
            resolved_at: None,
        })
    }

    pub fn ensure_pending(&self) -> Result<(), DisputeError> {
        if !self.status.is_active() {
            return Err(DisputeError::AlreadyResolved(self.id));
        }
        Ok(())
    }

    /// Records the decision. The refund, if any, must already have been issued.
    pub fn resolve(
        &mut self,
        resolution: DisputeResolution,
        refund_amount: Option<i64>,
        admin_notes: Option<String>,
    ) -> Result<(), DisputeError> {
        self.status = self
            .status
            .transition_to(DisputeStatus::Resolved)
            .map_err(|_| DisputeError::AlreadyResolved(self.id))?;
        self.resolution = Some(resolution);
        self.refund_amount = refund_amount;
        self.admin_notes = admin_notes.filter(|n| !n.trim().is_empty());
        self.resolved_at = Some(Timestamp::now());
        Ok(())
    }
}
