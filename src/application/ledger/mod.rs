//! Mentor ledger application service.

mod mentor_ledger;

pub use mentor_ledger::{LedgerPosting, LedgerSettings, MentorLedger};
