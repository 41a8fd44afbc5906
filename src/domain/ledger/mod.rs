//! Mentor ledger domain module.
//!
//! - `balance` - MentorBalance aggregate and its single mutation entry point
//! - `entry` - The four ledger operations and the entries they record

mod balance;
mod entry;
mod errors;
mod events;

pub use balance::MentorBalance;
pub use entry::{EntryKind, LedgerEntry, LedgerOperation};
pub use errors::LedgerError;
pub use events::LedgerEvent;
