//! Domain layer - Pure business logic with no infrastructure dependencies.
//!
//! - `foundation` - Shared value objects, ids, errors and event plumbing
//! - `payment` - Payment aggregate and provider vocabulary
//! - `ledger` - Mentor balances and ledger entries
//! - `payout` - Withdrawal lifecycle
//! - `dispute` - Session disputes and resolutions
//! - `webhook` - Callback error semantics

pub mod dispute;
pub mod foundation;
pub mod ledger;
pub mod payment;
pub mod payout;
pub mod webhook;
