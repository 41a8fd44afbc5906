//! Payout application service.

mod payout_manager;

pub use payout_manager::{PayoutManager, RequestPayoutCommand};
