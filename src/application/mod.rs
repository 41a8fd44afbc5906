//! Application layer - services that coordinate domain operations across ports.
//!
//! - `payments` - Payment lifecycle, webhook reconciliation, background sweep
//! - `ledger` - Mentor balances, the single writer of money movements
//! - `payouts` - Mentor withdrawals
//! - `disputes` - Mentee disputes and refund resolutions

pub mod disputes;
pub mod ledger;
pub mod payments;
pub mod payouts;

mod publish;
