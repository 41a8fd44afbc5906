//! HTTP adapter for mentor ledger endpoints.
//!
//! - `GET /ledger/mentors/:id/balance` - Current balances (admin or the mentor)
//! - `GET /ledger/mentors/:id/entries` - Recent ledger entries (admin or the mentor)
//! - `POST /ledger/mentors/:id/open` - Open a zero balance for an approved mentor (admin)
//! - `POST /sessions/:id/completed` - Credit the mentor for a completed session (admin)

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::{ledger_routes, session_routes};
