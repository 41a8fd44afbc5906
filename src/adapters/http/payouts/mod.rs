//! HTTP adapter for payout endpoints.
//!
//! - `POST /payouts` - Mentor requests a withdrawal
//! - `GET /payouts` - List payouts (admins see all, mentors their own)
//! - `POST /payouts/:id/process|complete|fail|cancel` - Admin transitions

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::payout_routes;
