//! HTTP adapter for dispute endpoints.
//!
//! - `POST /disputes` - Mentee disputes a completed session
//! - `GET /disputes` - List disputes (admin)
//! - `GET /disputes/:id` - Dispute detail (admin or the disputing mentee)
//! - `POST /disputes/:id/resolve` - Resolve with or without a refund (admin)

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::dispute_routes;
