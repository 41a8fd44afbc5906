//! HTTP adapters - REST API implementations.
//!
//! Each module has its own DTOs, handlers and routes; `router` assembles
//! them behind the shared middleware stack.

pub mod auth;
pub mod disputes;
pub mod error;
pub mod ledger;
pub mod payments;
pub mod payouts;
pub mod router;
pub mod state;

pub use auth::{AuthenticatedUser, Role};
pub use error::{ApiError, ErrorResponse};
pub use router::{api_router, HttpOptions};
pub use state::{AppState, ServiceSettings};
