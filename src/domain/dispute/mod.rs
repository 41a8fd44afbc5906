//! Dispute domain module.

mod aggregate;
mod errors;
mod events;
mod reason;
mod status;

pub use aggregate::SessionDispute;
pub use errors::DisputeError;
pub use events::DisputeEvent;
pub use reason::{DisputeReason, DisputeResolution};
pub use status::DisputeStatus;
