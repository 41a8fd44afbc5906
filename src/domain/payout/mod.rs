//! Payout domain module.

mod aggregate;
mod errors;
mod events;
mod policy;
mod status;

pub use aggregate::Payout;
pub use errors::PayoutError;
pub use events::PayoutEvent;
pub use policy::PayoutPolicy;
pub use status::PayoutStatus;
