//! Dispute application service.

mod dispute_resolver;

pub use dispute_resolver::{CreateDisputeCommand, DisputeResolver, ResolveDisputeCommand};
