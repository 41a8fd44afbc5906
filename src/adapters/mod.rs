//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `stripe`, `paymob` - Payment gateways
//! - `mock` - Scriptable gateway for tests and local development
//! - `currency` - Fixed-rate currency conversion
//! - `events` - In-process event bus and notification logging
//! - `memory` - In-memory repositories
//! - `postgres` - PostgreSQL repositories
//! - `http` - axum REST API

pub mod currency;
pub mod events;
pub(crate) mod hex;
pub mod http;
pub mod memory;
pub mod mock;
pub mod paymob;
pub mod postgres;
pub mod stripe;

pub use currency::FixedRateConverter;
pub use events::{InMemoryEventBus, LoggingNotificationHandler, NOTIFICATION_EVENTS};
pub use mock::MockPaymentGateway;
pub use paymob::{PaymobConfig, PaymobGateway};
pub use stripe::{StripeConfig, StripeGateway};
