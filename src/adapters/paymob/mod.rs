//! Paymob Accept payment gateway adapter.
//!
//! Regional gateway for EGP card and mobile-wallet payments. Callbacks are
//! signed with an `hmac` query parameter over selected transaction fields.

mod callback_types;
mod paymob_gateway;

pub use callback_types::{hmac_message, BillingData, PaymobCallback, PaymobTransaction, HMAC_FIELDS};
pub use paymob_gateway::{PaymobConfig, PaymobGateway};
